use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::config::RazorpayConfig;

const API_BASE: &str = "https://api.razorpay.com/v1";

type HmacSha256 = Hmac<Sha256>;

/// Minimal Razorpay REST client: order creation and payment lookup.
pub struct RazorpayClient {
    http: Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

#[derive(Serialize)]
struct CreateOrderBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RazorpayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RazorpayPayment {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub order_id: Option<String>,
}

impl RazorpayPayment {
    pub fn is_captured(&self) -> bool {
        self.status == "captured"
    }
}

impl RazorpayClient {
    pub fn new(config: &RazorpayConfig) -> Self {
        Self::with_base_url(config, API_BASE)
    }

    pub fn with_base_url(config: &RazorpayConfig, base_url: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
        }
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn key_secret(&self) -> &str {
        &self.key_secret
    }

    /// Create an INR order for `amount_paise`.
    pub async fn create_order(
        &self,
        amount_paise: i64,
        receipt: &str,
    ) -> Result<RazorpayOrder, RazorpayError> {
        let response = self
            .http
            .post(format!("{}/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&CreateOrderBody {
                amount: amount_paise,
                currency: "INR",
                receipt,
            })
            .send()
            .await?;

        Self::parse(response).await
    }

    pub async fn fetch_payment(&self, payment_id: &str) -> Result<RazorpayPayment, RazorpayError> {
        let response = self
            .http
            .get(format!("{}/payments/{}", self.base_url, payment_id))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .send()
            .await?;

        Self::parse(response).await
    }

    async fn parse<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T, RazorpayError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RazorpayError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}

/// Checks the checkout callback signature: hex HMAC-SHA256 of `"<order_id>|<payment_id>"`.
///
/// An empty secret never verifies. Comparison is constant time.
pub fn verify_payment_signature(
    key_secret: &str,
    razorpay_order_id: &str,
    razorpay_payment_id: &str,
    signature: &str,
) -> bool {
    let payload = format!("{razorpay_order_id}|{razorpay_payment_id}");
    verify_hex_hmac(key_secret, payload.as_bytes(), signature)
}

/// Checks the `X-Razorpay-Signature` header against the raw webhook body.
pub fn verify_webhook_signature(webhook_secret: &str, body: &[u8], signature: &str) -> bool {
    verify_hex_hmac(webhook_secret, body, signature)
}

/// Hex HMAC-SHA256 of `payload` under `secret`.
pub fn sign(secret: &str, payload: &[u8]) -> Result<String, hmac::digest::InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())?;
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn verify_hex_hmac(secret: &str, payload: &[u8], signature: &str) -> bool {
    if secret.is_empty() {
        return false;
    }
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}

#[derive(Debug, thiserror::Error)]
pub enum RazorpayError {
    #[error("Razorpay request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Razorpay API returned {status}: {body}")]
    Api { status: u16, body: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_signature_roundtrip() {
        let signature = sign("key_secret", b"order_abc|pay_xyz").unwrap();
        assert!(verify_payment_signature(
            "key_secret",
            "order_abc",
            "pay_xyz",
            &signature
        ));
    }

    #[test]
    fn test_payment_signature_rejects_tampering() {
        let signature = sign("key_secret", b"order_abc|pay_xyz").unwrap();
        assert!(!verify_payment_signature(
            "key_secret",
            "order_abc",
            "pay_other",
            &signature
        ));
        assert!(!verify_payment_signature(
            "other_secret",
            "order_abc",
            "pay_xyz",
            &signature
        ));
        assert!(!verify_payment_signature(
            "key_secret",
            "order_abc",
            "pay_xyz",
            "not-hex"
        ));
    }

    #[test]
    fn test_empty_secret_never_verifies() {
        let signature = sign("", b"order_abc|pay_xyz").unwrap();
        assert!(!verify_payment_signature("", "order_abc", "pay_xyz", &signature));
        assert!(!verify_webhook_signature("", b"{}", &signature));
    }

    #[test]
    fn test_webhook_signature_covers_raw_body() {
        let body = br#"{"event":"payment.captured"}"#;
        let signature = sign("whsec", body).unwrap();
        assert!(verify_webhook_signature("whsec", body, &signature));
        assert!(!verify_webhook_signature(
            "whsec",
            br#"{"event":"payment.captured" }"#,
            &signature
        ));
    }

    #[test]
    fn test_known_vector() {
        // RFC 4231 test case 2
        assert_eq!(
            sign("Jefe", b"what do ya want for nothing?").unwrap(),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }
}
