use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use strum::{Display, EnumString};
use uuid::Uuid;

use super::jar::JarSize;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display, sqlx::Type,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "payment_session_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentSessionStatus {
    Pending,
    Completed,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub size: JarSize,
    pub quantity: u32,
}

/// A Razorpay order awaiting payment, holding everything needed to create the orders later.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSession {
    pub id: Uuid,
    pub razorpay_order_id: String,
    pub customer_id: Uuid,
    pub address_id: Uuid,
    /// Human batch id as sent by the storefront.
    pub batch_id: String,
    pub amount_paise: i64,
    pub items: Json<Vec<CartItem>>,
    pub status: PaymentSessionStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Body of both `create-order` (Razorpay) and `create-order-cod`.
#[derive(Debug, Deserialize)]
pub struct CreatePaymentOrderRequest {
    pub address_id: Option<Uuid>,
    pub batch_id: Option<String>,
    pub amount_paise: Option<i64>,
    pub items: Option<Vec<CartItem>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentOrderResponse {
    pub razorpay_order_id: String,
    pub key_id: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    pub razorpay_order_id: Option<String>,
    pub razorpay_payment_id: Option<String>,
    pub razorpay_signature: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

/// The subset of a Razorpay webhook we act on.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    #[serde(default)]
    pub payload: Option<WebhookPayload>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    pub payment: Option<WebhookPaymentWrapper>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookPaymentWrapper {
    pub entity: Option<WebhookPaymentEntity>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookPaymentEntity {
    pub id: String,
    pub order_id: String,
}

impl WebhookEvent {
    /// `(razorpay_order_id, razorpay_payment_id)` of a captured payment, if present.
    pub fn captured_payment(&self) -> Option<(&str, &str)> {
        if self.event != "payment.captured" {
            return None;
        }
        let entity = self.payload.as_ref()?.payment.as_ref()?.entity.as_ref()?;
        Some((entity.order_id.as_str(), entity.id.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_captured_payment_extracted() {
        let event: WebhookEvent = serde_json::from_str(
            r#"{"event":"payment.captured","payload":{"payment":{"entity":{"id":"pay_1","order_id":"order_1","amount":89900}}}}"#,
        )
        .unwrap();
        assert_eq!(event.captured_payment(), Some(("order_1", "pay_1")));
    }

    #[test]
    fn test_other_events_ignored() {
        let event: WebhookEvent =
            serde_json::from_str(r#"{"event":"payment.failed","payload":{}}"#).unwrap();
        assert_eq!(event.captured_payment(), None);

        let event: WebhookEvent = serde_json::from_str(r#"{"event":"payment.captured"}"#).unwrap();
        assert_eq!(event.captured_payment(), None);
    }

    #[test]
    fn test_cart_item_wire_format() {
        let item: CartItem =
            serde_json::from_str(r#"{"size":"SIZE_1L","quantity":2}"#).unwrap();
        assert_eq!(item.size, JarSize::Size1L);
        assert_eq!(item.quantity, 2);
    }
}
