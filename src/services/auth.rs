use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

/// Claims carried by back-office tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminClaims {
    pub admin_id: Uuid,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// Claims carried by storefront customer tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerClaims {
    pub customer_id: Uuid,
    pub phone: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signs and verifies the HS256 tokens for both audiences.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    admin_ttl: Duration,
    customer_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, admin_ttl_days: i64, customer_ttl_days: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            admin_ttl: Duration::days(admin_ttl_days),
            customer_ttl: Duration::days(customer_ttl_days),
        }
    }

    pub fn sign_admin(&self, admin_id: Uuid, email: &str) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = AdminClaims {
            admin_id,
            email: email.to_string(),
            iat: now.timestamp(),
            exp: (now + self.admin_ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    pub fn sign_customer(
        &self,
        customer_id: Uuid,
        phone: &str,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = CustomerClaims {
            customer_id,
            phone: phone.to_string(),
            iat: now.timestamp(),
            exp: (now + self.customer_ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    /// `None` for a bad signature, an expired token, or a customer token.
    pub fn verify_admin(&self, token: &str) -> Option<AdminClaims> {
        self.verify(token)
    }

    /// `None` for a bad signature, an expired token, or an admin token.
    pub fn verify_customer(&self, token: &str) -> Option<CustomerClaims> {
        self.verify(token)
    }

    fn verify<T: DeserializeOwned>(&self, token: &str) -> Option<T> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<T>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .ok()
    }
}

/// 32 random bytes, hex encoded.
pub fn generate_magic_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// `<base>?token=<token>`.
pub fn magic_link(base_url: &str, token: &str) -> String {
    let separator = if base_url.contains('?') { '&' } else { '?' };
    format!("{base_url}{separator}token={token}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("test-secret-that-is-long-enough-1234", 7, 3650)
    }

    #[test]
    fn test_admin_token_roundtrip() {
        let tokens = service();
        let id = Uuid::new_v4();
        let token = tokens.sign_admin(id, "ops@amrytum.in").unwrap();
        let claims = tokens.verify_admin(&token).unwrap();
        assert_eq!(claims.admin_id, id);
        assert_eq!(claims.email, "ops@amrytum.in");
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 3600);
    }

    #[test]
    fn test_token_kinds_are_not_interchangeable() {
        let tokens = service();
        let customer = tokens.sign_customer(Uuid::new_v4(), "9876543210").unwrap();
        let admin = tokens.sign_admin(Uuid::new_v4(), "ops@amrytum.in").unwrap();

        assert!(tokens.verify_admin(&customer).is_none());
        assert!(tokens.verify_customer(&admin).is_none());
        assert!(tokens.verify_customer(&customer).is_some());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = service().sign_customer(Uuid::new_v4(), "9876543210").unwrap();
        let other = TokenService::new("another-secret-entirely-0000000000", 7, 3650);
        assert!(other.verify_customer(&token).is_none());
        assert!(service().verify_customer("not.a.jwt").is_none());
    }

    #[test]
    fn test_expired_token_rejected() {
        let tokens = TokenService::new("test-secret-that-is-long-enough-1234", -1, -1);
        let token = tokens.sign_admin(Uuid::new_v4(), "ops@amrytum.in").unwrap();
        assert!(tokens.verify_admin(&token).is_none());
    }

    #[test]
    fn test_magic_token_shape() {
        let token = generate_magic_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_magic_token());
    }

    #[test]
    fn test_magic_link() {
        assert_eq!(
            magic_link("http://localhost:4000/api/admin/auth/verify", "abc"),
            "http://localhost:4000/api/admin/auth/verify?token=abc"
        );
        assert_eq!(magic_link("https://x.test/v?a=1", "abc"), "https://x.test/v?a=1&token=abc");
    }
}
