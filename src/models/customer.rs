use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{jar::Jar, not_blank, nullable, order::Order};

/// A storefront customer. Created on first OTP login or by an admin.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: Uuid,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub first_order_batch_id: Option<Uuid>,
    pub repeat_count: i32,
    pub complaints: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `GET /auth/me` payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerProfile {
    pub id: Uuid,
    pub phone: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Customer> for CustomerProfile {
    fn from(c: Customer) -> Self {
        Self {
            id: c.id,
            phone: c.phone,
            name: c.name,
            email: c.email,
            created_at: c.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderCount {
    pub orders: i64,
}

/// Admin list row: the customer plus how many orders they placed.
#[derive(Debug, Serialize)]
pub struct CustomerWithOrderCount {
    #[serde(flatten)]
    pub customer: Customer,
    #[serde(rename = "_count")]
    pub count: OrderCount,
}

#[derive(Debug, Serialize)]
pub struct CustomerDetail {
    #[serde(flatten)]
    pub customer: Customer,
    pub jars: Vec<Jar>,
    pub orders: Vec<Order>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCustomerRequest {
    #[garde(custom(not_blank))]
    pub name: Option<String>,
    #[garde(skip)]
    pub phone: Option<String>,
    #[garde(skip)]
    pub email: Option<String>,
    #[garde(skip)]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomerRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub first_order_batch_id: Option<Option<Uuid>>,
    pub repeat_count: Option<i32>,
    #[serde(default, deserialize_with = "nullable")]
    pub complaints: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Deserialize)]
pub struct CustomerSearch {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RequestOtpRequest {
    pub phone: Option<String>,
}

/// The code is accepted as either `otp` or `otpCode`.
#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub phone: Option<String>,
    #[serde(alias = "otpCode")]
    pub otp: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginCustomer {
    pub id: Uuid,
    pub phone: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifyOtpResponse {
    pub token: String,
    pub customer: LoginCustomer,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_request_accepts_both_code_names() {
        let a: VerifyOtpRequest =
            serde_json::from_str(r#"{"phone":"9876543210","otp":"111111"}"#).unwrap();
        let b: VerifyOtpRequest =
            serde_json::from_str(r#"{"phone":"9876543210","otpCode":"111111"}"#).unwrap();
        assert_eq!(a.otp.as_deref(), Some("111111"));
        assert_eq!(b.otp.as_deref(), Some("111111"));
    }

    #[test]
    fn test_update_request_is_camel_case() {
        let req: UpdateCustomerRequest =
            serde_json::from_str(r#"{"repeatCount":2,"complaints":null}"#).unwrap();
        assert_eq!(req.repeat_count, Some(2));
        assert_eq!(req.complaints, Some(None));
        assert_eq!(req.notes, None);
    }

    #[test]
    fn test_list_row_nests_order_count() {
        let row = CustomerWithOrderCount {
            customer: Customer {
                id: Uuid::nil(),
                name: Some("Asha".into()),
                phone: Some("9876543210".into()),
                email: None,
                first_order_batch_id: None,
                repeat_count: 0,
                complaints: None,
                notes: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            count: OrderCount { orders: 3 },
        };
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["_count"]["orders"], 3);
        assert_eq!(value["repeatCount"], 0);
    }
}
