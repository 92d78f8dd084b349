use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{not_blank, nullable};

/// A customer's saved shipping address.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub name: String,
    pub phone: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Address {
    /// Multi-line snapshot stored on orders, so later edits don't rewrite history.
    pub fn shipping_label(&self) -> String {
        let mut lines = vec![
            format!("{}, {}", self.name, self.phone),
            self.address_line1.clone(),
        ];
        if let Some(line2) = self.address_line2.as_deref().filter(|l| !l.is_empty()) {
            lines.push(line2.to_string());
        }
        lines.push(format!("{}, {} - {}", self.city, self.state, self.pincode));
        lines.join("\n")
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAddressRequest {
    #[garde(custom(not_blank))]
    pub name: Option<String>,
    #[garde(custom(not_blank))]
    pub phone: Option<String>,
    #[garde(custom(not_blank))]
    pub address_line1: Option<String>,
    #[garde(skip)]
    pub address_line2: Option<String>,
    #[garde(custom(not_blank))]
    pub city: Option<String>,
    #[garde(custom(not_blank))]
    pub state: Option<String>,
    #[garde(custom(not_blank))]
    pub pincode: Option<String>,
    #[garde(skip)]
    pub is_default: Option<bool>,
}

/// Validated, trimmed address fields ready for insertion.
#[derive(Debug, Clone)]
pub struct NewAddress {
    pub name: String,
    pub phone: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub is_default: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateAddressRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address_line1: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub address_line2: Option<Option<String>>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub is_default: Option<bool>,
}
