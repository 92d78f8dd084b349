use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use uuid::Uuid;

use super::{batch::Batch, customer::Customer, nullable};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    EnumIter,
    Display,
    sqlx::Type,
)]
#[sqlx(type_name = "jar_size")]
pub enum JarSize {
    #[serde(rename = "SIZE_250ML")]
    #[strum(serialize = "SIZE_250ML")]
    #[sqlx(rename = "SIZE_250ML")]
    Size250Ml,
    #[serde(rename = "SIZE_500ML")]
    #[strum(serialize = "SIZE_500ML")]
    #[sqlx(rename = "SIZE_500ML")]
    Size500Ml,
    #[serde(rename = "SIZE_1L")]
    #[strum(serialize = "SIZE_1L")]
    #[sqlx(rename = "SIZE_1L")]
    Size1L,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display, sqlx::Type,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "jar_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JarStatus {
    Available,
    Sold,
}

/// One physical jar of one batch. `jar_id` is the printed identifier.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Jar {
    pub id: Uuid,
    pub jar_id: String,
    pub batch_id: Uuid,
    pub size: JarSize,
    pub status: JarStatus,
    pub customer_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct JarWithBatch {
    #[serde(flatten)]
    pub jar: Jar,
    pub batch: Batch,
}

#[derive(Debug, Serialize)]
pub struct JarDetail {
    #[serde(flatten)]
    pub jar: Jar,
    pub batch: Batch,
    pub customer: Option<Customer>,
}

/// Available jar counts per size, keyed by the size's wire name.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct StockAvailability {
    #[serde(rename = "SIZE_250ML")]
    pub size_250ml: i64,
    #[serde(rename = "SIZE_500ML")]
    pub size_500ml: i64,
    #[serde(rename = "SIZE_1L")]
    pub size_1l: i64,
}

impl StockAvailability {
    pub fn set(&mut self, size: JarSize, count: i64) {
        match size {
            JarSize::Size250Ml => self.size_250ml = count,
            JarSize::Size500Ml => self.size_500ml = count,
            JarSize::Size1L => self.size_1l = count,
        }
    }
}

/// `size` stays a string so unknown sizes get a specific error message.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJarRequest {
    pub batch_id: Option<String>,
    pub size: Option<String>,
    pub jar_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkCreateJarsRequest {
    pub batch_id: Option<String>,
    pub size: Option<String>,
    pub count: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct BulkCreateJarsResponse {
    pub count: usize,
    pub jars: Vec<JarWithBatch>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateJarRequest {
    pub status: Option<JarStatus>,
    #[serde(default, deserialize_with = "nullable")]
    pub customer_id: Option<Option<Uuid>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JarFilter {
    pub batch_id: Option<String>,
    pub status: Option<JarStatus>,
    pub size: Option<JarSize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_size_wire_names_agree() {
        for size in JarSize::iter() {
            let json = serde_json::to_string(&size).unwrap();
            assert_eq!(json, format!("\"{}\"", size));
            assert_eq!(JarSize::from_str(&size.to_string()).unwrap(), size);
        }
        assert!(JarSize::from_str("SIZE_2L").is_err());
    }

    #[test]
    fn test_stock_availability_serializes_all_sizes() {
        let mut stock = StockAvailability::default();
        stock.set(JarSize::Size500Ml, 4);
        assert_eq!(
            serde_json::to_value(&stock).unwrap(),
            serde_json::json!({"SIZE_250ML": 0, "SIZE_500ML": 4, "SIZE_1L": 0})
        );
    }
}
