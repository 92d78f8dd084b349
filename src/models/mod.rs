use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};

pub mod address;
pub mod admin;
pub mod batch;
pub mod catalog;
pub mod customer;
pub mod farm;
pub mod jar;
pub mod lab_report;
pub mod order;
pub mod payment;
pub mod site;

/// Distinguishes an explicit `null` (clear the column) from an absent field (leave it).
///
/// Use with `#[serde(default, deserialize_with = "nullable")]` on `Option<Option<T>>`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Parses an RFC 3339 timestamp or a plain `YYYY-MM-DD` date (midnight UTC).
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// `garde` rule for required text fields that arrive as `Option<String>`.
pub fn not_blank(value: &Option<String>, _ctx: &()) -> garde::Result {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(()),
        _ => Err(garde::Error::new("must not be blank")),
    }
}

/// Trims and drops empty strings.
pub fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
