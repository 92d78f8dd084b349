use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use super::{farm::Farm, lab_report::LabReport, not_blank, nullable};

/// Approval workflow. Only APPROVED batches appear in the public listing and stock counts.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display, sqlx::Type,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "batch_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    Pending,
    Approved,
    Rejected,
}

/// A production run. `batch_id` is the human identifier (e.g. `AMR-001`), always upper-case.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub id: Uuid,
    pub batch_id: String,
    pub farm_id: Uuid,
    pub date: DateTime<Utc>,
    pub cows_count: i32,
    pub milk_liters: f64,
    pub ghee_output_liters: f64,
    pub processing_notes: Option<String>,
    pub status: BatchStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct BatchWithFarm {
    #[serde(flatten)]
    pub batch: Batch,
    pub farm: Farm,
}

/// Public transparency view: the batch with its farm and published lab results.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchWithReports {
    #[serde(flatten)]
    pub batch: Batch,
    pub farm: Farm,
    pub lab_reports: Vec<LabReport>,
}

/// Normalizes a human batch id the way it is stored.
pub fn normalize_batch_id(batch_id: &str) -> String {
    batch_id.trim().to_uppercase()
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBatchRequest {
    #[garde(custom(not_blank))]
    pub batch_id: Option<String>,
    #[garde(required)]
    pub farm_id: Option<Uuid>,
    #[garde(custom(not_blank))]
    pub date: Option<String>,
    #[garde(required, range(min = 0))]
    pub cows_count: Option<i32>,
    #[garde(required, range(min = 0.0))]
    pub milk_liters: Option<f64>,
    #[garde(required, range(min = 0.0))]
    pub ghee_output_liters: Option<f64>,
    #[garde(skip)]
    pub processing_notes: Option<String>,
}

/// Validated batch fields ready for insertion.
#[derive(Debug, Clone)]
pub struct NewBatch {
    pub batch_id: String,
    pub farm_id: Uuid,
    pub date: DateTime<Utc>,
    pub cows_count: i32,
    pub milk_liters: f64,
    pub ghee_output_liters: f64,
    pub processing_notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBatchRequest {
    pub farm_id: Option<Uuid>,
    pub date: Option<String>,
    pub cows_count: Option<i32>,
    pub milk_liters: Option<f64>,
    pub ghee_output_liters: Option<f64>,
    #[serde(default, deserialize_with = "nullable")]
    pub processing_notes: Option<Option<String>>,
    pub status: Option<BatchStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFilter {
    pub status: Option<BatchStatus>,
    pub farm_id: Option<Uuid>,
}
