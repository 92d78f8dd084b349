use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::batch::Batch;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LabReport {
    pub id: Uuid,
    pub batch_id: Uuid,
    /// Storage key of the PDF (S3 object key or path under the uploads directory).
    pub report_url: String,
    pub fat_percent: Option<f64>,
    pub moisture: Option<f64>,
    pub ffa: Option<f64>,
    pub antibiotic_pass: bool,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct LabReportWithBatch {
    #[serde(flatten)]
    pub report: LabReport,
    pub batch: Batch,
}

/// Fields collected from the multipart upload form.
#[derive(Debug, Clone)]
pub struct NewLabReport {
    pub batch_id: Uuid,
    pub report_url: String,
    pub fat_percent: Option<f64>,
    pub moisture: Option<f64>,
    pub ffa: Option<f64>,
    pub antibiotic_pass: bool,
    pub remarks: Option<String>,
}
