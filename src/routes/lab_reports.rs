use std::future::Future;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::{batches, lab_reports};
use crate::error::AppError;
use crate::models::lab_report::{LabReport, LabReportWithBatch, NewLabReport};
use crate::models::trimmed;
use crate::routes::extract::AdminAuth;
use crate::services::storage::{self, Storage, MAX_UPLOAD_BYTES, SIGNED_URL_TTL_SECS};

/// Form fields of the upload, before validation.
#[derive(Debug, Default)]
struct UploadForm {
    file: Option<(String, Option<String>, Vec<u8>)>,
    batch_id: Option<String>,
    fat_percent: Option<String>,
    moisture: Option<String>,
    ffa: Option<String>,
    antibiotic_pass: Option<String>,
    remarks: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabReportDownload {
    #[serde(flatten)]
    pub report: LabReportWithBatch,
    pub download_url: String,
}

/// POST /lab-reports/upload (multipart)
pub async fn upload(
    State(state): State<AppState>,
    _admin: AdminAuth,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<LabReport>), AppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let filename = field.file_name().unwrap_or("report.pdf").to_string();
            let content_type = field.content_type().map(str::to_string);
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::bad_request(format!("Invalid file: {e}")))?;
            form.file = Some((filename, content_type, data.to_vec()));
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::bad_request(format!("Invalid field {name}: {e}")))?;
        match name.as_str() {
            "batchId" => form.batch_id = Some(value),
            "fatPercent" => form.fat_percent = Some(value),
            "moisture" => form.moisture = Some(value),
            "ffa" => form.ffa = Some(value),
            "antibioticPass" => form.antibiotic_pass = Some(value),
            "remarks" => form.remarks = Some(value),
            _ => {}
        }
    }

    let upload = form.validate()?;
    let batch = batches::resolve(&state.db, &upload.batch_ref)
        .await?
        .ok_or_else(|| AppError::bad_request("Invalid batchId"))?;

    let key = storage::lab_report_key(
        &batch.batch_id,
        &upload.filename,
        Utc::now().timestamp_millis(),
    );
    let new_report = NewLabReport {
        batch_id: batch.id,
        report_url: String::new(),
        fat_percent: upload.fat_percent,
        moisture: upload.moisture,
        ffa: upload.ffa,
        antibiotic_pass: upload.antibiotic_pass,
        remarks: upload.remarks,
    };
    let db = &state.db;
    let report = store_then_record(&state.storage, &key, &upload.data, |report_url| async move {
        let mut new_report = new_report;
        new_report.report_url = report_url;
        lab_reports::create(db, &new_report).await
    })
    .await?;

    tracing::info!(batch_id = %batch.batch_id, report_id = %report.id, "Lab report uploaded");
    Ok((StatusCode::CREATED, Json(report)))
}

/// A fully parsed upload. Nothing is stored until every field is valid.
#[derive(Debug)]
struct ValidatedUpload {
    filename: String,
    data: Vec<u8>,
    batch_ref: String,
    fat_percent: Option<f64>,
    moisture: Option<f64>,
    ffa: Option<f64>,
    antibiotic_pass: bool,
    remarks: Option<String>,
}

impl UploadForm {
    fn validate(self) -> Result<ValidatedUpload, AppError> {
        let (filename, content_type, data) = self
            .file
            .ok_or_else(|| AppError::bad_request("No PDF file uploaded"))?;
        if data.len() > MAX_UPLOAD_BYTES {
            return Err(AppError::bad_request("File too large (max 10 MB)"));
        }
        if !storage::is_pdf(content_type.as_deref(), &data) {
            return Err(AppError::bad_request("Only PDF files are allowed"));
        }

        let batch_ref = trimmed(self.batch_id.as_deref())
            .ok_or_else(|| AppError::bad_request("Missing batchId"))?;

        Ok(ValidatedUpload {
            filename,
            data,
            batch_ref,
            fat_percent: parse_number(self.fat_percent.as_deref(), "fatPercent")?,
            moisture: parse_number(self.moisture.as_deref(), "moisture")?,
            ffa: parse_number(self.ffa.as_deref(), "ffa")?,
            antibiotic_pass: parse_flag(self.antibiotic_pass.as_deref()),
            remarks: trimmed(self.remarks.as_deref()),
        })
    }
}

/// Stores the PDF, then records it. The object is removed again if recording fails.
async fn store_then_record<F, Fut, T, E>(
    storage: &Storage,
    key: &str,
    data: &[u8],
    record: F,
) -> Result<T, AppError>
where
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    AppError: From<E>,
{
    let stored_key = storage.upload(key, data, "application/pdf").await?;
    match record(stored_key).await {
        Ok(value) => Ok(value),
        Err(e) => {
            if let Err(cleanup) = storage.delete(key).await {
                tracing::warn!(key = %key, error = %cleanup, "Failed to remove unrecorded lab report");
            }
            Err(e.into())
        }
    }
}

/// GET /lab-reports
pub async fn list(
    State(state): State<AppState>,
    _admin: AdminAuth,
) -> Result<Json<Vec<LabReportWithBatch>>, AppError> {
    Ok(Json(lab_reports::list(&state.db).await?))
}

/// GET /lab-reports/{id}: the report with a download URL for its PDF.
pub async fn get(
    State(state): State<AppState>,
    _admin: AdminAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<LabReportDownload>, AppError> {
    let report = lab_reports::get(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Lab report not found"))?;
    let download_url = state
        .storage
        .signed_url(&report.report.report_url, SIGNED_URL_TTL_SECS)
        .await?;
    Ok(Json(LabReportDownload {
        report,
        download_url,
    }))
}

/// DELETE /lab-reports/{id}
pub async fn delete(
    State(state): State<AppState>,
    _admin: AdminAuth,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let report = lab_reports::delete(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Lab report not found"))?;

    if let Err(e) = state.storage.delete(&report.report_url).await {
        tracing::warn!(key = %report.report_url, error = %e, "Failed to delete stored lab report");
    }
    Ok(StatusCode::NO_CONTENT)
}

fn parse_number(raw: Option<&str>, field: &str) -> Result<Option<f64>, AppError> {
    match trimmed(raw) {
        None => Ok(None),
        Some(v) => v
            .parse::<f64>()
            .map(Some)
            .map_err(|_| AppError::bad_request(format!("Invalid {field}"))),
    }
}

fn parse_flag(raw: Option<&str>) -> bool {
    matches!(raw.map(str::trim), Some("true") | Some("1"))
}
