use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::{batches, jars, lab_reports};
use crate::error::{map_constraint, AppError};
use crate::models::batch::{
    normalize_batch_id, Batch, BatchFilter, BatchStatus, BatchWithFarm, BatchWithReports,
    CreateBatchRequest, NewBatch, UpdateBatchRequest,
};
use crate::models::jar::StockAvailability;
use crate::models::lab_report::LabReport;
use crate::models::{parse_date, trimmed};
use crate::routes::extract::{AdminAuth, JsonBody, QueryParams};

const MISSING_FIELDS: &str =
    "Missing required fields: batchId, farmId, date, cowsCount, milkLiters, gheeOutputLiters";

/// POST /batches
pub async fn create(
    State(state): State<AppState>,
    _admin: AdminAuth,
    JsonBody(body): JsonBody<CreateBatchRequest>,
) -> Result<(StatusCode, Json<Batch>), AppError> {
    body.validate()
        .map_err(|_| AppError::bad_request(MISSING_FIELDS))?;

    let (Some(batch_id), Some(farm_id), Some(date), Some(cows_count), Some(milk), Some(ghee)) = (
        body.batch_id.as_deref(),
        body.farm_id,
        body.date.as_deref(),
        body.cows_count,
        body.milk_liters,
        body.ghee_output_liters,
    ) else {
        return Err(AppError::bad_request(MISSING_FIELDS));
    };
    let date = parse_date(date).ok_or_else(|| AppError::bad_request("Invalid date"))?;

    let new = NewBatch {
        batch_id: normalize_batch_id(batch_id),
        farm_id,
        date,
        cows_count,
        milk_liters: milk,
        ghee_output_liters: ghee,
        processing_notes: trimmed(body.processing_notes.as_deref()),
    };

    let batch = batches::create(&state.db, &new)
        .await
        .map_err(|e| map_constraint(e, "Batch ID already exists", "Invalid farmId"))?;

    tracing::info!(batch_id = %batch.batch_id, "Batch created");
    Ok((StatusCode::CREATED, Json(batch)))
}

/// GET /batches?status=&farmId=
pub async fn list(
    State(state): State<AppState>,
    _admin: AdminAuth,
    QueryParams(filter): QueryParams<BatchFilter>,
) -> Result<Json<Vec<BatchWithFarm>>, AppError> {
    Ok(Json(batches::list(&state.db, &filter).await?))
}

/// PATCH /batches/{id}
pub async fn update(
    State(state): State<AppState>,
    _admin: AdminAuth,
    Path(id): Path<Uuid>,
    JsonBody(body): JsonBody<UpdateBatchRequest>,
) -> Result<Json<Batch>, AppError> {
    let date = match body.date.as_deref() {
        Some(raw) => Some(parse_date(raw).ok_or_else(|| AppError::bad_request("Invalid date"))?),
        None => None,
    };

    batches::update(&state.db, id, &body, date)
        .await
        .map_err(|e| map_constraint(e, "Batch ID already exists", "Invalid farmId"))?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Batch not found"))
}

/// POST /batches/{id}/approve
pub async fn approve(
    State(state): State<AppState>,
    _admin: AdminAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<Batch>, AppError> {
    set_status(&state, id, BatchStatus::Approved).await
}

/// POST /batches/{id}/reject
pub async fn reject(
    State(state): State<AppState>,
    _admin: AdminAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<Batch>, AppError> {
    set_status(&state, id, BatchStatus::Rejected).await
}

async fn set_status(state: &AppState, id: Uuid, status: BatchStatus) -> Result<Json<Batch>, AppError> {
    let batch = batches::set_status(&state.db, id, status)
        .await?
        .ok_or_else(|| AppError::not_found("Batch not found"))?;
    tracing::info!(batch_id = %batch.batch_id, status = %status, "Batch status changed");
    Ok(Json(batch))
}

/// GET /batches/public
pub async fn list_public(
    State(state): State<AppState>,
) -> Result<Json<Vec<BatchWithReports>>, AppError> {
    Ok(Json(batches::list_public(&state.db).await?))
}

/// GET /batch/{batch_id}
pub async fn public_detail(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
) -> Result<Json<BatchWithReports>, AppError> {
    batches::public_detail(&state.db, &batch_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Batch not found"))
}

/// GET /batch/{batch_id}/lab-reports
pub async fn public_lab_reports(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
) -> Result<Json<Vec<LabReport>>, AppError> {
    let batch = batches::find_by_batch_id(&state.db, &batch_id)
        .await?
        .ok_or_else(|| AppError::not_found("Batch not found"))?;
    Ok(Json(lab_reports::list_by_batch(&state.db, batch.id).await?))
}

/// GET /stock/availability: available jars per size in the newest approved batch.
pub async fn stock_availability(
    State(state): State<AppState>,
) -> Result<Json<StockAvailability>, AppError> {
    let stock = match batches::latest_approved(&state.db).await? {
        Some(batch) => jars::availability(&state.db, batch.id).await?,
        None => StockAvailability::default(),
    };
    Ok(Json(stock))
}
