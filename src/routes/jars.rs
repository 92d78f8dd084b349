use std::str::FromStr;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::{batches, jars};
use crate::error::{map_constraint, AppError};
use crate::models::batch::Batch;
use crate::models::jar::{
    BulkCreateJarsRequest, BulkCreateJarsResponse, CreateJarRequest, Jar, JarDetail, JarFilter,
    JarSize, JarWithBatch, UpdateJarRequest,
};
use crate::models::trimmed;
use crate::routes::extract::{AdminAuth, JsonBody, QueryParams};

/// Upper bound for one bulk insert.
pub const MAX_BULK_JARS: i64 = 1000;

/// POST /jars
pub async fn create(
    State(state): State<AppState>,
    _admin: AdminAuth,
    JsonBody(body): JsonBody<CreateJarRequest>,
) -> Result<(StatusCode, Json<JarWithBatch>), AppError> {
    let (Some(batch_ref), Some(size)) = (
        trimmed(body.batch_id.as_deref()),
        trimmed(body.size.as_deref()),
    ) else {
        return Err(AppError::bad_request(
            "Missing required: batchId, size (SIZE_250ML | SIZE_500ML | SIZE_1L)",
        ));
    };
    let size = parse_size(&size)?;
    let batch = resolve_batch(&state, &batch_ref).await?;

    let jar_id = trimmed(body.jar_id.as_deref()).unwrap_or_else(|| Uuid::new_v4().to_string());
    let jar = jars::create(&state.db, &jar_id, batch.id, size)
        .await
        .map_err(|e| map_constraint(e, "jarId already exists", "Invalid batchId"))?;

    Ok((StatusCode::CREATED, Json(JarWithBatch { jar, batch })))
}

/// POST /jars/bulk
pub async fn create_bulk(
    State(state): State<AppState>,
    _admin: AdminAuth,
    JsonBody(body): JsonBody<BulkCreateJarsRequest>,
) -> Result<(StatusCode, Json<BulkCreateJarsResponse>), AppError> {
    let (Some(batch_ref), Some(size), Some(count)) = (
        trimmed(body.batch_id.as_deref()),
        trimmed(body.size.as_deref()),
        body.count.filter(|c| *c >= 1),
    ) else {
        return Err(AppError::bad_request(
            "Missing or invalid: batchId, size, count (>= 1)",
        ));
    };
    let size = parse_size(&size)?;
    let batch = resolve_batch(&state, &batch_ref).await?;
    let count = count.min(MAX_BULK_JARS) as usize;

    let created = jars::create_many(&state.db, batch.id, size, count)
        .await
        .map_err(|e| map_constraint(e, "jarId already exists", "Invalid batchId"))?;

    tracing::info!(batch_id = %batch.batch_id, size = %size, count = created.len(), "Jars created");

    let jars: Vec<JarWithBatch> = created
        .into_iter()
        .map(|jar| JarWithBatch {
            jar,
            batch: batch.clone(),
        })
        .collect();
    Ok((
        StatusCode::CREATED,
        Json(BulkCreateJarsResponse {
            count: jars.len(),
            jars,
        }),
    ))
}

/// GET /jars?batchId=&status=&size=
pub async fn list(
    State(state): State<AppState>,
    _admin: AdminAuth,
    QueryParams(filter): QueryParams<JarFilter>,
) -> Result<Json<Vec<JarWithBatch>>, AppError> {
    let batch_id = match trimmed(filter.batch_id.as_deref()) {
        Some(reference) => match batches::resolve(&state.db, &reference).await? {
            Some(batch) => Some(batch.id),
            None => return Ok(Json(Vec::new())),
        },
        None => None,
    };
    Ok(Json(jars::list(&state.db, batch_id, &filter).await?))
}

/// GET /jars/{id}
pub async fn get(
    State(state): State<AppState>,
    _admin: AdminAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<JarDetail>, AppError> {
    jars::detail(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Jar not found"))
}

/// PATCH /jars/{id}
pub async fn update(
    State(state): State<AppState>,
    _admin: AdminAuth,
    Path(id): Path<Uuid>,
    JsonBody(body): JsonBody<UpdateJarRequest>,
) -> Result<Json<Jar>, AppError> {
    jars::update(&state.db, id, &body)
        .await
        .map_err(|e| map_constraint(e, "jarId already exists", "Invalid customerId"))?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Jar not found"))
}

fn parse_size(raw: &str) -> Result<JarSize, AppError> {
    JarSize::from_str(raw).map_err(|_| AppError::bad_request("Invalid size"))
}

async fn resolve_batch(state: &AppState, reference: &str) -> Result<Batch, AppError> {
    batches::resolve(&state.db, reference)
        .await?
        .ok_or_else(|| AppError::bad_request("Invalid batchId"))
}
