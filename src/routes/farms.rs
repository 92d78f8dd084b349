use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::{batches, farms};
use crate::error::AppError;
use crate::models::farm::{CreateFarmRequest, Farm, FarmDetail};
use crate::models::trimmed;
use crate::routes::extract::{AdminAuth, JsonBody};

/// POST /farms
pub async fn create(
    State(state): State<AppState>,
    _admin: AdminAuth,
    JsonBody(body): JsonBody<CreateFarmRequest>,
) -> Result<(StatusCode, Json<Farm>), AppError> {
    body.validate()
        .map_err(|_| AppError::bad_request("Missing required: name"))?;

    let name = trimmed(body.name.as_deref()).unwrap_or_default();
    let farm = farms::create(
        &state.db,
        &name,
        trimmed(body.location.as_deref()).as_deref(),
        trimmed(body.notes.as_deref()).as_deref(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(farm)))
}

/// GET /farms
pub async fn list(
    State(state): State<AppState>,
    _admin: AdminAuth,
) -> Result<Json<Vec<Farm>>, AppError> {
    Ok(Json(farms::list(&state.db).await?))
}

/// GET /farms/{id}
pub async fn get(
    State(state): State<AppState>,
    _admin: AdminAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<FarmDetail>, AppError> {
    let farm = farms::get(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Farm not found"))?;
    let batches = batches::list_by_farm(&state.db, id).await?;
    Ok(Json(FarmDetail { farm, batches }))
}
