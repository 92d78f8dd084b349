use axum::extract::State;
use axum::Json;

use crate::app_state::AppState;
use crate::db::site;
use crate::error::AppError;
use crate::models::site::{SiteContent, UpdateSiteRequest};
use crate::routes::extract::{AdminAuth, JsonBody};

/// GET /site
pub async fn public_site(State(state): State<AppState>) -> Result<Json<SiteContent>, AppError> {
    Ok(Json(current(&state).await?))
}

/// GET /admin/site
pub async fn get(
    State(state): State<AppState>,
    _admin: AdminAuth,
) -> Result<Json<SiteContent>, AppError> {
    Ok(Json(current(&state).await?))
}

/// PUT /admin/site
pub async fn update(
    State(state): State<AppState>,
    _admin: AdminAuth,
    JsonBody(body): JsonBody<UpdateSiteRequest>,
) -> Result<Json<SiteContent>, AppError> {
    let merged = current(&state).await?.merge(body);
    let saved = site::save(&state.db, &merged).await?;
    tracing::info!("Site content updated");
    Ok(Json(saved))
}

async fn current(state: &AppState) -> Result<SiteContent, sqlx::Error> {
    Ok(site::get(&state.db).await?.unwrap_or_default())
}
