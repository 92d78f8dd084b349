use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::catalog;
use crate::error::{map_constraint, AppError};
use crate::models::catalog::{
    Catalog, CatalogProduct, CreateProductRequest, PublicProduct, UpdateProductRequest,
};
use crate::models::trimmed;
use crate::routes::extract::{AdminAuth, JsonBody};

const MISSING_FIELDS: &str =
    "Missing required: productId, name, description, sizes (non-empty), defaultSizeId";

/// GET /catalog
pub async fn public_catalog(State(state): State<AppState>) -> Result<Json<Catalog>, AppError> {
    let products = catalog::list(&state.db)
        .await?
        .into_iter()
        .map(PublicProduct::from)
        .collect();
    Ok(Json(Catalog { products }))
}

/// GET /admin/catalog
pub async fn list(
    State(state): State<AppState>,
    _admin: AdminAuth,
) -> Result<Json<Vec<CatalogProduct>>, AppError> {
    Ok(Json(catalog::list(&state.db).await?))
}

/// POST /admin/catalog/products
pub async fn create(
    State(state): State<AppState>,
    _admin: AdminAuth,
    JsonBody(body): JsonBody<CreateProductRequest>,
) -> Result<(StatusCode, Json<CatalogProduct>), AppError> {
    body.validate()
        .map_err(|_| AppError::bad_request(MISSING_FIELDS))?;

    let (Some(product_id), Some(name), Some(description), Some(sizes), Some(default_size_id)) = (
        trimmed(body.product_id.as_deref()),
        trimmed(body.name.as_deref()),
        trimmed(body.description.as_deref()),
        body.sizes.as_deref(),
        trimmed(body.default_size_id.as_deref()),
    ) else {
        return Err(AppError::bad_request(MISSING_FIELDS));
    };

    if catalog::exists(&state.db, &product_id).await? {
        return Err(AppError::Conflict("Product ID already exists".to_string()));
    }

    let product = catalog::create(
        &state.db,
        &product_id,
        &name,
        &description,
        sizes,
        &default_size_id,
        body.sort_order.unwrap_or(0),
    )
    .await
    .map_err(|e| map_constraint(e, "Product ID already exists", "Invalid reference"))?;

    tracing::info!(product_id = %product.product_id, "Catalog product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /admin/catalog/products/{id}
pub async fn update(
    State(state): State<AppState>,
    _admin: AdminAuth,
    Path(id): Path<Uuid>,
    JsonBody(body): JsonBody<UpdateProductRequest>,
) -> Result<Json<CatalogProduct>, AppError> {
    if body.sizes.as_ref().is_some_and(Vec::is_empty) {
        return Err(AppError::bad_request("sizes must not be empty"));
    }
    catalog::update(&state.db, id, &body)
        .await
        .map_err(|e| map_constraint(e, "Product ID already exists", "Invalid reference"))?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Product not found"))
}

/// DELETE /admin/catalog/products/{id}
pub async fn delete(
    State(state): State<AppState>,
    _admin: AdminAuth,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if catalog::delete(&state.db, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("Product not found"))
    }
}
