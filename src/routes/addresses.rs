use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::addresses;
use crate::error::{map_constraint, AppError};
use crate::models::address::{Address, CreateAddressRequest, NewAddress, UpdateAddressRequest};
use crate::models::trimmed;
use crate::routes::extract::{CustomerAuth, JsonBody};

const MISSING_FIELDS: &str = "Missing required: name, phone, address_line1, city, state, pincode";
/// Payment sessions keep a reference to the address they ship to.
pub const ADDRESS_IN_USE: &str = "Address is used by a payment and cannot be deleted";

/// POST /address
pub async fn create(
    State(state): State<AppState>,
    CustomerAuth(claims): CustomerAuth,
    JsonBody(body): JsonBody<CreateAddressRequest>,
) -> Result<(StatusCode, Json<Address>), AppError> {
    body.validate()
        .map_err(|_| AppError::bad_request(MISSING_FIELDS))?;

    let required = |v: &Option<String>| trimmed(v.as_deref()).unwrap_or_default();
    let new = NewAddress {
        name: required(&body.name),
        phone: required(&body.phone),
        address_line1: required(&body.address_line1),
        address_line2: trimmed(body.address_line2.as_deref()),
        city: required(&body.city),
        state: required(&body.state),
        pincode: required(&body.pincode),
        is_default: body.is_default.unwrap_or(false),
    };

    let address = addresses::create(&state.db, claims.customer_id, &new).await?;
    Ok((StatusCode::CREATED, Json(address)))
}

/// GET /address
pub async fn list(
    State(state): State<AppState>,
    CustomerAuth(claims): CustomerAuth,
) -> Result<Json<Vec<Address>>, AppError> {
    let list = addresses::list_by_customer(&state.db, claims.customer_id).await?;
    Ok(Json(list))
}

/// PUT /address/{id}
pub async fn update(
    State(state): State<AppState>,
    CustomerAuth(claims): CustomerAuth,
    Path(id): Path<Uuid>,
    JsonBody(body): JsonBody<UpdateAddressRequest>,
) -> Result<Json<Address>, AppError> {
    addresses::update(&state.db, id, claims.customer_id, &body)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Address not found"))
}

/// DELETE /address/{id}
pub async fn delete(
    State(state): State<AppState>,
    CustomerAuth(claims): CustomerAuth,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let deleted = addresses::delete(&state.db, id, claims.customer_id)
        .await
        .map_err(|e| map_constraint(e, ADDRESS_IN_USE, ADDRESS_IN_USE))?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("Address not found"))
    }
}
