use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::{customers, jars, orders};
use crate::error::{map_constraint, map_not_found, AppError};
use crate::models::customer::{
    CreateCustomerRequest, Customer, CustomerDetail, CustomerSearch, CustomerWithOrderCount,
    UpdateCustomerRequest,
};
use crate::models::trimmed;
use crate::routes::extract::{AdminAuth, JsonBody, QueryParams};

/// POST /customers
pub async fn create(
    State(state): State<AppState>,
    _admin: AdminAuth,
    JsonBody(body): JsonBody<CreateCustomerRequest>,
) -> Result<(StatusCode, Json<Customer>), AppError> {
    body.validate()
        .map_err(|_| AppError::bad_request("Missing required: name"))?;

    let req = CreateCustomerRequest {
        name: trimmed(body.name.as_deref()),
        phone: trimmed(body.phone.as_deref()),
        email: trimmed(body.email.as_deref()),
        notes: trimmed(body.notes.as_deref()),
    };
    let customer = customers::create(&state.db, &req)
        .await
        .map_err(|e| map_constraint(e, "Phone already registered", "Invalid reference"))?;
    Ok((StatusCode::CREATED, Json(customer)))
}

/// GET /customers?search=
pub async fn list(
    State(state): State<AppState>,
    _admin: AdminAuth,
    QueryParams(query): QueryParams<CustomerSearch>,
) -> Result<Json<Vec<CustomerWithOrderCount>>, AppError> {
    let search = trimmed(query.search.as_deref());
    let list = customers::list_with_order_counts(&state.db, search.as_deref()).await?;
    Ok(Json(list))
}

/// GET /customers/{id}: the customer with owned jars and orders.
pub async fn get(
    State(state): State<AppState>,
    _admin: AdminAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<CustomerDetail>, AppError> {
    let customer = customers::get(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Customer not found"))?;
    let jars = jars::list_by_customer(&state.db, id).await?;
    let orders = orders::list_by_customer(&state.db, id).await?;
    Ok(Json(CustomerDetail {
        customer,
        jars,
        orders,
    }))
}

/// PATCH /customers/{id}
pub async fn update(
    State(state): State<AppState>,
    _admin: AdminAuth,
    Path(id): Path<Uuid>,
    JsonBody(body): JsonBody<UpdateCustomerRequest>,
) -> Result<Json<Customer>, AppError> {
    let customer = customers::update(&state.db, id, &body)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => map_not_found(e, "Customer not found"),
            other => map_constraint(other, "Phone already registered", "Invalid firstOrderBatchId"),
        })?;
    Ok(Json(customer))
}
