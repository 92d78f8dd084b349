use std::time::Instant;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::orders;
use crate::error::{map_constraint, AppError};
use crate::models::order::{
    CheckoutRequest, CreateOrderRequest, DeliveryStatus, NewOrder, OrderDetail, OrderFilter,
    OrderStats, PaymentStatus, UpdateOrderRequest,
};
use crate::models::trimmed;
use crate::routes::extract::{AdminAuth, ClientIp, CustomerAuth, JsonBody, QueryParams};
use crate::services::checkout::{self, CheckoutInput, JarSelection};
use crate::services::rate_limit;

/// POST /order/create: customer checkout of a single jar.
pub async fn checkout(
    State(state): State<AppState>,
    CustomerAuth(claims): CustomerAuth,
    ip: ClientIp,
    JsonBody(body): JsonBody<CheckoutRequest>,
) -> Result<(StatusCode, Json<OrderDetail>), AppError> {
    ip.enforce(&state, &rate_limit::ORDER_CREATE).await?;
    let started = Instant::now();

    let selection =
        JarSelection::from_parts(body.jar_id.as_deref(), body.batch_id.as_deref(), body.size)?;
    let input = CheckoutInput {
        customer_id: claims.customer_id,
        address_id: body.address_id,
        selection,
        payment_status: PaymentStatus::Pending,
        amount_paise: None,
    };
    let order = checkout::place_order(&state.db, &input).await?;

    metrics::histogram!("checkout_seconds").record(started.elapsed().as_secs_f64());

    let detail = orders::load_details(&state.db, vec![order], true)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::Internal("created order vanished".to_string()))?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// GET /orders/me
pub async fn my_orders(
    State(state): State<AppState>,
    CustomerAuth(claims): CustomerAuth,
) -> Result<Json<Vec<OrderDetail>>, AppError> {
    let list = orders::list_by_customer(&state.db, claims.customer_id).await?;
    Ok(Json(orders::load_details(&state.db, list, false).await?))
}

/// POST /orders: manual order entry from the back office.
pub async fn create(
    State(state): State<AppState>,
    _admin: AdminAuth,
    JsonBody(body): JsonBody<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderDetail>), AppError> {
    let (Some(order_id), Some(customer_id), Some(jar_id), Some(batch_id), Some(address)) = (
        trimmed(body.order_id.as_deref()),
        body.customer_id,
        body.jar_id,
        body.batch_id,
        trimmed(body.address.as_deref()),
    ) else {
        return Err(AppError::bad_request(
            "Missing required: orderId, customerId, jarId, batchId, address",
        ));
    };

    let order = orders::insert(
        &state.db,
        &NewOrder {
            order_id,
            customer_id,
            jar_id,
            batch_id,
            payment_status: body.payment_status.unwrap_or(PaymentStatus::Pending),
            delivery_status: body.delivery_status.unwrap_or(DeliveryStatus::Pending),
            address,
            address_id: None,
            amount_paise: None,
        },
    )
    .await
    .map_err(|e| {
        map_constraint(e, "orderId already exists", "Invalid customerId, jarId, or batchId")
    })?;

    tracing::info!(order_id = %order.order_id, "Manual order created");

    let detail = orders::load_details(&state.db, vec![order], true)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::Internal("created order vanished".to_string()))?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// GET /orders?customerId=&paymentStatus=&deliveryStatus=
pub async fn list(
    State(state): State<AppState>,
    _admin: AdminAuth,
    QueryParams(filter): QueryParams<OrderFilter>,
) -> Result<Json<Vec<OrderDetail>>, AppError> {
    let list = orders::list(&state.db, &filter).await?;
    Ok(Json(orders::load_details(&state.db, list, true).await?))
}

/// GET /orders/stats
pub async fn stats(
    State(state): State<AppState>,
    _admin: AdminAuth,
) -> Result<Json<OrderStats>, AppError> {
    Ok(Json(orders::stats(&state.db).await?))
}

/// GET /orders/{id}
pub async fn get(
    State(state): State<AppState>,
    _admin: AdminAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderDetail>, AppError> {
    orders::detail(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Order not found"))
}

/// PATCH /orders/{id}
pub async fn update(
    State(state): State<AppState>,
    _admin: AdminAuth,
    Path(id): Path<Uuid>,
    JsonBody(body): JsonBody<UpdateOrderRequest>,
) -> Result<Json<OrderDetail>, AppError> {
    let order = orders::update(&state.db, id, &body)
        .await?
        .ok_or_else(|| AppError::not_found("Order not found"))?;

    tracing::info!(
        order_id = %order.order_id,
        payment_status = %order.payment_status,
        delivery_status = %order.delivery_status,
        "Order updated"
    );

    let detail = orders::load_details(&state.db, vec![order], true)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::not_found("Order not found"))?;
    Ok(Json(detail))
}
