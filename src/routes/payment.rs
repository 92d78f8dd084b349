use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;

use crate::app_state::AppState;
use crate::error::AppError;
use crate::models::order::OrdersResponse;
use crate::models::payment::{
    CreatePaymentOrderRequest, CreatePaymentOrderResponse, VerifyPaymentRequest, WebhookAck,
    WebhookEvent,
};
use crate::routes::extract::{ClientIp, CustomerAuth, JsonBody};
use crate::services::payment::{self, CartCheckout, PaymentError};
use crate::services::{rate_limit, razorpay};

const SIGNATURE_HEADER: &str = "x-razorpay-signature";

/// POST /payment/create-order: opens a Razorpay order for the cart.
pub async fn create_order(
    State(state): State<AppState>,
    CustomerAuth(claims): CustomerAuth,
    ip: ClientIp,
    JsonBody(body): JsonBody<CreatePaymentOrderRequest>,
) -> Result<(StatusCode, Json<CreatePaymentOrderResponse>), AppError> {
    ip.enforce(&state, &rate_limit::PAYMENT_CREATE).await?;

    let razorpay = state.razorpay.as_deref().ok_or(PaymentError::NotConfigured)?;
    let cart = CartCheckout::try_from(body)?;
    let response =
        payment::create_payment_order(&state.db, razorpay, claims.customer_id, &cart).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /payment/create-order-cod: cash on delivery, orders are created immediately.
pub async fn create_order_cod(
    State(state): State<AppState>,
    CustomerAuth(claims): CustomerAuth,
    ip: ClientIp,
    JsonBody(body): JsonBody<CreatePaymentOrderRequest>,
) -> Result<(StatusCode, Json<OrdersResponse>), AppError> {
    ip.enforce(&state, &rate_limit::PAYMENT_CREATE).await?;

    let cart = CartCheckout::try_from(body)?;
    let orders = payment::create_cod_orders(&state.db, claims.customer_id, &cart).await?;
    tracing::info!(customer_id = %claims.customer_id, orders = orders.len(), "COD orders created");
    Ok((StatusCode::CREATED, Json(OrdersResponse { orders })))
}

/// POST /payment/verify: checkout callback with the Razorpay signature.
pub async fn verify(
    State(state): State<AppState>,
    _customer: CustomerAuth,
    ip: ClientIp,
    JsonBody(body): JsonBody<VerifyPaymentRequest>,
) -> Result<Json<OrdersResponse>, AppError> {
    ip.enforce(&state, &rate_limit::PAYMENT_VERIFY).await?;

    let field = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    let (Some(order_id), Some(payment_id), Some(signature)) = (
        field(body.razorpay_order_id),
        field(body.razorpay_payment_id),
        field(body.razorpay_signature),
    ) else {
        return Err(AppError::bad_request(
            "Missing required: razorpay_order_id, razorpay_payment_id, razorpay_signature",
        ));
    };

    let result = payment::verify_and_fulfill(
        &state.db,
        state.razorpay.as_deref(),
        &order_id,
        &payment_id,
        &signature,
    )
    .await;

    let outcome = match &result {
        Ok(_) => "success",
        Err(PaymentError::InvalidSignature) => "invalid_signature",
        Err(_) => "error",
    };
    metrics::counter!("payment_verifications_total", "outcome" => outcome).increment(1);

    let orders = result.inspect_err(|e| {
        tracing::warn!(razorpay_order_id = %order_id, error = %e, "Payment verification failed");
    })?;
    Ok(Json(OrdersResponse { orders }))
}

/// POST /payment/webhook: Razorpay server-to-server events, signed over the raw body.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let Some(signature) = signature.filter(|_| !body.is_empty()) else {
        metrics::counter!("webhooks_received_total", "outcome" => "malformed").increment(1);
        return Err(AppError::bad_request("Missing body or signature"));
    };

    let secret = state.config.razorpay_webhook_secret.as_deref().unwrap_or_default();
    if !razorpay::verify_webhook_signature(secret, &body, signature) {
        metrics::counter!("webhooks_received_total", "outcome" => "invalid_signature").increment(1);
        return Err(AppError::bad_request("Invalid webhook signature"));
    }

    let event: WebhookEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, "Unparseable webhook payload");
            metrics::counter!("webhooks_received_total", "outcome" => "ignored").increment(1);
            return Ok(Json(WebhookAck { received: true }));
        }
    };

    let outcome = match (event.captured_payment(), state.razorpay.as_deref()) {
        (Some((order_id, payment_id)), Some(client)) => {
            match payment::fulfill_session(&state.db, client, order_id, payment_id).await {
                Ok(_) => "fulfilled",
                Err(PaymentError::SessionNotFound) => {
                    tracing::info!(razorpay_order_id = %order_id, "Webhook for a session that is not pending");
                    "ignored"
                }
                Err(e) => {
                    tracing::error!(razorpay_order_id = %order_id, error = %e, "Webhook fulfillment failed");
                    "error"
                }
            }
        }
        (Some((order_id, _)), None) => {
            tracing::error!(razorpay_order_id = %order_id, "Webhook received but Razorpay is not configured");
            "error"
        }
        (None, _) => {
            tracing::debug!(event = %event.event, "Webhook event ignored");
            "ignored"
        }
    };
    metrics::counter!("webhooks_received_total", "outcome" => outcome).increment(1);

    Ok(Json(WebhookAck { received: true }))
}
