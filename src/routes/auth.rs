use axum::extract::State;
use axum::Json;
use chrono::{Duration, Utc};

use crate::app_state::AppState;
use crate::config::{OTP_EXPIRY_MINUTES, OTP_MAX_ATTEMPTS_PER_PHONE};
use crate::db::{customers, otps};
use crate::error::AppError;
use crate::models::customer::{
    CustomerProfile, LoginCustomer, OkResponse, RequestOtpRequest, VerifyOtpRequest,
    VerifyOtpResponse,
};
use crate::routes::extract::{ClientIp, CustomerAuth, JsonBody};
use crate::services::{otp, rate_limit};

/// POST /auth/request-otp: issue a login code for a phone number.
pub async fn request_otp(
    State(state): State<AppState>,
    ip: ClientIp,
    JsonBody(body): JsonBody<RequestOtpRequest>,
) -> Result<Json<OkResponse>, AppError> {
    ip.enforce(&state, &rate_limit::AUTH).await?;

    let phone = body
        .phone
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| AppError::bad_request("Missing phone"))?;
    let phone = otp::normalize_phone(&phone);
    if !otp::is_valid_phone(&phone) {
        return Err(AppError::bad_request("Invalid phone number"));
    }

    let since = Utc::now() - Duration::minutes(OTP_EXPIRY_MINUTES);
    let recent = otps::count_recent_unused(&state.db, &phone, since).await?;
    if recent >= OTP_MAX_ATTEMPTS_PER_PHONE {
        return Err(AppError::TooManyRequests(
            "Too many OTP requests. Try again later.".to_string(),
        ));
    }

    let code = otp::generate_code(state.config.allow_dummy_otp);
    let expires_at = Utc::now() + Duration::minutes(OTP_EXPIRY_MINUTES);
    otps::create(&state.db, &phone, &code, expires_at).await?;
    state.sms.send_otp(&phone, &code).await?;

    metrics::counter!("otp_requests_total").increment(1);
    tracing::info!(phone = %phone, "OTP issued");

    Ok(Json(OkResponse { ok: true }))
}

/// POST /auth/verify-otp: exchange a code for a customer token.
pub async fn verify_otp(
    State(state): State<AppState>,
    ip: ClientIp,
    JsonBody(body): JsonBody<VerifyOtpRequest>,
) -> Result<Json<VerifyOtpResponse>, AppError> {
    ip.enforce(&state, &rate_limit::AUTH).await?;

    let phone = body.phone.as_deref().map(otp::normalize_phone).unwrap_or_default();
    let code = body.otp.as_deref().map(str::trim).unwrap_or_default();
    if phone.is_empty() || code.is_empty() {
        return Err(AppError::bad_request("Missing phone or otp"));
    }

    if !otp::is_dummy(code, state.config.allow_dummy_otp)
        && !otps::consume(&state.db, &phone, code).await?
    {
        return Err(AppError::bad_request("Invalid or expired OTP"));
    }

    let customer = customers::find_or_create_by_phone(&state.db, &phone).await?;
    let token = state
        .tokens
        .sign_customer(customer.id, &phone)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    tracing::info!(customer_id = %customer.id, "Customer logged in");

    Ok(Json(VerifyOtpResponse {
        token,
        customer: LoginCustomer {
            id: customer.id,
            phone: customer.phone,
            name: customer.name,
        },
    }))
}

/// GET /auth/me
pub async fn me(
    State(state): State<AppState>,
    CustomerAuth(claims): CustomerAuth,
) -> Result<Json<CustomerProfile>, AppError> {
    let customer = customers::get(&state.db, claims.customer_id)
        .await?
        .ok_or_else(|| AppError::not_found("Customer not found"))?;
    Ok(Json(customer.into()))
}
