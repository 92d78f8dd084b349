use std::net::SocketAddr;

use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, FromRequest, FromRequestParts, Query, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::Json;
use serde::de::DeserializeOwned;

use crate::app_state::AppState;
use crate::error::AppError;
use crate::services::auth::{AdminClaims, CustomerClaims};
use crate::services::rate_limit::Limit;

const MISSING_AUTH: &str = "Missing or invalid authorization";
const INVALID_TOKEN: &str = "Invalid or expired token";

/// Requires a valid admin bearer token.
#[derive(Debug, Clone)]
pub struct AdminAuth(pub AdminClaims);

/// Requires a valid customer bearer token.
#[derive(Debug, Clone)]
pub struct CustomerAuth(pub CustomerClaims);

/// Client address used for rate limiting: the socket peer, or the first
/// `x-forwarded-for` hop when `TRUST_PROXY` is set.
#[derive(Debug, Clone)]
pub struct ClientIp(pub String);

/// JSON request body whose rejections render as `{"error": ...}`.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

/// Query string whose rejections render as `{"error": ...}`.
#[derive(Debug, Clone)]
pub struct QueryParams<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, AppError> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(JsonBody(value))
    }
}

impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, AppError> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(QueryParams(value))
    }
}

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized(MISSING_AUTH.to_string()))?;
        state
            .tokens
            .verify_admin(token)
            .map(AdminAuth)
            .ok_or_else(|| AppError::Unauthorized(INVALID_TOKEN.to_string()))
    }
}

impl FromRequestParts<AppState> for CustomerAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized(MISSING_AUTH.to_string()))?;
        state
            .tokens
            .verify_customer(token)
            .map(CustomerAuth)
            .ok_or_else(|| AppError::Unauthorized(INVALID_TOKEN.to_string()))
    }
}

impl FromRequestParts<AppState> for ClientIp {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());
        Ok(ClientIp(client_ip(
            &parts.headers,
            peer,
            state.config.trust_proxy,
        )))
    }
}

impl ClientIp {
    /// Counts this request against `limit`; 429 once it is exceeded.
    pub async fn enforce(&self, state: &AppState, limit: &Limit) -> Result<(), AppError> {
        if state.rate_limiter.check(limit, &self.0).await {
            return Ok(());
        }
        metrics::counter!("rate_limited_total", "bucket" => limit.bucket).increment(1);
        tracing::warn!(bucket = limit.bucket, client_ip = %self.0, "Rate limit exceeded");
        Err(AppError::TooManyRequests(
            "Too many attempts. Try again later.".to_string(),
        ))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn client_ip(headers: &HeaderMap, peer: Option<String>, trust_proxy: bool) -> String {
    let forwarded = trust_proxy
        .then(|| headers.get("x-forwarded-for"))
        .flatten()
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);
    forwarded.or(peer).unwrap_or_else(|| "unknown".to_string())
}
