use axum::extract::State;
use axum::Json;
use chrono::{Duration, Utc};

use crate::app_state::AppState;
use crate::config::MAGIC_LINK_EXPIRY_MINUTES;
use crate::db::admins;
use crate::error::AppError;
use crate::models::admin::{RequestLinkRequest, RequestLinkResponse, TokenResponse, VerifyLinkQuery};
use crate::routes::extract::{ClientIp, JsonBody, QueryParams};
use crate::services::{auth, rate_limit};

/// POST /admin/auth/request-link
pub async fn request_link(
    State(state): State<AppState>,
    ip: ClientIp,
    JsonBody(body): JsonBody<RequestLinkRequest>,
) -> Result<Json<RequestLinkResponse>, AppError> {
    ip.enforce(&state, &rate_limit::AUTH).await?;

    let email = required_email(body.email)?;

    let token = auth::generate_magic_token();
    let expires_at = Utc::now() + Duration::minutes(MAGIC_LINK_EXPIRY_MINUTES);
    let admin = admins::upsert_magic_link(&state.db, &email, &token, expires_at).await?;

    let link = auth::magic_link(&state.config.magic_link_base_url, &token);
    tracing::info!(admin_id = %admin.id, "Magic link issued");

    if state.config.is_production() {
        return Ok(Json(RequestLinkResponse {
            message: "If an account exists, a login link has been sent.".to_string(),
            dev_link: None,
        }));
    }

    tracing::info!(link = %link, "Magic link (development)");
    Ok(Json(RequestLinkResponse {
        message: "Magic link generated. Use dev_link to log in.".to_string(),
        dev_link: Some(link),
    }))
}

/// GET /admin/auth/verify?token=
pub async fn verify_link(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<VerifyLinkQuery>,
) -> Result<Json<TokenResponse>, AppError> {
    let token = required_token(query.token)?;

    let admin = admins::consume_magic_link(&state.db, &token)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired link".to_string()))?;

    let token = state
        .tokens
        .sign_admin(admin.id, &admin.email)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    tracing::info!(admin_id = %admin.id, "Admin logged in");
    Ok(Json(TokenResponse { token }))
}

/// Lower-cased, trimmed email; 400 when absent.
fn required_email(raw: Option<String>) -> Result<String, AppError> {
    raw.map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::bad_request("Missing email"))
}

fn required_token(raw: Option<String>) -> Result<String, AppError> {
    raw.map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::bad_request("Missing token"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_email() {
        assert_eq!(
            required_email(Some("  Owner@Amrytum.in ".to_string())).unwrap(),
            "owner@amrytum.in"
        );
        assert_eq!(required_email(None).unwrap_err().to_string(), "Missing email");
        assert_eq!(
            required_email(Some("   ".to_string())).unwrap_err().to_string(),
            "Missing email"
        );
    }

    #[test]
    fn test_required_token() {
        assert_eq!(required_token(Some("abc123".to_string())).unwrap(), "abc123");
        assert_eq!(required_token(None).unwrap_err().to_string(), "Missing token");
        assert_eq!(
            required_token(Some(String::new())).unwrap_err().to_string(),
            "Missing token"
        );
    }
}
