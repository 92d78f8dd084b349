use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Back-office user. Logs in through single-use magic links only.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub magic_link_token: Option<String>,
    #[serde(skip_serializing)]
    pub magic_link_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RequestLinkRequest {
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RequestLinkResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev_link: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyLinkQuery {
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}
