use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::app_state::AppState;

pub const SERVICE_NAME: &str = "amrytum-backend";

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub database: ComponentHealth,
    pub redis: ComponentHealth,
}

#[derive(Serialize)]
pub struct ComponentHealth {
    pub status: String,
    pub latency_ms: Option<u64>,
}

impl ComponentHealth {
    fn ok(latency_ms: u64) -> Self {
        Self {
            status: "ok".to_string(),
            latency_ms: Some(latency_ms),
        }
    }

    fn with_status(status: &str) -> Self {
        Self {
            status: status.to_string(),
            latency_ms: None,
        }
    }
}

/// GET /health: dependency status. 503 only when the database is unreachable;
/// Redis backs rate limiting, which fails open.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let start = std::time::Instant::now();
    let db_check = match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => ComponentHealth::ok(start.elapsed().as_millis() as u64),
        Err(e) => {
            tracing::error!(error = %e, "Health check: database unreachable");
            ComponentHealth::with_status("error")
        }
    };

    let redis_start = std::time::Instant::now();
    let redis_check = match state.rate_limiter.health_check().await {
        None => ComponentHealth::with_status("disabled"),
        Some(Ok(())) => ComponentHealth::ok(redis_start.elapsed().as_millis() as u64),
        Some(Err(e)) => {
            tracing::warn!(error = %e, "Health check: redis unreachable");
            ComponentHealth::with_status("error")
        }
    };

    let db_ok = db_check.status == "ok";
    let status = match (db_ok, redis_check.status.as_str()) {
        (false, _) => "unavailable",
        (true, "error") => "degraded",
        (true, _) => "ok",
    };
    let status_code = if db_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: status.to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            database: db_check,
            redis: redis_check,
        },
    };

    (status_code, Json(response))
}
