use std::time::Duration;

use amrytum_backend::{config::AppConfig, db, db::otps, services::payment};
use chrono::Utc;
use sqlx::PgPool;
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

const SWEEP_INTERVAL_SECS: u64 = 60;
/// OTP rows are kept this long past expiry before being pruned.
const OTP_RETENTION_HOURS: i64 = 24;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting maintenance worker");

    let config = AppConfig::from_env().expect("Failed to load configuration");

    tracing::info!("Connecting to PostgreSQL");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!(interval_secs = SWEEP_INTERVAL_SECS, "Worker ready, starting sweep loop");

    loop {
        if let Err(e) = sweep(&db_pool).await {
            tracing::error!(error = %e, "Sweep failed, will retry");
        }
        sleep(Duration::from_secs(SWEEP_INTERVAL_SECS)).await;
    }
}

/// Expires abandoned payment sessions and prunes old OTP rows.
async fn sweep(pool: &PgPool) -> Result<(), sqlx::Error> {
    let expired = payment::expire_stale_sessions(pool).await?;
    if expired > 0 {
        tracing::info!(expired, "Expired stale payment sessions");
    }

    let cutoff = Utc::now() - chrono::Duration::hours(OTP_RETENTION_HOURS);
    let pruned = otps::delete_expired(pool, cutoff).await?;
    if pruned > 0 {
        tracing::info!(pruned, "Pruned expired OTPs");
    }

    tracing::debug!("Sweep complete");
    Ok(())
}
