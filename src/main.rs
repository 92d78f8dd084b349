use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;

use amrytum_backend::app_state::AppState;
use amrytum_backend::config::{self, AppConfig, Environment};
use amrytum_backend::db;
use amrytum_backend::routes;
use amrytum_backend::services::{rate_limit::RateLimiter, storage::Storage};

#[tokio::main]
async fn main() {
    // Structured logging: JSON in production, human-readable otherwise
    let environment = config::environment_from_env().expect("Invalid ENVIRONMENT");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if environment == Environment::Production {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).pretty().init();
    }

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!(environment = ?config.environment, "Initializing AMRYTUM backend");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);
    routes::metrics::describe();

    // Initialize database connection pool
    tracing::info!("Connecting to PostgreSQL database");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Running database migrations");
    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    // Lab report storage: S3 when credentials are set, local directory otherwise
    let storage = match &config.s3 {
        Some(s3) => {
            tracing::info!(bucket = %s3.bucket, endpoint = %s3.endpoint, "Using S3 storage");
            Storage::s3(s3).expect("Failed to initialize S3 client")
        }
        None => {
            let public_prefix = format!("{}/uploads", config.api_prefix);
            tracing::warn!(dir = %config.uploads_dir, "S3 credentials not set, storing uploads locally");
            std::fs::create_dir_all(Path::new(&config.uploads_dir))
                .expect("Failed to create uploads directory");
            Storage::local(&config.uploads_dir, &public_prefix)
        }
    };

    // Redis-backed rate limiting
    let rate_limiter = match config.redis_url.as_deref() {
        Some(url) => {
            tracing::info!("Connecting rate limiter to Redis");
            RateLimiter::new(Some(url)).expect("Failed to initialize rate limiter")
        }
        None => {
            tracing::warn!("REDIS_URL not set, rate limiting disabled");
            RateLimiter::disabled()
        }
    };

    if config.razorpay.is_none() {
        tracing::warn!("Razorpay keys not set, online payment is unavailable");
    }
    if config.twilio.is_none() {
        tracing::warn!("Twilio credentials not set, OTP codes are logged instead of sent");
    }

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(db_pool, config, storage, rate_limiter);
    let app = routes::app(state, prometheus_handle);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("AMRYTUM backend listening on {}", bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server error");
}
