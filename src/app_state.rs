use sqlx::PgPool;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::{
    auth::TokenService, rate_limit::RateLimiter, razorpay::RazorpayClient, sms::SmsSender,
    storage::Storage,
};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub tokens: Arc<TokenService>,
    pub storage: Arc<Storage>,
    pub sms: Arc<SmsSender>,
    /// `None` when Razorpay keys are not configured.
    pub razorpay: Option<Arc<RazorpayClient>>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(db: PgPool, config: AppConfig, storage: Storage, rate_limiter: RateLimiter) -> Self {
        let tokens = TokenService::new(
            &config.jwt_secret,
            config.admin_jwt_expiry_days,
            config.customer_jwt_expiry_days,
        );
        let sms = SmsSender::new(config.twilio.clone());
        let razorpay = config.razorpay.as_ref().map(RazorpayClient::new).map(Arc::new);

        Self {
            db,
            config: Arc::new(config),
            tokens: Arc::new(tokens),
            storage: Arc::new(storage),
            sms: Arc::new(sms),
            razorpay,
            rate_limiter: Arc::new(rate_limiter),
        }
    }
}
