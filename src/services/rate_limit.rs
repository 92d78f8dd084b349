use std::time::Duration;

use redis::AsyncCommands;

const KEY_PREFIX: &str = "amrytum:ratelimit";

/// A named fixed-window limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    pub bucket: &'static str,
    pub max: u64,
    pub window: Duration,
}

/// OTP request/verify and admin magic-link requests.
pub const AUTH: Limit = Limit {
    bucket: "auth",
    max: 20,
    window: Duration::from_secs(15 * 60),
};

pub const PAYMENT_CREATE: Limit = Limit {
    bucket: "payment-create",
    max: 10,
    window: Duration::from_secs(60),
};

pub const PAYMENT_VERIFY: Limit = Limit {
    bucket: "payment-verify",
    max: 20,
    window: Duration::from_secs(60),
};

pub const ORDER_CREATE: Limit = Limit {
    bucket: "order-create",
    max: 15,
    window: Duration::from_secs(60),
};

/// Redis-backed fixed-window counters (`INCR` + `EXPIRE`).
///
/// Without a Redis URL, or when Redis errors, every request is allowed.
pub struct RateLimiter {
    client: Option<redis::Client>,
}

impl RateLimiter {
    pub fn new(redis_url: Option<&str>) -> Result<Self, RateLimitError> {
        let client = redis_url.map(redis::Client::open).transpose()?;
        Ok(Self { client })
    }

    pub fn disabled() -> Self {
        Self { client: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    /// Counts one hit for `client_id` and reports whether it is within the limit.
    pub async fn check(&self, limit: &Limit, client_id: &str) -> bool {
        let Some(client) = &self.client else {
            return true;
        };
        match Self::hit(client, limit, client_id).await {
            Ok(count) => count <= limit.max,
            Err(e) => {
                tracing::warn!(bucket = limit.bucket, error = %e, "Rate limiter unavailable, allowing request");
                true
            }
        }
    }

    async fn hit(client: &redis::Client, limit: &Limit, client_id: &str) -> Result<u64, RateLimitError> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let key = window_key(limit, client_id);
        let count: u64 = conn.incr(&key, 1).await?;
        if count == 1 {
            conn.expire::<_, ()>(&key, limit.window.as_secs() as i64).await?;
        }
        Ok(count)
    }

    /// Check Redis connectivity (for health checks). `None` when not configured.
    pub async fn health_check(&self) -> Option<Result<(), RateLimitError>> {
        let client = self.client.as_ref()?;
        Some(Self::ping(client).await)
    }

    async fn ping(client: &redis::Client) -> Result<(), RateLimitError> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }
}

fn window_key(limit: &Limit, client_id: &str) -> String {
    format!("{KEY_PREFIX}:{}:{client_id}", limit.bucket)
}

#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_key() {
        assert_eq!(
            window_key(&PAYMENT_CREATE, "203.0.113.7"),
            "amrytum:ratelimit:payment-create:203.0.113.7"
        );
    }

    #[test]
    fn test_limits() {
        assert_eq!(AUTH.max, 20);
        assert_eq!(AUTH.window, Duration::from_secs(900));
        assert_eq!(ORDER_CREATE.max, 15);
        assert_eq!(PAYMENT_VERIFY.window, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_disabled_limiter_allows_everything() {
        let limiter = RateLimiter::new(None).unwrap();
        assert!(!limiter.is_enabled());
        for _ in 0..100 {
            assert!(limiter.check(&AUTH, "198.51.100.1").await);
        }
        assert!(limiter.health_check().await.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_redis_fails_open() {
        let limiter = RateLimiter::new(Some("redis://127.0.0.1:1/")).unwrap();
        assert!(limiter.check(&AUTH, "198.51.100.1").await);
    }
}
