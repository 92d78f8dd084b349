use serde::Deserialize;

/// OTP lifetime and the window used to count recent requests per phone.
pub const OTP_EXPIRY_MINUTES: i64 = 5;
/// Unused OTPs allowed per phone inside one expiry window.
pub const OTP_MAX_ATTEMPTS_PER_PHONE: i64 = 3;
pub const OTP_LENGTH: u32 = 6;
/// Fixed code accepted when dummy OTPs are allowed.
pub const DUMMY_OTP: &str = "123456";

pub const MAGIC_LINK_EXPIRY_MINUTES: i64 = 15;
pub const PAYMENT_SESSION_EXPIRY_MINUTES: i64 = 60;

const DEV_DATABASE_URL: &str = "postgresql://localhost:5432/amrytum";
const DEV_JWT_SECRET: &str = "dev-secret-min-32-chars-change-in-production";

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Test,
    Production,
}

/// Raw environment, as deserialized by `envy`.
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default = "default_bind_addr")]
    bind_addr: String,

    #[serde(default = "default_environment")]
    environment: Environment,

    #[serde(default = "default_api_prefix")]
    api_prefix: String,

    database_url: Option<String>,
    redis_url: Option<String>,
    jwt_secret: Option<String>,

    #[serde(default = "default_customer_jwt_expiry_days")]
    customer_jwt_expiry_days: i64,

    #[serde(default = "default_admin_jwt_expiry_days")]
    admin_jwt_expiry_days: i64,

    #[serde(default = "default_magic_link_base_url")]
    magic_link_base_url: String,

    cors_allowed_origin: Option<String>,
    allow_dummy_otp: Option<String>,

    #[serde(default)]
    trust_proxy: bool,

    razorpay_key_id: Option<String>,
    razorpay_key_secret: Option<String>,
    razorpay_webhook_secret: Option<String>,

    twilio_account_sid: Option<String>,
    twilio_auth_token: Option<String>,
    twilio_phone_number: Option<String>,

    #[serde(default = "default_s3_endpoint")]
    s3_endpoint: String,
    #[serde(default = "default_s3_region")]
    s3_region: String,
    #[serde(default = "default_s3_bucket")]
    s3_bucket: String,
    s3_access_key: Option<String>,
    s3_secret_key: Option<String>,

    #[serde(default = "default_uploads_dir")]
    uploads_dir: String,
}

#[derive(Debug, Clone)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: String,
}

#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

#[derive(Debug, Clone)]
pub struct S3Config {
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:4000").
    pub bind_addr: String,

    pub environment: Environment,

    /// Prefix every API route is mounted under (e.g., "/api").
    pub api_prefix: String,

    /// PostgreSQL connection string
    pub database_url: String,

    /// Redis connection string for rate limiting. Limits are not enforced without it.
    pub redis_url: Option<String>,

    /// HS256 secret shared by admin and customer tokens
    pub jwt_secret: String,

    pub customer_jwt_expiry_days: i64,
    pub admin_jwt_expiry_days: i64,

    /// Admin login links are `<magic_link_base_url>?token=<token>`
    pub magic_link_base_url: String,

    /// Comma-separated allowed origins; any origin when unset
    pub cors_allowed_origin: Option<String>,

    pub allow_dummy_otp: bool,

    /// Take the client address from `x-forwarded-for`. Only safe behind a proxy
    /// that overwrites the header; the socket peer is used otherwise.
    pub trust_proxy: bool,

    /// Present only when both key id and secret are set
    pub razorpay: Option<RazorpayConfig>,
    pub razorpay_webhook_secret: Option<String>,

    /// Present only when SID, token and sender number are all set
    pub twilio: Option<TwilioConfig>,

    /// Present only when S3 credentials are set; uploads go to `uploads_dir` otherwise
    pub s3: Option<S3Config>,
    pub uploads_dir: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:4000".to_string()
}

fn default_environment() -> Environment {
    Environment::Development
}

fn default_api_prefix() -> String {
    "/api".to_string()
}

fn default_customer_jwt_expiry_days() -> i64 {
    3650
}

fn default_admin_jwt_expiry_days() -> i64 {
    7
}

fn default_magic_link_base_url() -> String {
    "http://localhost:4000/api/admin/auth/verify".to_string()
}

fn default_s3_endpoint() -> String {
    "http://localhost:9000".to_string()
}

fn default_s3_region() -> String {
    "us-east-1".to_string()
}

fn default_s3_bucket() -> String {
    "amrytum".to_string()
}

fn default_uploads_dir() -> String {
    "uploads".to_string()
}

/// Just `ENVIRONMENT`, read before logging is set up.
#[derive(Debug, Deserialize)]
struct EnvironmentOnly {
    #[serde(default = "default_environment")]
    environment: Environment,
}

/// Reads `.env` and `ENVIRONMENT` only, so the log format can be chosen before
/// [`AppConfig::from_env`] logs its fallbacks.
pub fn environment_from_env() -> Result<Environment, ConfigError> {
    dotenvy::dotenv().ok();
    Ok(envy::from_env::<EnvironmentOnly>()?.environment)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let raw: RawConfig = envy::from_env()?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let is_dev = raw.environment != Environment::Production;

        let database_url = match non_empty(raw.database_url) {
            Some(url) => url,
            None if is_dev => {
                tracing::warn!(
                    default = DEV_DATABASE_URL,
                    "DATABASE_URL not set, using development default"
                );
                DEV_DATABASE_URL.to_string()
            }
            None => return Err(ConfigError::Missing("DATABASE_URL")),
        };

        let jwt_secret = match non_empty(raw.jwt_secret) {
            Some(secret) => secret,
            None if is_dev => {
                tracing::warn!("JWT_SECRET not set, using a development secret");
                DEV_JWT_SECRET.to_string()
            }
            None => return Err(ConfigError::Missing("JWT_SECRET")),
        };

        let allow_dummy_otp = match raw.allow_dummy_otp.as_deref() {
            Some("true") | Some("1") => true,
            _ => is_dev,
        };

        let razorpay = match (
            non_empty(raw.razorpay_key_id),
            non_empty(raw.razorpay_key_secret),
        ) {
            (Some(key_id), Some(key_secret)) => Some(RazorpayConfig { key_id, key_secret }),
            _ => None,
        };

        let twilio = match (
            non_empty(raw.twilio_account_sid),
            non_empty(raw.twilio_auth_token),
            non_empty(raw.twilio_phone_number),
        ) {
            (Some(account_sid), Some(auth_token), Some(from_number)) => Some(TwilioConfig {
                account_sid,
                auth_token,
                from_number,
            }),
            _ => None,
        };

        let s3 = match (non_empty(raw.s3_access_key), non_empty(raw.s3_secret_key)) {
            (Some(access_key), Some(secret_key)) => Some(S3Config {
                endpoint: raw.s3_endpoint,
                region: raw.s3_region,
                bucket: raw.s3_bucket,
                access_key,
                secret_key,
            }),
            _ => None,
        };

        Ok(Self {
            bind_addr: raw.bind_addr,
            environment: raw.environment,
            api_prefix: raw.api_prefix.trim_end_matches('/').to_string(),
            database_url,
            redis_url: non_empty(raw.redis_url),
            jwt_secret,
            customer_jwt_expiry_days: raw.customer_jwt_expiry_days,
            admin_jwt_expiry_days: raw.admin_jwt_expiry_days,
            magic_link_base_url: raw.magic_link_base_url,
            cors_allowed_origin: non_empty(raw.cors_allowed_origin),
            allow_dummy_otp,
            trust_proxy: raw.trust_proxy,
            razorpay,
            razorpay_webhook_secret: non_empty(raw.razorpay_webhook_secret),
            twilio,
            s3,
            uploads_dir: raw.uploads_dir,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid environment configuration: {0}")]
    Env(#[from] envy::Error),

    #[error("Missing env: {0}. Copy .env.example to .env and set the required variables.")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn raw(vars: &[(&str, &str)]) -> RawConfig {
        envy::from_iter(
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<Vec<_>>(),
        )
        .expect("raw config")
    }

    #[test]
    fn test_development_defaults() {
        let config = AppConfig::from_raw(raw(&[])).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:4000");
        assert_eq!(config.api_prefix, "/api");
        assert_eq!(config.database_url, DEV_DATABASE_URL);
        assert!(config.allow_dummy_otp);
        assert!(config.razorpay.is_none());
        assert!(config.s3.is_none());
        assert_eq!(config.customer_jwt_expiry_days, 3650);
    }

    #[test]
    fn test_production_requires_database_url() {
        let err = AppConfig::from_raw(raw(&[("ENVIRONMENT", "production")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn test_production_disables_dummy_otp_unless_forced() {
        let base = [
            ("ENVIRONMENT", "production"),
            ("DATABASE_URL", "postgres://db/amrytum"),
            ("JWT_SECRET", "s3cret"),
        ];
        let config = AppConfig::from_raw(raw(&base)).unwrap();
        assert!(!config.allow_dummy_otp);

        let mut forced = base.to_vec();
        forced.push(("ALLOW_DUMMY_OTP", "1"));
        let config = AppConfig::from_raw(raw(&forced)).unwrap();
        assert!(config.allow_dummy_otp);
    }

    #[test]
    fn test_razorpay_needs_both_keys() {
        let config = AppConfig::from_raw(raw(&[("RAZORPAY_KEY_ID", "rzp_test")])).unwrap();
        assert!(config.razorpay.is_none());

        let config = AppConfig::from_raw(raw(&[
            ("RAZORPAY_KEY_ID", "rzp_test"),
            ("RAZORPAY_KEY_SECRET", "secret"),
        ]))
        .unwrap();
        assert_eq!(config.razorpay.unwrap().key_id, "rzp_test");
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_development_fallbacks_are_logged() {
        let logs = CapturedLogs::default();
        let sink = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || sink.clone())
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            AppConfig::from_raw(raw(&[])).unwrap();
        });

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("JWT_SECRET not set"));
        assert!(output.contains("DATABASE_URL not set"));
    }

    #[test]
    fn test_environment_read_on_its_own() {
        let only: EnvironmentOnly =
            envy::from_iter(vec![("ENVIRONMENT".to_string(), "production".to_string())]).unwrap();
        assert_eq!(only.environment, Environment::Production);

        let only: EnvironmentOnly = envy::from_iter(Vec::<(String, String)>::new()).unwrap();
        assert_eq!(only.environment, Environment::Development);
    }

    #[test]
    fn test_trust_proxy_off_by_default() {
        assert!(!AppConfig::from_raw(raw(&[])).unwrap().trust_proxy);
        assert!(AppConfig::from_raw(raw(&[("TRUST_PROXY", "true")])).unwrap().trust_proxy);
    }

    #[test]
    fn test_api_prefix_trailing_slash_trimmed() {
        let config = AppConfig::from_raw(raw(&[("API_PREFIX", "/api/")])).unwrap();
        assert_eq!(config.api_prefix, "/api");
    }
}
