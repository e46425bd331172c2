//! Service configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

/// Minimum accepted signing-secret length (256 bits of hex/ascii).
const MIN_SECRET_LENGTH: usize = 32;

/// Runtime configuration for the portfolio service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the HTTP server binds to.
    pub bind_addr: String,
    /// SQLite database URL.
    pub database_url: String,
    /// HS256 signing secret for session tokens.
    pub jwt_secret: String,
    /// Session token lifetime in days.
    pub session_ttl_days: i64,
    /// Reset token lifetime in minutes.
    pub reset_token_ttl_minutes: i64,
    /// Quote provider API base URL.
    pub quote_api_base: String,
    /// Timeout applied to every awaited external call (quote provider,
    /// notification dispatch).
    pub upstream_timeout: Duration,
    /// Base URL embedded in password-reset links.
    pub frontend_url: String,
}

impl AppConfig {
    /// Defaults with an explicit signing secret. Used by tests; `from_env`
    /// layers the environment on top of this.
    pub fn with_secret(jwt_secret: impl Into<String>) -> AppConfig {
        AppConfig {
            bind_addr: "127.0.0.1:3000".to_string(),
            database_url: "sqlite://data/cryptofolio.db".to_string(),
            jwt_secret: jwt_secret.into(),
            session_ttl_days: 30,
            reset_token_ttl_minutes: 10,
            quote_api_base: "https://api.coingecko.com/api/v3".to_string(),
            upstream_timeout: Duration::from_secs(10),
            frontend_url: "http://localhost:3000".to_string(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// # Panics
    /// Panics if `JWT_SECRET` is unset or shorter than 32 characters. This is
    /// intentional fail-secure behavior: the service must not come up signing
    /// session tokens with a weak or default secret.
    pub fn from_env() -> AppConfig {
        let jwt_secret = std::env::var("JWT_SECRET").expect(
            "SECURITY ERROR: JWT_SECRET environment variable is not set. \
             Generate a secure secret with: openssl rand -hex 32",
        );
        if jwt_secret.len() < MIN_SECRET_LENGTH {
            panic!(
                "SECURITY ERROR: JWT_SECRET must be at least {} characters long (found {}). \
                 Generate a secure secret with: openssl rand -hex 32",
                MIN_SECRET_LENGTH,
                jwt_secret.len()
            );
        }

        let mut config = AppConfig::with_secret(jwt_secret);

        if let Ok(addr) = std::env::var("BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database_url = url;
        }
        if let Ok(base) = std::env::var("QUOTE_API_BASE") {
            config.quote_api_base = base;
        }
        if let Ok(url) = std::env::var("FRONTEND_URL") {
            config.frontend_url = url;
        }

        config.session_ttl_days = parse_env(
            "SESSION_TTL_DAYS",
            config.session_ttl_days,
            |v: &i64| *v > 0,
        );
        config.reset_token_ttl_minutes = parse_env(
            "RESET_TOKEN_TTL_MINUTES",
            config.reset_token_ttl_minutes,
            |v: &i64| *v > 0,
        );
        let timeout_secs = parse_env(
            "UPSTREAM_TIMEOUT_SECS",
            config.upstream_timeout.as_secs(),
            |v: &u64| *v > 0,
        );
        config.upstream_timeout = Duration::from_secs(timeout_secs);

        config
    }
}

/// Parse an environment variable, falling back to `default` (with a warning)
/// on parse failure or an out-of-range value.
fn parse_env<T>(name: &str, default: T, valid: impl Fn(&T) -> bool) -> T
where
    T: FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(value) if valid(&value) => value,
            Ok(value) => {
                warn!(
                    "Invalid {} value: {} (out of range), using default: {}",
                    name, value, default
                );
                default
            }
            Err(e) => {
                warn!(
                    "Failed to parse {} '{}': {}, using default: {}",
                    name, raw, e, default
                );
                default
            }
        },
        Err(_) => default,
    }
}
