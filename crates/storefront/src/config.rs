//! Storefront client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `TRUMALL_API_BASE_URL` - Base URL of the Trumall REST API (e.g. `https://api.trumall.co.ke/api`)
//! - `TRUMALL_API_TOKEN` - Bearer token for the signed-in buyer
//!
//! ## Optional
//! - `TRUMALL_HTTP_TIMEOUT_SECS` - Per-request timeout (default: 15)
//! - `TRUMALL_POLL_INTERVAL_SECS` - Payment status poll interval (default: 3)
//! - `TRUMALL_POLL_MAX_ATTEMPTS` - Payment status poll ceiling (default: 20)
//! - `TRUMALL_CURRENCY` - Display currency (default: KES)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use trumall_core::CurrencyCode;
use url::Url;

use crate::payment::PollPolicy;

/// Tokens issued at sign-in are JWTs; anything this short is a typo or a
/// leftover from a sample `.env`.
const MIN_TOKEN_LEN: usize = 20;

const PLACEHOLDER_TOKENS: &[&str] = &["changeme", "your-token", "placeholder", "xxx"];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Invalid API token in {0}: {1}")]
    InvalidToken(String, String),
}

/// Storefront client configuration.
#[derive(Clone)]
pub struct StorefrontConfig {
    /// Base URL of the REST API, without a trailing slash
    pub api_base_url: Url,
    /// Bearer token sent with every request
    pub api_token: SecretString,
    /// Per-request HTTP timeout
    pub http_timeout: Duration,
    /// Payment confirmation polling policy
    pub poll: PollPolicy,
    /// Currency used when formatting amounts
    pub currency: CurrencyCode,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. "production", "staging")
    pub sentry_environment: Option<String>,
}

impl std::fmt::Debug for StorefrontConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontConfig")
            .field("api_base_url", &self.api_base_url.as_str())
            .field("api_token", &"[REDACTED]")
            .field("http_timeout", &self.http_timeout)
            .field("poll", &self.poll)
            .field("currency", &self.currency)
            .field("sentry_dsn", &self.sentry_dsn)
            .field("sentry_environment", &self.sentry_environment)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid, or
    /// if the API token is obviously not a real one.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base_url = parse_base_url(&get_required_env("TRUMALL_API_BASE_URL")?)?;
        let api_token = get_token("TRUMALL_API_TOKEN")?;
        let http_timeout =
            Duration::from_secs(get_parsed_or_default("TRUMALL_HTTP_TIMEOUT_SECS", 15)?);

        let poll_interval = get_parsed_or_default("TRUMALL_POLL_INTERVAL_SECS", 3)?;
        if poll_interval == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "TRUMALL_POLL_INTERVAL_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        let max_attempts = get_parsed_or_default("TRUMALL_POLL_MAX_ATTEMPTS", 20)?;
        let poll = PollPolicy::new(Duration::from_secs(poll_interval), max_attempts);

        let currency = get_env_or_default("TRUMALL_CURRENCY", "KES")
            .parse::<CurrencyCode>()
            .map_err(|e| ConfigError::InvalidEnvVar("TRUMALL_CURRENCY".to_string(), e))?;

        Ok(Self {
            api_base_url,
            api_token,
            http_timeout,
            poll,
            currency,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Build a configuration in code (tests, embedding).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the base URL does not parse.
    pub fn new(api_base_url: &str, api_token: impl Into<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            api_base_url: parse_base_url(api_base_url)?,
            api_token: SecretString::from(api_token.into()),
            http_timeout: Duration::from_secs(15),
            poll: PollPolicy::default(),
            currency: CurrencyCode::default(),
            sentry_dsn: None,
            sentry_environment: None,
        })
    }

    /// Replace the polling policy.
    #[must_use]
    pub const fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Absolute URL for an API path such as `/cart/add`.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse and validate the API base URL.
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidEnvVar("TRUMALL_API_BASE_URL".to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            "TRUMALL_API_BASE_URL".to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a numeric environment variable with a default value.
fn get_parsed_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

/// Reject tokens that cannot be a bearer token from sign-in.
fn validate_token(token: &str, var_name: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| -> Result<(), ConfigError> {
        Err(ConfigError::InvalidToken(
            var_name.to_string(),
            reason.to_string(),
        ))
    };

    if token.chars().any(char::is_whitespace) {
        return invalid("contains whitespace");
    }
    if token.len() < MIN_TOKEN_LEN {
        return invalid("too short to be a sign-in token");
    }
    let lower = token.to_lowercase();
    if PLACEHOLDER_TOKENS.iter().any(|p| lower.contains(p)) {
        return invalid("looks like a placeholder");
    }
    Ok(())
}

fn get_token(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    // Some shells export the whole header value
    let value = value.trim().trim_start_matches("Bearer ").to_string();
    validate_token(&value, key)?;
    Ok(SecretString::from(value))
}

/// Expose the bearer header value for the configured token.
pub(crate) fn bearer_value(config: &StorefrontConfig) -> String {
    format!("Bearer {}", config.api_token.expose_secret())
}
