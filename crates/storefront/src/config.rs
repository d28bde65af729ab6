//! Storefront client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `SHOP_API_BASE_URL` - Backend REST API base URL (default: `http://localhost:5000/api`)
//! - `SHOP_API_TOKEN` - Bearer token sent with every API request
//! - `SHOP_API_TIMEOUT_SECS` - Request timeout in seconds (default: 30)
//! - `SHOP_DATA_DIR` - Directory for the persisted cart and session (default: `.shop-smart`)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";
const DEFAULT_TIMEOUT_SECS: &str = "30";
const DEFAULT_DATA_DIR: &str = ".shop-smart";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
///
/// Implements `Debug` manually to redact the API token.
#[derive(Clone)]
pub struct StorefrontConfig {
    /// Backend REST API base URL
    pub api_base_url: Url,
    /// Optional bearer token for the backend
    pub api_token: Option<SecretString>,
    /// Per-request timeout for backend calls
    pub request_timeout: Duration,
    /// Directory holding the durable cart and session entries
    pub data_dir: PathBuf,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl std::fmt::Debug for StorefrontConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontConfig")
            .field("api_base_url", &self.api_base_url.as_str())
            .field(
                "api_token",
                &self.api_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("request_timeout", &self.request_timeout)
            .field("data_dir", &self.data_dir)
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
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let get_opt = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_base_url = parse_base_url(&get_or("SHOP_API_BASE_URL", DEFAULT_API_BASE_URL))?;

        let timeout_secs = get_or("SHOP_API_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)
            .trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar("SHOP_API_TIMEOUT_SECS".to_string(), e.to_string()))?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "SHOP_API_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            api_base_url,
            api_token: get_opt("SHOP_API_TOKEN").map(SecretString::from),
            request_timeout: Duration::from_secs(timeout_secs),
            data_dir: PathBuf::from(get_or("SHOP_DATA_DIR", DEFAULT_DATA_DIR)),
            sentry_dsn: get_opt("SENTRY_DSN"),
            sentry_environment: get_opt("SENTRY_ENVIRONMENT"),
        })
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self::from_lookup(|_| None).unwrap_or_else(|e| panic!("default config invalid: {e}"))
    }
}

/// Parse and check the API base URL.
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |msg: String| ConfigError::InvalidEnvVar("SHOP_API_BASE_URL".to_string(), msg);

    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(invalid("URL must have a host".to_string()));
    }
    Ok(url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = StorefrontConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.api_base_url.as_str(), "http://localhost:5000/api");
        assert!(config.api_token.is_none());
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.data_dir, PathBuf::from(".shop-smart"));
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = StorefrontConfig::from_lookup(lookup(&[
            ("SHOP_API_BASE_URL", "https://api.shop.example.com/v1"),
            ("SHOP_API_TOKEN", "tok_9f8e7d6c"),
            ("SHOP_API_TIMEOUT_SECS", "5"),
            ("SHOP_DATA_DIR", "/tmp/shop"),
            ("SENTRY_DSN", ""),
        ]))
        .unwrap();

        assert_eq!(config.api_base_url.host_str(), Some("api.shop.example.com"));
        assert_eq!(config.api_token.unwrap().expose_secret(), "tok_9f8e7d6c");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/shop"));
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_invalid_base_url() {
        for raw in ["not a url", "ftp://files.example.com", "file:///tmp/api"] {
            let result = StorefrontConfig::from_lookup(lookup(&[("SHOP_API_BASE_URL", raw)]));
            assert!(
                matches!(result, Err(ConfigError::InvalidEnvVar(ref key, _)) if key == "SHOP_API_BASE_URL"),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn test_invalid_timeout() {
        assert!(StorefrontConfig::from_lookup(lookup(&[("SHOP_API_TIMEOUT_SECS", "soon")])).is_err());
        assert!(StorefrontConfig::from_lookup(lookup(&[("SHOP_API_TIMEOUT_SECS", "0")])).is_err());
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = StorefrontConfig::from_lookup(lookup(&[(
            "SHOP_API_TOKEN",
            "super_secret_api_token",
        )]))
        .unwrap();

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_api_token"));
        assert!(debug_output.contains("localhost:5000"));
    }
}
