//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `HEARTHWOOD_API_BASE_URL` - Base URL of the backend REST API
//!   (e.g., `https://shop.example.com/api`)
//!
//! ## Optional
//! - `HEARTHWOOD_STORAGE_PATH` - Local storage file (default: `.hearthwood/storage.json`)
//! - `HEARTHWOOD_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `HEARTHWOOD_PRODUCT_CACHE_TTL_SECS` - Product detail cache TTL (default: 300)
//! - `HEARTHWOOD_REVALIDATE_AT_CHECKOUT` - Re-check price/stock before submitting (default: false)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_STORAGE_PATH: &str = ".hearthwood/storage.json";
const DEFAULT_REQUEST_TIMEOUT_SECS: &str = "30";
const DEFAULT_PRODUCT_CACHE_TTL_SECS: &str = "300";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Backend REST API base URL, always ending in `/`
    pub api_base_url: Url,
    /// File backing the persistent key-value store
    pub storage_path: PathBuf,
    /// Timeout applied to every backend request
    pub request_timeout: Duration,
    /// How long product details stay cached
    pub product_cache_ttl: Duration,
    /// Re-check price and stock against the catalog before submitting an order
    pub revalidate_at_checkout: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let api_base_url = parse_base_url(&vars.required("HEARTHWOOD_API_BASE_URL")?)
            .map_err(|e| ConfigError::InvalidEnvVar("HEARTHWOOD_API_BASE_URL".to_string(), e))?;
        let storage_path = PathBuf::from(vars.or_default("HEARTHWOOD_STORAGE_PATH", DEFAULT_STORAGE_PATH));
        let request_timeout = Duration::from_secs(vars.positive_secs(
            "HEARTHWOOD_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?);
        let product_cache_ttl = Duration::from_secs(vars.positive_secs(
            "HEARTHWOOD_PRODUCT_CACHE_TTL_SECS",
            DEFAULT_PRODUCT_CACHE_TTL_SECS,
        )?);
        let revalidate_at_checkout = vars.flag("HEARTHWOOD_REVALIDATE_AT_CHECKOUT")?;

        Ok(Self {
            api_base_url,
            storage_path,
            request_timeout,
            product_cache_ttl,
            revalidate_at_checkout,
            sentry_dsn: vars.optional("SENTRY_DSN"),
            sentry_environment: vars.optional("SENTRY_ENVIRONMENT"),
        })
    }

    /// Configuration for `api_base_url` with defaults for everything else.
    #[must_use]
    pub fn for_base_url(api_base_url: Url) -> Self {
        Self {
            api_base_url: with_trailing_slash(api_base_url),
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            request_timeout: Duration::from_secs(30),
            product_cache_ttl: Duration::from_secs(300),
            revalidate_at_checkout: false,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Get an optional variable, treating empty values as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn positive_secs(&self, key: &str, default: &str) -> Result<u64, ConfigError> {
        let raw = self.or_default(key, default);
        match raw.trim().parse::<u64>() {
            Ok(0) => Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                "must be greater than zero".to_string(),
            )),
            Ok(secs) => Ok(secs),
            Err(e) => Err(ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        }
    }

    fn flag(&self, key: &str) -> Result<bool, ConfigError> {
        match self.optional(key).as_deref().map(str::trim) {
            None => Ok(false),
            Some(v) if v.eq_ignore_ascii_case("true") || v == "1" => Ok(true),
            Some(v) if v.eq_ignore_ascii_case("false") || v == "0" => Ok(false),
            Some(v) => Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                format!("expected true/false, got '{v}'"),
            )),
        }
    }
}

/// Parse the API base URL. Only http(s) is accepted.
fn parse_base_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw.trim()).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    Ok(with_trailing_slash(url))
}

/// `Url::join` treats the last path segment as a file unless the path ends in
/// a slash, so `/api` + `products` would become `/products`.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
