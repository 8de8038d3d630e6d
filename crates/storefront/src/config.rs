//! Storefront client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `BOOKSTORE_API_BASE_URL` - Backend origin (default: `http://localhost:5000`)
//! - `BOOKSTORE_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `BOOKSTORE_CACHE_IDLE_SECS` - Evict cached queries unused for this long (default: 60)
//! - `BOOKSTORE_CACHE_MAX_CAPACITY` - Maximum cached queries per API (default: 1000)
//! - `BOOKSTORE_INCLUDE_COOKIES` - Keep a cookie store across requests (default: true)
//! - `BOOKSTORE_TOKEN` - Bearer token to seed the credential store with
//! - `BOOKSTORE_CREDENTIALS_FILE` - Path of a JSON file used as the credential store

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_BASE_URL: &str = "http://localhost:5000";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CACHE_IDLE_SECS: u64 = 60;
const DEFAULT_CACHE_MAX_CAPACITY: u64 = 1000;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Backend origin; resource paths are appended as `/api/v1/<resource>`
    pub base_url: Url,
    /// Timeout applied to every request
    pub request_timeout: Duration,
    /// Query cache settings
    pub cache: CacheConfig,
    /// Send and store cookies (the browser's `credentials: include`)
    pub include_cookies: bool,
    /// Initial bearer token
    pub token: Option<SecretString>,
    /// File-backed credential store location
    pub credentials_file: Option<PathBuf>,
}

/// Query cache settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Entries not read for this long are evicted
    pub idle_timeout: Duration,
    /// Maximum number of cached queries
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(DEFAULT_CACHE_IDLE_SECS),
            max_capacity: DEFAULT_CACHE_MAX_CAPACITY,
        }
    }
}

impl StoreConfig {
    /// Configuration with defaults pointing at `base_url`.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            cache: CacheConfig::default(),
            include_cookies: true,
            token: None,
            credentials_file: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_base = lookup("BOOKSTORE_API_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = parse_base_url(&raw_base)
            .map_err(|e| ConfigError::InvalidEnvVar("BOOKSTORE_API_BASE_URL".to_string(), e))?;

        let request_timeout = Duration::from_secs(parse_or_default(
            &lookup,
            "BOOKSTORE_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?);
        let cache = CacheConfig {
            idle_timeout: Duration::from_secs(parse_or_default(
                &lookup,
                "BOOKSTORE_CACHE_IDLE_SECS",
                DEFAULT_CACHE_IDLE_SECS,
            )?),
            max_capacity: parse_or_default(
                &lookup,
                "BOOKSTORE_CACHE_MAX_CAPACITY",
                DEFAULT_CACHE_MAX_CAPACITY,
            )?,
        };
        let include_cookies = parse_or_default(&lookup, "BOOKSTORE_INCLUDE_COOKIES", true)?;

        let token = lookup("BOOKSTORE_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .map(SecretString::from);
        let credentials_file = lookup("BOOKSTORE_CREDENTIALS_FILE")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            base_url,
            request_timeout,
            cache,
            include_cookies,
            token,
            credentials_file,
        })
    }

    /// Root URL for a resource, e.g. `http://host/api/v1/books`.
    #[must_use]
    pub fn resource_url(&self, resource: &str) -> String {
        format!(
            "{}/api/v1/{}",
            self.base_url.as_str().trim_end_matches('/'),
            resource.trim_matches('/')
        )
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse and sanity-check the backend origin.
fn parse_base_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw.trim()).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err("must be an absolute http(s) URL".to_string());
    }
    Ok(url)
}

/// Parse an optional variable, falling back to `default` when unset.
fn parse_or_default<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key).map_or(Ok(default), |value| {
        value
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}
