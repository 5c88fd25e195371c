//! Provider configuration with validation.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Default time a request waits for its response
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(50);

/// Default number of unconsumed responses kept per connection
pub const DEFAULT_RESPONSE_CACHE_SIZE: usize = 500;

/// Default number of unsolicited messages kept per connection
pub const DEFAULT_UNSOLICITED_BUFFER_SIZE: usize = 500;

/// Main provider configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Endpoint URI, used for logging only
    pub endpoint: String,
    /// Default per-request timeout
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Response cache capacity; oldest entries are evicted beyond this
    pub response_cache_size: usize,
    /// Unsolicited buffer capacity; oldest messages are dropped beyond this
    pub unsolicited_buffer_size: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: "ws://127.0.0.1:8546".to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            response_cache_size: DEFAULT_RESPONSE_CACHE_SIZE,
            unsolicited_buffer_size: DEFAULT_UNSOLICITED_BUFFER_SIZE,
        }
    }
}

impl ProviderConfig {
    /// Config for `endpoint` with every other field at its default
    pub fn for_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// Set the default request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Overlay environment variables on the defaults.
    ///
    /// # Environment Variables
    ///
    /// - `QC_WS_ENDPOINT`: Endpoint URI
    /// - `QC_WS_REQUEST_TIMEOUT_MS`: Request timeout in milliseconds
    /// - `QC_WS_CACHE_SIZE`: Response cache capacity
    /// - `QC_WS_BUFFER_SIZE`: Unsolicited buffer capacity
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            endpoint: env::var("QC_WS_ENDPOINT").unwrap_or(defaults.endpoint),

            request_timeout: env::var("QC_WS_REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.request_timeout),

            response_cache_size: env::var("QC_WS_CACHE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.response_cache_size),

            unsolicited_buffer_size: env::var("QC_WS_BUFFER_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.unsolicited_buffer_size),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid("endpoint cannot be empty".into()));
        }

        if self.response_cache_size == 0 {
            return Err(ConfigError::InvalidLimit(
                "response_cache_size cannot be 0".into(),
            ));
        }

        if self.unsolicited_buffer_size == 0 {
            return Err(ConfigError::InvalidLimit(
                "unsolicited_buffer_size cannot be 0".into(),
            ));
        }

        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Invalid size or count limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Humantime serde module for Duration serialization
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_nanos() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub(super) fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        // "ms" must be checked before "s" and "m"
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.trim()
                .parse::<u64>()
                .ok()
                .and_then(|m| m.checked_mul(60))
                .map(Duration::from_secs)
                .ok_or("invalid minutes")
        } else {
            // Try parsing as plain seconds
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid duration format")
        }
    }
}
