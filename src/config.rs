//! Tap configuration
//!
//! The configuration is a JSON object supplied by the caller (file or inline).
//! Defaults mirror what the Jotform API expects; only `api_key` is required.

use crate::error::{Error, Result};
use crate::http::{HttpClientConfig, RateLimiterConfig};
use crate::state::parse_timestamp;
use crate::types::OptionStringExt;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default API root
pub const DEFAULT_API_URL: &str = "https://api.jotform.com";

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "APIKEY";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete tap configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TapConfig {
    /// Authentication key
    #[serde(default)]
    pub api_key: String,

    /// API base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// User-Agent header; an empty string disables the header
    #[serde(default = "default_user_agent")]
    pub user_agent: Option<String>,

    /// Lower bound for incremental streams without a stored bookmark
    ///
    /// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` or a bare `YYYY-MM-DD`.
    #[serde(default, deserialize_with = "deserialize_start_date")]
    pub start_date: Option<DateTime<Utc>>,

    /// Response cache settings
    #[serde(default)]
    pub requests_cache: Option<RequestsCacheConfig>,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Retries for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Shared request budget across all streams (token bucket)
    #[serde(default)]
    pub requests_per_second: Option<u32>,

    /// Maximum requests in flight across all streams
    #[serde(default)]
    pub max_concurrent_requests: Option<usize>,

    /// Root streams run at the same time
    #[serde(default = "default_parallelism")]
    pub max_parallel_streams: usize,

    /// Child invocations in flight per parent stream
    #[serde(default = "default_parallelism")]
    pub child_concurrency: usize,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_user_agent() -> Option<String> {
    Some(format!("{}/{}", crate::NAME, crate::VERSION))
}

fn default_request_timeout() -> u64 {
    300
}

fn default_max_retries() -> u32 {
    5
}

fn default_parallelism() -> usize {
    1
}

fn deserialize_start_date<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(value) => parse_timestamp(&value).map(Some).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid start_date {value}"))
        }),
    }
}

impl Default for TapConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_url: default_api_url(),
            user_agent: default_user_agent(),
            start_date: None,
            requests_cache: None,
            request_timeout_secs: default_request_timeout(),
            max_retries: default_max_retries(),
            requests_per_second: None,
            max_concurrent_requests: None,
            max_parallel_streams: default_parallelism(),
            child_concurrency: default_parallelism(),
        }
    }
}

// ============================================================================
// Cache Config
// ============================================================================

/// Response cache configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestsCacheConfig {
    /// Whether responses are cached
    #[serde(default)]
    pub enabled: bool,

    /// Cache tuning
    #[serde(default)]
    pub config: CacheSettings,
}

/// Cache tuning knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Entry lifetime in seconds; entries never expire when unset
    #[serde(default)]
    pub expire_after: Option<u64>,

    /// Cache file name without extension, relative to the working directory
    #[serde(default = "default_cache_name")]
    pub cache_name: String,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            expire_after: None,
            cache_name: default_cache_name(),
        }
    }
}

fn default_cache_name() -> String {
    "http_cache".to_string()
}

impl TapConfig {
    /// Parse a config from a JSON string and validate it
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::config(format!("Invalid config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file and validate it
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_json(&content)
    }

    /// Check required fields and value ranges
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(Error::missing_field("api_key"));
        }

        let url = url::Url::parse(&self.api_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::invalid_value(
                "api_url",
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(Error::invalid_value(
                "request_timeout_secs",
                "must be greater than zero",
            ));
        }
        if self.requests_per_second == Some(0) {
            return Err(Error::invalid_value(
                "requests_per_second",
                "must be greater than zero",
            ));
        }
        if self.max_concurrent_requests == Some(0) {
            return Err(Error::invalid_value(
                "max_concurrent_requests",
                "must be greater than zero",
            ));
        }
        if self.max_parallel_streams == 0 {
            return Err(Error::invalid_value(
                "max_parallel_streams",
                "must be greater than zero",
            ));
        }
        if self.child_concurrency == 0 {
            return Err(Error::invalid_value(
                "child_concurrency",
                "must be greater than zero",
            ));
        }

        Ok(())
    }

    /// Headers sent with every API request
    pub fn request_headers(&self) -> BTreeMap<String, String> {
        let mut headers = BTreeMap::new();
        headers.insert(API_KEY_HEADER.to_string(), self.api_key.clone());
        if let Some(agent) = self.user_agent.clone().none_if_empty() {
            headers.insert("User-Agent".to_string(), agent);
        }
        headers
    }

    /// Cache lifetime when caching is enabled
    ///
    /// `None` means caching is off; `Some(None)` means entries never expire.
    pub fn cache_expiry(&self) -> Option<Option<Duration>> {
        self.requests_cache
            .as_ref()
            .filter(|cache| cache.enabled)
            .map(|cache| cache.config.expire_after.map(Duration::from_secs))
    }

    /// File the response cache is kept in when caching is enabled
    pub fn cache_file(&self) -> Option<PathBuf> {
        self.requests_cache
            .as_ref()
            .filter(|cache| cache.enabled)
            .map(|cache| PathBuf::from(format!("{}.json", cache.config.cache_name)))
    }

    /// Build the HTTP client configuration
    pub fn http_client_config(&self) -> HttpClientConfig {
        let mut builder = HttpClientConfig::builder()
            .base_url(&self.api_url)
            .timeout(Duration::from_secs(self.request_timeout_secs))
            .max_retries(self.max_retries);

        builder = match self.requests_per_second {
            Some(rps) => builder.rate_limit(RateLimiterConfig::new(rps, rps)),
            None => builder.no_rate_limit(),
        };

        if let Some(limit) = self.max_concurrent_requests {
            builder = builder.max_in_flight(limit);
        }

        builder.build()
    }
}
