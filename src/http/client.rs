//! HTTP client with retry and throttling
//!
//! Provides the production [`Transport`] that handles:
//! - Automatic retries with configurable backoff
//! - A shared throttle consulted before every attempt
//! - JSON body decoding
//! - Error classification for retry decisions

use super::rate_limit::{
    ConcurrencyLimiter, Layered, RateLimiter, RateLimiterConfig, Throttle, Unthrottled,
};
use super::transport::{ApiRequest, ApiResponse, Transport};
use crate::error::{Error, Result};
use crate::types::BackoffType;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL for relative request paths
    pub base_url: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Maximum number of retries
    pub max_retries: u32,
    /// Initial delay for backoff
    pub initial_backoff: Duration,
    /// Maximum delay for backoff
    pub max_backoff: Duration,
    /// Type of backoff strategy
    pub backoff_type: BackoffType,
    /// Token bucket configuration
    pub rate_limit: Option<RateLimiterConfig>,
    /// Maximum requests in flight
    pub max_in_flight: Option<usize>,
    /// Default headers for all requests
    pub default_headers: BTreeMap<String, String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(300),
            max_retries: 5,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(60),
            backoff_type: BackoffType::Exponential,
            rate_limit: None,
            max_in_flight: None,
            default_headers: BTreeMap::new(),
        }
    }
}

impl HttpClientConfig {
    /// Create a new config builder
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }

    /// Build the throttle described by this config
    pub fn throttle(&self) -> Arc<dyn Throttle> {
        match (&self.rate_limit, self.max_in_flight) {
            (Some(rate), Some(slots)) => Arc::new(Layered::new(
                ConcurrencyLimiter::new(slots),
                RateLimiter::new(rate),
            )),
            (Some(rate), None) => Arc::new(RateLimiter::new(rate)),
            (None, Some(slots)) => Arc::new(ConcurrencyLimiter::new(slots)),
            (None, None) => Arc::new(Unthrottled),
        }
    }
}

/// Builder for HTTP client config
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set max retries
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Set backoff configuration
    pub fn backoff(mut self, backoff_type: BackoffType, initial: Duration, max: Duration) -> Self {
        self.config.backoff_type = backoff_type;
        self.config.initial_backoff = initial;
        self.config.max_backoff = max;
        self
    }

    /// Set rate limiter
    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.config.rate_limit = Some(config);
        self
    }

    /// Disable rate limiting
    pub fn no_rate_limit(mut self) -> Self {
        self.config.rate_limit = None;
        self
    }

    /// Bound the number of requests in flight
    pub fn max_in_flight(mut self, limit: usize) -> Self {
        self.config.max_in_flight = Some(limit);
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Build the config
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// HTTP client with retry and throttling
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    throttle: Arc<dyn Throttle>,
}

impl HttpClient {
    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let throttle = config.throttle();
        Self::with_throttle(config, throttle)
    }

    /// Create a client sharing an externally owned throttle
    pub fn with_throttle(config: HttpClientConfig, throttle: Arc<dyn Throttle>) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            config,
            throttle,
        })
    }

    /// The throttle consulted before each attempt
    pub fn throttle(&self) -> Arc<dyn Throttle> {
        Arc::clone(&self.throttle)
    }

    /// Send one GET and classify the outcome
    async fn attempt(&self, url: &str, request: &ApiRequest) -> Result<ApiResponse> {
        let _permit = self.throttle.acquire().await;

        let mut req = self.client.get(url).timeout(self.config.timeout);
        for (key, value) in self
            .config
            .default_headers
            .iter()
            .chain(request.headers.iter())
        {
            req = req.header(key.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            req = req.query(&request.query);
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout {
                    timeout_ms: self.config.timeout.as_millis() as u64,
                }
            } else {
                Error::Http(e)
            }
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited {
                retry_after_seconds: extract_retry_after(&response),
            });
        }
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::auth(format!("HTTP {}: {body}", status.as_u16())));
        }
        if status.is_client_error() || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::http_status(status.as_u16(), body));
        }

        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout {
                    timeout_ms: self.config.timeout.as_millis() as u64,
                }
            } else {
                Error::Http(e)
            }
        })?;
        let body: Value = serde_json::from_str(&text)
            .map_err(|e| Error::parse(format!("response from {url} is not JSON: {e}")))?;

        Ok(ApiResponse::new(status.as_u16(), body))
    }

    /// Build full URL from path
    fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }

        match &self.config.base_url {
            Some(base) => {
                let base = base.trim_end_matches('/');
                let path = path.trim_start_matches('/');
                format!("{base}/{path}")
            }
            None => path.to_string(),
        }
    }

    /// Calculate backoff delay for a given attempt
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let delay = match self.config.backoff_type {
            BackoffType::Constant => self.config.initial_backoff,
            BackoffType::Linear => self.config.initial_backoff * (attempt + 1),
            BackoffType::Exponential => {
                let factor = 2u32.saturating_pow(attempt);
                self.config.initial_backoff.saturating_mul(factor)
            }
        };

        std::cmp::min(delay, self.config.max_backoff)
    }

    /// Delay before retrying after `error`
    fn retry_delay(&self, error: &Error, attempt: u32) -> Duration {
        match error {
            Error::RateLimited {
                retry_after_seconds,
            } => std::cmp::min(
                Duration::from_secs(*retry_after_seconds),
                self.config.max_backoff,
            ),
            _ => self.calculate_backoff(attempt),
        }
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn get(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let url = self.build_url(&request.url);
        let max_retries = self.config.max_retries;
        let mut attempt = 0;

        loop {
            match self.attempt(&url, request).await {
                Ok(response) => {
                    debug!(url = %url, status = response.status, attempt, "Request succeeded");
                    return Ok(response);
                }
                Err(e) if e.is_retryable() && attempt < max_retries => {
                    let delay = self.retry_delay(&e, attempt);
                    warn!(
                        url = %url,
                        attempt = attempt + 1,
                        max_attempts = max_retries + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient request failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Extract retry-after header value
fn extract_retry_after(response: &Response) -> u64 {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok())
        .unwrap_or(60)
}
