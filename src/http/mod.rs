//! HTTP transport module
//!
//! Provides the transport collaborator the stream executors fetch through.
//!
//! # Features
//!
//! - **Transport trait**: `get(request) -> (status, json body)`
//! - **Automatic Retries**: transient failures retried with backoff
//! - **Throttling**: a shared token bucket and/or concurrency bound
//! - **Response Cache**: optional decorator keyed by request signature, persisted
//!   to a cache file across runs

mod cache;
mod client;
mod rate_limit;
mod transport;

pub use cache::{CacheStats, CachedTransport};
pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder};
pub use rate_limit::{
    ConcurrencyLimiter, Layered, Permit, RateLimiter, RateLimiterConfig, Throttle, Unthrottled,
};
pub use transport::{ApiRequest, ApiResponse, Transport};

#[cfg(test)]
mod tests;
