//! Request throttling
//!
//! Every request attempt first acquires a [`Permit`] from a [`Throttle`]. The
//! same throttle instance is shared by all streams of a run, so it enforces a
//! single API budget.
//!
//! - [`RateLimiter`]: governor token bucket (requests per second)
//! - [`ConcurrencyLimiter`]: semaphore bounding requests in flight
//! - [`Unthrottled`]: no limit

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Configuration for rate limiting
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum number of requests per second
    pub requests_per_second: u32,
    /// Burst size (max tokens in bucket)
    pub burst_size: u32,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 10,
            burst_size: 10,
        }
    }
}

impl RateLimiterConfig {
    /// Create a new rate limiter config
    pub fn new(requests_per_second: u32, burst_size: u32) -> Self {
        Self {
            requests_per_second,
            burst_size,
        }
    }
}

/// Held for the duration of one request attempt
#[derive(Debug, Default)]
pub struct Permit(Option<OwnedSemaphorePermit>);

impl Permit {
    /// A permit that holds nothing
    pub fn free() -> Self {
        Self(None)
    }

    /// Whether this permit occupies a concurrency slot
    pub fn holds_slot(&self) -> bool {
        self.0.is_some()
    }
}

/// Shared request budget consulted before every request attempt
#[async_trait]
pub trait Throttle: Send + Sync {
    /// Wait until a request may be issued
    async fn acquire(&self) -> Permit;
}

// ============================================================================
// Token bucket
// ============================================================================

/// Token bucket rate limiter
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<Governor<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given config
    pub fn new(config: &RateLimiterConfig) -> Self {
        let quota = Quota::per_second(
            NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN),
        )
        .allow_burst(NonZeroU32::new(config.burst_size).unwrap_or(NonZeroU32::MIN));

        Self {
            limiter: Arc::new(Governor::direct(quota)),
        }
    }

    /// Wait until a request can be made
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }
}

#[async_trait]
impl Throttle for RateLimiter {
    async fn acquire(&self) -> Permit {
        self.wait().await;
        Permit::free()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").finish()
    }
}

// ============================================================================
// Concurrency limit
// ============================================================================

/// Bounds the number of requests in flight
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
}

impl ConcurrencyLimiter {
    /// Allow at most `max_in_flight` concurrent requests
    pub fn new(max_in_flight: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_in_flight.max(1))),
        }
    }

    /// Slots currently free
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

#[async_trait]
impl Throttle for ConcurrencyLimiter {
    async fn acquire(&self) -> Permit {
        // The semaphore is never closed, so acquisition only fails on close.
        match Arc::clone(&self.semaphore).acquire_owned().await {
            Ok(permit) => Permit(Some(permit)),
            Err(_) => Permit::free(),
        }
    }
}

// ============================================================================
// Combinators
// ============================================================================

/// No throttling at all
#[derive(Debug, Clone, Copy, Default)]
pub struct Unthrottled;

#[async_trait]
impl Throttle for Unthrottled {
    async fn acquire(&self) -> Permit {
        Permit::free()
    }
}

/// Applies a concurrency slot first, then a rate token
pub struct Layered {
    slots: ConcurrencyLimiter,
    rate: RateLimiter,
}

impl Layered {
    /// Combine a concurrency bound with a rate limit
    pub fn new(slots: ConcurrencyLimiter, rate: RateLimiter) -> Self {
        Self { slots, rate }
    }
}

#[async_trait]
impl Throttle for Layered {
    async fn acquire(&self) -> Permit {
        let permit = self.slots.acquire().await;
        self.rate.wait().await;
        permit
    }
}
