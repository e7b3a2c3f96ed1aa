//! Sliding Window Limiter
//!
//! Counts requests in the trailing window for a bucket and decides whether
//! the current one fits.
//!
//! # Algorithm
//!
//! Each bucket is a sorted set of nanosecond timestamps (score == member).
//! On every request, in a single store transaction:
//! 1. Add the current timestamp
//! 2. Remove entries scored in `[0, now - window)`
//! 3. Refresh the bucket TTL
//! 4. Read back every remaining member
//!
//! `remaining = capacity - members`. The current request is already part of
//! the count, so a bucket at exactly `capacity` still grants.
//!
//! The store transaction is the only serialization point: concurrent requests
//! on one key may overshoot by the number of transactions truly in flight.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::domain::clock::{Clock, SystemClock};
use crate::domain::limiter::{Limiter, WindowStore, WindowUpdate};
use crate::domain::window::{GrantResult, WindowConfig};
use crate::infrastructure::metrics;
use crate::shared::error::LimiterError;

/// How long an idle bucket survives in the store.
pub const DEFAULT_KEY_EXPIRATION: Duration = Duration::from_secs(86_400);

/// Redis-style distributed rate limiter using a sliding window.
#[derive(Clone)]
pub struct SlidingWindowLimiter {
    store: Arc<dyn WindowStore>,
    clock: Arc<dyn Clock>,
    key_expiration: Duration,
    timeout: Option<Duration>,
}

impl SlidingWindowLimiter {
    /// Create a limiter on the system clock with the default key expiration.
    pub fn new(store: Arc<dyn WindowStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            key_expiration: DEFAULT_KEY_EXPIRATION,
            timeout: None,
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// TTL applied to a bucket on every access. Must outlive any window in use.
    pub fn with_key_expiration(mut self, key_expiration: Duration) -> Self {
        self.key_expiration = key_expiration;
        self
    }

    /// Bound each store round-trip; a slower store yields `LimiterError::Timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    async fn record(&self, key: &str, update: WindowUpdate) -> Result<Vec<String>, LimiterError> {
        let call = self.store.record(key, update);
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| LimiterError::Timeout(limit))?,
            None => call.await,
        }
    }
}

#[async_trait]
impl Limiter for SlidingWindowLimiter {
    async fn grant(&self, key: &str, window: WindowConfig) -> Result<GrantResult, LimiterError> {
        let now = self.clock.now_nanos();
        let update = WindowUpdate {
            entry: now,
            prune_before: now.saturating_sub(window.duration_nanos()),
            ttl: self.key_expiration,
        };

        let started = Instant::now();
        let result = self.record(key, update).await;
        metrics::record_store_call(result.is_ok(), started.elapsed().as_secs_f64());

        let members = result?;
        Ok(GrantResult::from_count(window.capacity(), members.len()))
    }
}
