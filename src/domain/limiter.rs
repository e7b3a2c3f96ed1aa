//! Limiter and store abstractions.
//!
//! The gate depends on [`Limiter`], never on a concrete store client, and the
//! sliding window algorithm depends on [`WindowStore`], never on Redis
//! directly. Both seams are where tests substitute their own behaviour.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::window::{GrantResult, WindowConfig};
use crate::shared::error::LimiterError;

/// Decides whether one more request fits in a bucket.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Limiter: Send + Sync {
    /// Record a request against `key` and report whether it is within `window`.
    ///
    /// A single attempt: no retries are made on failure.
    async fn grant(&self, key: &str, window: WindowConfig) -> Result<GrantResult, LimiterError>;
}

/// One atomic bucket update: record `entry`, drop entries scored below
/// `prune_before`, refresh the bucket TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowUpdate {
    /// Timestamp in nanoseconds; used as both score and member.
    pub entry: i64,
    /// Exclusive upper bound of the pruned score range `[0, prune_before)`.
    pub prune_before: i64,
    /// Expiry applied to the whole bucket.
    pub ttl: Duration,
}

/// Ordered per-key timestamp sets with atomic multi-step updates.
#[async_trait]
pub trait WindowStore: Send + Sync {
    /// Apply `update` to `key` atomically and return every member left in the
    /// bucket afterwards, the new entry included.
    async fn record(&self, key: &str, update: WindowUpdate) -> Result<Vec<String>, LimiterError>;

    /// Round-trip check used by readiness probes.
    async fn ping(&self) -> Result<(), LimiterError>;
}
