//! Window configuration and grant decisions.

use std::time::Duration;

use serde::Serialize;

use crate::shared::error::ConfigurationError;

/// Requests allowed per window when nothing else is configured.
pub const DEFAULT_CAPACITY: u32 = 20;

/// Window length when nothing else is configured.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// A validated sliding window: at most `capacity` requests per `duration`.
///
/// Only constructible through [`WindowConfig::new`], so a value of this type
/// always satisfies `capacity > 0` and `1s <= duration <= 1h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowConfig {
    capacity: u32,
    duration: Duration,
}

impl WindowConfig {
    pub const MIN_DURATION: Duration = Duration::from_secs(1);
    pub const MAX_DURATION: Duration = Duration::from_secs(3600);

    /// Validate and build a window.
    ///
    /// `(10, Duration::from_secs(1))` is 10 requests per second.
    pub fn new(capacity: u32, duration: Duration) -> Result<Self, ConfigurationError> {
        if capacity == 0 {
            return Err(ConfigurationError::ZeroCapacity);
        }
        if duration < Self::MIN_DURATION || duration > Self::MAX_DURATION {
            return Err(ConfigurationError::InvalidWindow(duration));
        }
        Ok(Self { capacity, duration })
    }

    /// Shorthand for a window expressed in whole seconds.
    pub fn per_seconds(capacity: u32, seconds: u64) -> Result<Self, ConfigurationError> {
        Self::new(capacity, Duration::from_secs(seconds))
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Window length in whole seconds, as reported in `X-Rate-Limit-Reset`.
    pub fn duration_secs(&self) -> u64 {
        self.duration.as_secs()
    }

    /// Window length in nanoseconds, the unit bucket entries are scored in.
    pub fn duration_nanos(&self) -> i64 {
        i64::try_from(self.duration.as_nanos()).unwrap_or(i64::MAX)
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            duration: DEFAULT_WINDOW,
        }
    }
}

/// Outcome of one `grant` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GrantResult {
    pub granted: bool,
    /// Capacity minus entries in the window. Negative once the bucket overflows.
    pub remaining: i64,
}

impl GrantResult {
    /// Decide from the number of entries left in the bucket after recording
    /// the current request.
    ///
    /// The current request's own entry is part of `count`, so reaching exactly
    /// `capacity` entries still grants (remaining == 0).
    pub fn from_count(capacity: u32, count: usize) -> Self {
        let count = i64::try_from(count).unwrap_or(i64::MAX);
        let remaining = i64::from(capacity) - count;
        Self {
            granted: remaining >= 0,
            remaining,
        }
    }

    /// Remaining quota as exposed to clients.
    pub fn remaining_for_header(&self) -> u64 {
        u64::try_from(self.remaining).unwrap_or(0)
    }
}
