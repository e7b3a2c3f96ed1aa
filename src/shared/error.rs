//! Application Error Types
//!
//! Startup, limiter and HTTP error types.

use std::time::Duration;

use serde::Serialize;

/// Errors raised while assembling the rate limiter at startup.
///
/// These are fatal: nothing in the request path ever produces one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("rate limit gate requires a key function")]
    MissingKeyFn,

    #[error("invalid rate; capacity must be greater than zero")]
    ZeroCapacity,

    #[error("invalid rate; window needs to be between 1 and 3600 seconds, got {0:?}")]
    InvalidWindow(Duration),
}

/// Errors returned by a single `grant` call.
///
/// The gate absorbs every variant according to its fail-open/fail-closed policy.
#[derive(Debug, thiserror::Error)]
pub enum LimiterError {
    /// The store could not be reached (refused, dropped, I/O failure).
    #[error("store unavailable: {0}")]
    Unavailable(#[source] redis::RedisError),

    /// The store accepted the connection but the transaction failed.
    #[error("transaction failed: {0}")]
    Transaction(#[source] redis::RedisError),

    /// The transaction reply did not have the expected shape.
    #[error("failed to parse results: {0}")]
    MalformedReply(String),

    #[error("store call timed out after {0:?}")]
    Timeout(Duration),
}

impl LimiterError {
    /// Classify a Redis error as unavailability or transaction failure.
    pub fn from_redis(err: redis::RedisError) -> Self {
        if err.is_io_error()
            || err.is_connection_refusal()
            || err.is_connection_dropped()
            || err.is_timeout()
        {
            LimiterError::Unavailable(err)
        } else {
            LimiterError::Transaction(err)
        }
    }

    /// Whether the store itself was unreachable, as opposed to misbehaving.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, LimiterError::Unavailable(_) | LimiterError::Timeout(_))
    }
}

/// JSON body of every error response the service writes
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}
