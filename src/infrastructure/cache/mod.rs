//! Cache Module
//!
//! Redis connection management and the sliding window stores.
//!
//! This module provides:
//! - Redis connection management with automatic reconnection
//! - A `RedisWindowStore` running each bucket update as a MULTI/EXEC transaction
//! - A `MemoryWindowStore` with the same semantics for single-process use
//! - Predefined key prefixes for consistent bucket naming
//!
//! # Architecture
//!
//! ```text
//! +-----------------------+
//! | SlidingWindowLimiter  |
//! +-----------------------+
//!            |
//!            v
//! +-----------------------+
//! |   WindowStore trait   |  <-- Abstract interface
//! +-----------------------+
//!        |          |
//!        v          v
//! +-------------+ +-------------------+
//! | RedisWindow | | MemoryWindowStore |
//! |   Store     | +-------------------+
//! +-------------+
//!        |
//!        v
//! +-------------------+
//! | ConnectionManager |  <-- Shared connection, dialed on first use
//! +-------------------+
//! ```

mod memory_store;
mod redis_store;

pub use memory_store::MemoryWindowStore;
pub use redis_store::{bucket_transaction, parse_members, RedisWindowStore};

use redis::Client;
use tracing::{info, instrument};

use crate::config::RedisSettings;

/// Creates the Redis client for the window store.
///
/// Only the URL is validated here. The connection itself is established by
/// [`RedisWindowStore`] on first use, so an unreachable server at startup
/// surfaces as store errors on requests instead of a failed boot.
///
/// # Arguments
/// * `settings` - Redis configuration settings
///
/// # Returns
/// * `Ok(Client)` - When the URL is valid
/// * `Err(redis::RedisError)` - If the URL cannot be parsed
#[instrument(skip(settings), fields(url = %sanitize_url(&settings.url)))]
pub fn create_redis_client(settings: &RedisSettings) -> Result<Client, redis::RedisError> {
    let client = Client::open(settings.url.as_str())?;
    info!("Redis client configured");
    Ok(client)
}

/// Hide the password part of a Redis URL before logging it.
pub fn sanitize_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            let credentials = &url[scheme_end + 3..at];
            let user = credentials.split(':').next().unwrap_or_default();
            format!("{}{}:***{}", &url[..scheme_end + 3], user, &url[at..])
        }
        _ => url.to_string(),
    }
}

/// Bucket key helpers.
///
/// # Example
/// ```rust,ignore
/// use ratelimit_gate::infrastructure::cache::keys;
///
/// let key = keys::bucket("rl", "10.0.0.1");
/// assert_eq!(key, "rl-10.0.0.1");
/// ```
pub mod keys {
    /// Default namespace for rate limit buckets
    pub const RATE_LIMIT: &str = "rl";

    /// Generates a bucket key inside a namespace
    #[inline]
    pub fn bucket(prefix: &str, identifier: impl std::fmt::Display) -> String {
        format!("{}-{}", prefix, identifier)
    }
}
