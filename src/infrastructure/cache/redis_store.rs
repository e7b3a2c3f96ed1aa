//! Redis Window Store
//!
//! Runs each bucket update as one MULTI/EXEC transaction over a shared
//! `ConnectionManager`. The manager is created on the first store call, and
//! creation is retried on later calls until it succeeds.

use std::sync::Arc;

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{Client, Pipeline, Value};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

use crate::domain::limiter::{WindowStore, WindowUpdate};
use crate::shared::error::LimiterError;

/// Number of commands queued per transaction; EXEC returns one reply each.
const QUEUED_COMMANDS: usize = 4;

/// Reconnect attempts per dial. Callers retry on their next request anyway.
const CONNECT_RETRIES: usize = 1;

/// Sorted-set window store backed by Redis.
#[derive(Clone)]
pub struct RedisWindowStore {
    client: Client,
    connection: Arc<OnceCell<ConnectionManager>>,
}

impl RedisWindowStore {
    /// Wrap `client` without connecting.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            connection: Arc::new(OnceCell::new()),
        }
    }

    /// Whether a connection has been established.
    pub fn is_connected(&self) -> bool {
        self.connection.initialized()
    }

    /// Shared connection, dialing Redis if no attempt has succeeded yet.
    pub async fn connection(&self) -> Result<ConnectionManager, LimiterError> {
        self.connection
            .get_or_try_init(|| async {
                let config = ConnectionManagerConfig::new().set_number_of_retries(CONNECT_RETRIES);
                let manager = ConnectionManager::new_with_config(self.client.clone(), config)
                    .await
                    .map_err(LimiterError::Unavailable)?;
                info!("Redis connection established");
                Ok::<_, LimiterError>(manager)
            })
            .await
            .cloned()
    }
}

/// The bucket update transaction for `key`.
///
/// Queues, inside MULTI/EXEC:
/// 1. `ZADD key entry entry`
/// 2. `ZREMRANGEBYSCORE key 0 (prune_before`
/// 3. `EXPIRE key ttl`
/// 4. `ZRANGE key 0 -1`
pub fn bucket_transaction(key: &str, update: &WindowUpdate) -> Pipeline {
    let ttl_secs = i64::try_from(update.ttl.as_secs()).unwrap_or(i64::MAX);

    let mut pipe = redis::pipe();
    pipe.atomic()
        // Add the new request to the bucket
        .zadd(key, update.entry, update.entry)
        // Remove any entries that are outside of the window
        .zrembyscore(key, 0, format!("({}", update.prune_before))
        // Expire the bucket once nobody uses it
        .expire(key, ttl_secs)
        // Everything left in the window
        .zrange(key, 0, -1);
    pipe
}

#[async_trait]
impl WindowStore for RedisWindowStore {
    #[instrument(skip(self, update), fields(entry = update.entry))]
    async fn record(&self, key: &str, update: WindowUpdate) -> Result<Vec<String>, LimiterError> {
        let mut conn = self.connection().await?;

        let replies: Vec<Value> = bucket_transaction(key, &update)
            .query_async(&mut conn)
            .await
            .map_err(LimiterError::from_redis)?;

        let members = parse_members(replies)?;
        debug!(count = members.len(), "Bucket updated");
        Ok(members)
    }

    async fn ping(&self) -> Result<(), LimiterError> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(LimiterError::from_redis)?;
        Ok(())
    }
}

/// Extract the member list from the EXEC reply of a bucket transaction.
///
/// The reply must hold exactly one entry per queued command, the last being
/// the ZRANGE array of members.
pub fn parse_members(replies: Vec<Value>) -> Result<Vec<String>, LimiterError> {
    if replies.len() != QUEUED_COMMANDS {
        return Err(LimiterError::MalformedReply(format!(
            "expected {} replies, got {}",
            QUEUED_COMMANDS,
            replies.len()
        )));
    }

    let items = match replies.into_iter().last() {
        Some(Value::Array(items)) | Some(Value::Set(items)) => items,
        Some(other) => {
            return Err(LimiterError::MalformedReply(format!(
                "expected member list, got {:?}",
                other
            )))
        }
        None => return Err(LimiterError::MalformedReply("empty reply".into())),
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::BulkString(bytes) => String::from_utf8(bytes)
                .map_err(|e| LimiterError::MalformedReply(format!("member is not UTF-8: {}", e))),
            Value::SimpleString(s) => Ok(s),
            other => Err(LimiterError::MalformedReply(format!(
                "unexpected member {:?}",
                other
            ))),
        })
        .collect()
}
