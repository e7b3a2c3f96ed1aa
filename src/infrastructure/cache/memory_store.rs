//! In-process window store.
//!
//! Mirrors the Redis transaction semantics for a single process: every update
//! on a key runs under that key's shard lock, so the add/prune/expire/list
//! sequence is indivisible. Buckets are not shared between processes.

use std::collections::BTreeSet;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::domain::limiter::{WindowStore, WindowUpdate};
use crate::shared::error::LimiterError;

#[derive(Debug, Default)]
struct Bucket {
    entries: BTreeSet<i64>,
    /// Nanosecond timestamp after which the whole bucket is gone.
    expires_at: i64,
}

/// Sorted-set window store held in memory.
#[derive(Debug, Default)]
pub struct MemoryWindowStore {
    buckets: DashMap<String, Bucket>,
}

impl MemoryWindowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live buckets, expired ones included until next touched.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Drop every bucket whose TTL elapsed before `now_nanos`.
    pub fn purge_expired(&self, now_nanos: i64) -> usize {
        let before = self.buckets.len();
        self.buckets.retain(|_, bucket| bucket.expires_at > now_nanos);
        before - self.buckets.len()
    }
}

#[async_trait]
impl WindowStore for MemoryWindowStore {
    async fn record(&self, key: &str, update: WindowUpdate) -> Result<Vec<String>, LimiterError> {
        let now = update.entry;
        let ttl = i64::try_from(update.ttl.as_nanos()).unwrap_or(i64::MAX);

        let mut bucket = self.buckets.entry(key.to_string()).or_default();
        if bucket.expires_at <= now {
            bucket.entries.clear();
        }

        bucket.entries.insert(now);
        let kept = bucket.entries.split_off(&update.prune_before);
        bucket.entries = kept;
        bucket.expires_at = now.saturating_add(ttl);

        Ok(bucket.entries.iter().map(|entry| entry.to_string()).collect())
    }

    async fn ping(&self) -> Result<(), LimiterError> {
        Ok(())
    }
}
