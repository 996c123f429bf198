//! The production [RedisKvStore] implementation, built on a [redis::aio::ConnectionManager] so
//! that reconnects are handled transparently instead of failing every request during a blip.

use crate::error::EdgeError;
use crate::kv::KvStore;
use crate::metrics::{observe_cache_get, observe_cache_set};
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::time::{Duration, Instant};

/// [RedisKvStore] wraps a cloneable [ConnectionManager]; cloning it is cheap, so one instance is
/// created at startup and shared across every task that needs cache access.
#[derive(Clone)]
pub struct RedisKvStore {
    conn: ConnectionManager,
}

impl RedisKvStore {
    /// Connects to `address` (a `redis://` URL) and returns a ready-to-use store.
    pub async fn connect(address: &str) -> Result<Self, EdgeError> {
        let client = redis::Client::open(address)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn })
    }

    /// Classifies a key into the label used for per-key-kind metrics, without caring about its
    /// value: anything prefixed `scanner:` or `store:` is bookkeeping, everything else is a
    /// client-facing lookup (profile or texture keys are both plain hex strings).
    fn key_kind(key: &str) -> &'static str {
        if key.starts_with("scanner:") {
            "scanner"
        } else if key.starts_with("store:") {
            "store"
        } else {
            "lookup"
        }
    }
}

#[async_trait]
impl KvStore for RedisKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, EdgeError> {
        let start = Instant::now();
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        observe_cache_get(Self::key_kind(key), value.is_some(), start.elapsed());
        Ok(value)
    }

    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), EdgeError> {
        let start = Instant::now();
        let mut conn = self.conn.clone();
        match ttl {
            Some(ttl) if !ttl.is_zero() => {
                let _: () = conn.set_ex(key, value, ttl.as_secs()).await?;
            }
            _ => {
                let _: () = conn.set(key, value).await?;
            }
        }
        observe_cache_set(Self::key_kind(key), start.elapsed());
        Ok(())
    }

    async fn scan(&self, pattern: &str, cursor: u64, count: u32) -> Result<(u64, Vec<String>), EdgeError> {
        let mut conn = self.conn.clone();
        let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(count)
            .query_async(&mut conn)
            .await?;
        Ok((next_cursor, keys))
    }
}
