//! External key-value stores used by [`HybridCache`](super::HybridCache).

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;

use crate::errors::CacheError;

/// Byte-oriented store shared across processes.
///
/// Calls may hang or fail at any time; the hybrid cache bounds every call
/// with its fallback timeout and never surfaces these errors to callers.
#[async_trait]
pub trait ExternalStore: Send + Sync {
    fn name(&self) -> &str;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Stores `value`, letting the store expire it after `ttl`.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    /// Deletes keys matching a Redis-style glob. Returns how many went.
    async fn delete_matching(&self, glob: &str) -> Result<usize, CacheError>;
}

pub const DEFAULT_REDIS_PREFIX: &str = "marketlens";

const SCAN_BATCH: usize = 200;

/// Redis-backed [`ExternalStore`].
///
/// Keys are namespaced as `<prefix>:<cache key>`. A fresh multiplexed
/// connection is taken per call, so a Redis restart heals on the next call.
pub struct RedisStore {
    client: redis::Client,
    prefix: String,
}

impl RedisStore {
    /// Parses `url`. No connection is made until the first call.
    pub fn open(url: &str) -> Result<Self, CacheError> {
        Self::with_prefix(url, DEFAULT_REDIS_PREFIX)
    }

    pub fn with_prefix(url: &str, prefix: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        Ok(Self {
            client,
            prefix: prefix.to_string(),
        })
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, key)
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, CacheError> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }
}

#[async_trait]
impl ExternalStore for RedisStore {
    fn name(&self) -> &str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.connection().await?;
        let value: Option<Vec<u8>> = conn.get(self.namespaced(key)).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        // PX needs at least one millisecond
        let ttl_ms = ttl.as_millis().max(1) as u64;
        let _: () = redis::cmd("SET")
            .arg(self.namespaced(key))
            .arg(value)
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    /// Walks the keyspace with `SCAN MATCH`, deleting one batch at a time.
    async fn delete_matching(&self, glob: &str) -> Result<usize, CacheError> {
        let mut conn = self.connection().await?;
        let pattern = self.namespaced(glob);
        let mut cursor: u64 = 0;
        let mut removed = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;
            if !keys.is_empty() {
                let deleted: usize = conn.del(keys).await?;
                removed += deleted;
            }
            if next == 0 {
                return Ok(removed);
            }
            cursor = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_rejects_malformed_url() {
        assert!(RedisStore::open("not a url").is_err());
    }

    #[test]
    fn test_keys_are_namespaced() {
        let store = RedisStore::with_prefix("redis://127.0.0.1:6379", "test").unwrap();
        assert_eq!(store.namespaced("fred:x"), "test:fred:x");
        assert_eq!(store.name(), "redis");
    }
}
