//! Memory cache backed by an external store.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{
    CacheEntry, CachePolicy, CacheStats, Clock, ExternalStore, KeyPattern, MemoryCache,
    OutcomeCache,
};
use crate::errors::CacheError;
use crate::models::Outcome;

pub const DEFAULT_FALLBACK_TIMEOUT: Duration = Duration::from_millis(250);
pub const DEFAULT_COOL_DOWN: Duration = Duration::from_secs(30);

/// Outcome cache that shares entries through an [`ExternalStore`].
///
/// Reads hit memory first and fall through to the store on a miss; live
/// remote entries are promoted into memory. Writes go to memory and then to
/// the store. Every store call is bounded by `fallback_timeout`. When a call
/// fails or times out the cache runs memory-only until `cool_down` has
/// passed, then tries the store again.
pub struct HybridCache<T> {
    memory: MemoryCache<T>,
    store: Arc<dyn ExternalStore>,
    fallback_timeout: Duration,
    cool_down: Duration,
    degraded_until: Mutex<Option<DateTime<Utc>>>,
}

impl<T> HybridCache<T>
where
    T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
{
    pub fn new(
        policy: CachePolicy,
        store: Arc<dyn ExternalStore>,
        fallback_timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            memory: MemoryCache::with_clock(policy, clock),
            store,
            fallback_timeout,
            cool_down: DEFAULT_COOL_DOWN,
            degraded_until: Mutex::new(None),
        }
    }

    pub fn with_cool_down(mut self, cool_down: Duration) -> Self {
        self.cool_down = cool_down;
        self
    }

    /// Whether the store is currently bypassed.
    pub fn is_degraded(&self) -> bool {
        let until = *self
            .degraded_until
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        matches!(until, Some(t) if self.memory.clock().now() < t)
    }

    fn mark_degraded(&self, op: &str, error: &CacheError) {
        let until = self.memory.clock().now()
            + chrono::Duration::milliseconds(self.cool_down.as_millis() as i64);
        warn!(
            "External cache '{}' {} failed, memory-only until {}: {}",
            self.store.name(),
            op,
            until,
            error
        );
        *self
            .degraded_until
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(until);
    }

    fn mark_healthy(&self) {
        let mut guard = self
            .degraded_until
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if guard.take().is_some() {
            debug!("External cache '{}' reachable again", self.store.name());
        }
    }

    /// Runs one store call under the fallback timeout. `None` means the
    /// store was skipped or failed; the cache is then degraded.
    async fn guarded<R, F>(&self, op: &str, call: F) -> Option<R>
    where
        F: Future<Output = Result<R, CacheError>> + Send,
    {
        if self.is_degraded() {
            return None;
        }
        let result = match tokio::time::timeout(self.fallback_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout(self.fallback_timeout)),
        };
        match result {
            Ok(value) => {
                self.mark_healthy();
                Some(value)
            }
            Err(e) => {
                self.mark_degraded(op, &e);
                None
            }
        }
    }

    async fn fetch_remote(&self, key: &str) -> Option<CacheEntry<T>> {
        let bytes = self.guarded("get", self.store.get(key)).await??;
        match serde_json::from_slice::<CacheEntry<T>>(&bytes) {
            Ok(entry) if self.memory.insert_entry(entry.clone()) => Some(entry),
            Ok(_) => None,
            Err(e) => {
                warn!("Dropping undecodable external cache entry '{}': {}", key, e);
                None
            }
        }
    }

    async fn push_remote(&self, entry: &CacheEntry<T>) {
        let bytes = match serde_json::to_vec(entry) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Cache entry '{}' not shared: {}", entry.key, e);
                return;
            }
        };
        let ttl = Duration::from_millis(entry.ttl_ms);
        self.guarded("set", self.store.set(&entry.key, bytes, ttl))
            .await;
    }
}

#[async_trait]
impl<T> OutcomeCache<T> for HybridCache<T>
where
    T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
{
    async fn get_entry(&self, key: &str) -> Option<CacheEntry<T>> {
        if let Some(entry) = self.memory.lookup(key) {
            return Some(entry);
        }
        self.fetch_remote(key).await
    }

    async fn set(&self, key: &str, value: Option<T>, outcome: Outcome) -> Option<CacheEntry<T>> {
        let entry = self.memory.store(key, value, outcome)?;
        self.push_remote(&entry).await;
        Some(entry)
    }

    async fn invalidate(&self, pattern: &str) -> usize {
        let pattern = KeyPattern::parse(pattern);
        let removed = self.memory.remove_matching(&pattern);
        if let Some(remote) = self
            .guarded("invalidate", self.store.delete_matching(&pattern.as_glob()))
            .await
        {
            debug!(
                "Invalidated {} external keys for '{}'",
                remote,
                pattern.as_glob()
            );
        }
        removed
    }

    async fn purge_expired(&self) -> usize {
        // The store expires its own keys.
        self.memory.remove_expired()
    }

    fn stats(&self) -> CacheStats {
        self.memory.live_stats()
    }

    fn policy(&self) -> &CachePolicy {
        self.memory.policy()
    }
}
