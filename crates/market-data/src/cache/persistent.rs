//! Memory cache with a best-effort JSON snapshot on disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;

use super::{CacheEntry, CachePolicy, CacheStats, Clock, KeyPattern, MemoryCache, OutcomeCache};
use crate::errors::CacheError;
use crate::models::Outcome;

/// Outcome cache that survives restarts.
///
/// Memory is authoritative. After every write the live entries are written
/// to `path` as a JSON array; a failed snapshot is logged and otherwise
/// ignored, so disk trouble never blocks or fails a `set`.
pub struct PersistentCache<T> {
    memory: MemoryCache<T>,
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl<T> PersistentCache<T>
where
    T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
{
    /// Opens the cache, restoring live entries from `path` when it exists.
    pub async fn open(
        path: impl Into<PathBuf>,
        policy: CachePolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let path = path.into();
        let memory = MemoryCache::with_clock(policy, clock);

        match Self::read_snapshot(&path).await {
            Ok(Some(entries)) => {
                let total = entries.len();
                let restored = entries
                    .into_iter()
                    .filter(|e| memory.insert_entry(e.clone()))
                    .count();
                info!(
                    "Restored {} of {} cache entries from {}",
                    restored,
                    total,
                    path.display()
                );
            }
            Ok(None) => debug!("No cache snapshot at {}", path.display()),
            Err(e) => warn!(
                "Ignoring unreadable cache snapshot {}: {}",
                path.display(),
                e
            ),
        }

        Self {
            memory,
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_snapshot(path: &Path) -> Result<Option<Vec<CacheEntry<T>>>, CacheError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes the live entries to disk via a temp file and rename.
    pub async fn flush(&self) -> Result<(), CacheError> {
        let _guard = self.write_lock.lock().await;
        let bytes = serde_json::to_vec(&self.memory.live_entries())?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn persist(&self) {
        if let Err(e) = self.flush().await {
            warn!(
                "Cache snapshot to {} failed, continuing in memory: {}",
                self.path.display(),
                e
            );
        }
    }
}

#[async_trait]
impl<T> OutcomeCache<T> for PersistentCache<T>
where
    T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
{
    async fn get_entry(&self, key: &str) -> Option<CacheEntry<T>> {
        self.memory.lookup(key)
    }

    async fn set(&self, key: &str, value: Option<T>, outcome: Outcome) -> Option<CacheEntry<T>> {
        let stored = self.memory.store(key, value, outcome);
        if stored.is_some() {
            self.persist().await;
        }
        stored
    }

    async fn invalidate(&self, pattern: &str) -> usize {
        let removed = self.memory.remove_matching(&KeyPattern::parse(pattern));
        if removed > 0 {
            self.persist().await;
        }
        removed
    }

    async fn purge_expired(&self) -> usize {
        let removed = self.memory.remove_expired();
        if removed > 0 {
            self.persist().await;
        }
        removed
    }

    fn stats(&self) -> CacheStats {
        self.memory.live_stats()
    }

    fn policy(&self) -> &CachePolicy {
        self.memory.policy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use std::time::Duration;

    #[tokio::test]
    async fn test_entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let clock = Arc::new(ManualClock::default());

        let cache: PersistentCache<f64> =
            PersistentCache::open(&path, CachePolicy::default(), clock.clone()).await;
        cache.set("census:market_size:a", Some(9.5), Outcome::Success).await;
        cache.set("fred:economic_series:b", None, Outcome::ConfirmedNoData).await;
        drop(cache);

        let reopened: PersistentCache<f64> =
            PersistentCache::open(&path, CachePolicy::default(), clock.clone()).await;
        assert_eq!(reopened.get("census:market_size:a").await, Some(9.5));
        let entry = reopened.get_entry("fred:economic_series:b").await.unwrap();
        assert_eq!(entry.outcome, Outcome::ConfirmedNoData);
    }

    #[tokio::test]
    async fn test_expired_entries_are_not_restored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let clock = Arc::new(ManualClock::default());

        let cache: PersistentCache<f64> =
            PersistentCache::open(&path, CachePolicy::default(), clock.clone()).await;
        cache.set("short", None, Outcome::RateLimited).await;
        cache.set("long", Some(1.0), Outcome::Success).await;
        drop(cache);

        clock.advance(Duration::from_secs(61));
        let reopened: PersistentCache<f64> =
            PersistentCache::open(&path, CachePolicy::default(), clock.clone()).await;
        assert!(reopened.get_entry("short").await.is_none());
        assert_eq!(reopened.get("long").await, Some(1.0));
        assert_eq!(reopened.stats().total(), 1);
    }

    #[tokio::test]
    async fn test_write_failure_does_not_block_memory() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the snapshot file should be makes every write fail.
        let path = dir.path().join("blocked");
        std::fs::create_dir_all(path.join("cache.json")).unwrap();
        let path = path.join("cache.json");

        let cache: PersistentCache<f64> =
            PersistentCache::open(&path, CachePolicy::default(), Arc::new(ManualClock::default()))
                .await;
        let stored = cache.set("k", Some(3.0), Outcome::Success).await;

        assert!(stored.is_some());
        assert_eq!(cache.get("k").await, Some(3.0));
        assert!(cache.flush().await.is_err());
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, b"{not json").unwrap();

        let cache: PersistentCache<f64> =
            PersistentCache::open(&path, CachePolicy::default(), Arc::new(ManualClock::default()))
                .await;
        assert_eq!(cache.stats().total(), 0);

        cache.set("k", Some(1.0), Outcome::Success).await;
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"k\""));
    }

    #[tokio::test]
    async fn test_invalidate_rewrites_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let clock = Arc::new(ManualClock::default());

        let cache: PersistentCache<f64> =
            PersistentCache::open(&path, CachePolicy::default(), clock.clone()).await;
        cache.set("fred:a", Some(1.0), Outcome::Success).await;
        cache.set("bls:a", Some(2.0), Outcome::Success).await;
        assert_eq!(cache.invalidate("fred:").await, 1);
        drop(cache);

        let reopened: PersistentCache<f64> =
            PersistentCache::open(&path, CachePolicy::default(), clock).await;
        assert!(reopened.get("fred:a").await.is_none());
        assert_eq!(reopened.get("bls:a").await, Some(2.0));
    }
}
