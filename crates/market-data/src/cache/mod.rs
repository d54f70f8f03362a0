//! Outcome-aware caching.
//!
//! Every stored value carries the [`Outcome`](crate::models::Outcome) of the
//! call that produced it, and its TTL comes from that outcome:
//!
//! | Outcome           | Default TTL |
//! |-------------------|-------------|
//! | `Success`         | 1 hour      |
//! | `ConfirmedNoData` | 5 minutes   |
//! | `RateLimited`     | 1 minute    |
//! | `TransientError`  | not cached  |
//!
//! Three backends implement [`OutcomeCache`]: [`MemoryCache`],
//! [`PersistentCache`] (memory plus a JSON snapshot) and [`HybridCache`]
//! (memory plus an [`ExternalStore`] such as Redis). [`build_cache`] picks
//! one from a [`CacheConfig`].

mod clock;
mod entry;
mod external;
mod hybrid;
mod memory;
mod pattern;
mod persistent;
mod policy;
mod traits;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use external::{ExternalStore, RedisStore, DEFAULT_REDIS_PREFIX};
pub use hybrid::{HybridCache, DEFAULT_COOL_DOWN, DEFAULT_FALLBACK_TIMEOUT};
pub use memory::MemoryCache;
pub use pattern::KeyPattern;
pub use persistent::PersistentCache;
pub use policy::{
    CachePolicy, DEFAULT_NO_DATA_TTL, DEFAULT_RATE_LIMITED_TTL, DEFAULT_SUCCESS_TTL, MAX_TTL,
};
pub use traits::{CacheStats, OutcomeCache};

use crate::errors::CacheError;

/// Backend selection for [`build_cache`].
#[derive(Clone, Debug)]
pub struct CacheConfig {
    pub policy: CachePolicy,
    /// Snapshot file; enables [`PersistentCache`]
    pub persist_path: Option<PathBuf>,
    /// Redis URL; enables [`HybridCache`]
    pub redis_url: Option<String>,
    pub fallback_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            policy: CachePolicy::default(),
            persist_path: None,
            redis_url: None,
            fallback_timeout: DEFAULT_FALLBACK_TIMEOUT,
        }
    }
}

/// Builds the cache described by `config`.
///
/// A Redis URL wins over a snapshot path. Only an invalid policy or an
/// unparseable Redis URL is an error; an unreachable Redis is not, the
/// hybrid cache simply runs from memory until it comes back.
pub async fn build_cache<T>(config: &CacheConfig) -> Result<Arc<dyn OutcomeCache<T>>, CacheError>
where
    T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
{
    config.policy.validate()?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    if let Some(url) = &config.redis_url {
        if config.persist_path.is_some() {
            warn!("Both a Redis URL and a cache path are configured; the cache path is ignored");
        }
        let store = Arc::new(RedisStore::open(url)?);
        info!(
            "Using hybrid cache (fallback timeout {:?})",
            config.fallback_timeout
        );
        return Ok(Arc::new(HybridCache::new(
            config.policy.clone(),
            store,
            config.fallback_timeout,
            clock,
        )));
    }

    if let Some(path) = &config.persist_path {
        info!("Using persistent cache at {}", path.display());
        return Ok(Arc::new(
            PersistentCache::open(path.clone(), config.policy.clone(), clock).await,
        ));
    }

    Ok(Arc::new(MemoryCache::with_clock(config.policy.clone(), clock)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Outcome;

    #[tokio::test]
    async fn test_default_config_builds_memory_cache() {
        let cache = build_cache::<f64>(&CacheConfig::default()).await.unwrap();
        cache.set("k", Some(1.0), Outcome::Success).await;
        assert_eq!(cache.get("k").await, Some(1.0));
    }

    #[tokio::test]
    async fn test_invalid_policy_is_rejected() {
        let config = CacheConfig {
            policy: CachePolicy::from_millis(1_000, 60_000, 5_000),
            ..Default::default()
        };
        assert!(build_cache::<f64>(&config).await.is_err());
    }

    #[tokio::test]
    async fn test_persist_path_builds_persistent_cache() {
        let dir = tempfile::tempdir().unwrap();
        let config = CacheConfig {
            persist_path: Some(dir.path().join("cache.json")),
            ..Default::default()
        };
        let cache = build_cache::<f64>(&config).await.unwrap();
        cache.set("k", Some(1.0), Outcome::Success).await;
        assert!(dir.path().join("cache.json").exists());
    }

    #[tokio::test]
    async fn test_bad_redis_url_is_rejected() {
        let config = CacheConfig {
            redis_url: Some("definitely not a url".to_string()),
            ..Default::default()
        };
        assert!(build_cache::<f64>(&config).await.is_err());
    }
}
