use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{CacheEntry, CachePolicy};
use crate::models::Outcome;

/// Live entry counts per outcome.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub success: usize,
    pub confirmed_no_data: usize,
    pub rate_limited: usize,
}

impl CacheStats {
    pub fn total(&self) -> usize {
        self.success + self.confirmed_no_data + self.rate_limited
    }

    pub(crate) fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Success => self.success += 1,
            Outcome::ConfirmedNoData => self.confirmed_no_data += 1,
            Outcome::RateLimited => self.rate_limited += 1,
            Outcome::TransientError => {}
        }
    }
}

/// Keyed store whose TTL depends on the outcome that produced the value.
///
/// The cache is the single owner of TTL state. Callers only ask whether a
/// live entry exists and, on a miss, write a new one. Implementations must
/// be safe for concurrent use; `set` is last-write-wins.
#[async_trait]
pub trait OutcomeCache<T>: Send + Sync
where
    T: Clone + Send + Sync + 'static,
{
    /// Live value for `key`. Expired entries, and entries stored without a
    /// value (no data, rate limited), read as `None`.
    async fn get(&self, key: &str) -> Option<T> {
        self.get_entry(key).await.and_then(|entry| entry.value)
    }

    /// Raw live entry for `key`, including `stored_at` and the outcome.
    async fn get_entry(&self, key: &str) -> Option<CacheEntry<T>>;

    /// Stores `value` with the TTL of `outcome`, replacing any entry under
    /// `key`. Returns the stored entry, or `None` when the outcome is not
    /// cacheable.
    async fn set(&self, key: &str, value: Option<T>, outcome: Outcome) -> Option<CacheEntry<T>>;

    /// Removes every key matching `pattern` (prefix, or glob with `*`).
    /// Returns the number of local entries removed.
    async fn invalidate(&self, pattern: &str) -> usize;

    /// Eagerly drops expired entries. Returns how many were removed.
    async fn purge_expired(&self) -> usize;

    fn stats(&self) -> CacheStats;

    fn policy(&self) -> &CachePolicy;
}
