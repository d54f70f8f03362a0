//! In-memory outcome cache.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use log::debug;

use super::{CacheEntry, CachePolicy, CacheStats, Clock, KeyPattern, OutcomeCache, SystemClock};
use crate::models::Outcome;

/// DashMap-backed cache with lazy expiry.
///
/// Expired entries stay in the map until they are read, overwritten or
/// swept by [`purge_expired`](OutcomeCache::purge_expired).
pub struct MemoryCache<T> {
    entries: DashMap<String, CacheEntry<T>>,
    policy: CachePolicy,
    clock: Arc<dyn Clock>,
}

impl<T> MemoryCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(policy: CachePolicy) -> Self {
        Self::with_clock(policy, Arc::new(SystemClock))
    }

    pub fn with_clock(policy: CachePolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            policy,
            clock,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Builds the entry `set` would store, without storing it.
    pub fn build_entry(
        &self,
        key: &str,
        value: Option<T>,
        outcome: Outcome,
    ) -> Option<CacheEntry<T>> {
        let ttl = self.policy.ttl_for(outcome)?;
        Some(CacheEntry::new(key, value, outcome, ttl, self.clock.now()))
    }

    /// Stores a prebuilt entry as-is (restored snapshots, promoted remote
    /// entries). Already-expired entries are ignored.
    pub fn insert_entry(&self, entry: CacheEntry<T>) -> bool {
        if entry.is_expired_at(self.clock.now()) {
            return false;
        }
        self.entries.insert(entry.key.clone(), entry);
        true
    }

    pub fn lookup(&self, key: &str) -> Option<CacheEntry<T>> {
        let entry = self.entries.get(key)?.value().clone();
        if entry.is_expired_at(self.clock.now()) {
            debug!("Cache entry '{}' expired at {}", key, entry.expires_at());
            return None;
        }
        Some(entry)
    }

    pub fn store(&self, key: &str, value: Option<T>, outcome: Outcome) -> Option<CacheEntry<T>> {
        let Some(entry) = self.build_entry(key, value, outcome) else {
            debug!("Not caching '{}' ({})", key, outcome);
            return None;
        };
        self.entries.insert(key.to_string(), entry.clone());
        Some(entry)
    }

    /// Removes keys matching `pattern`. Counted per removal, so concurrent
    /// inserts never skew the result.
    pub fn remove_matching(&self, pattern: &KeyPattern) -> usize {
        let mut removed = 0;
        self.entries.retain(|key, _| {
            let matched = pattern.matches(key);
            removed += usize::from(matched);
            !matched
        });
        removed
    }

    pub fn remove_expired(&self) -> usize {
        let now = self.clock.now();
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let expired = entry.is_expired_at(now);
            removed += usize::from(expired);
            !expired
        });
        removed
    }

    /// Snapshot of all live entries.
    pub fn live_entries(&self) -> Vec<CacheEntry<T>> {
        let now = self.clock.now();
        self.entries
            .iter()
            .filter(|e| !e.value().is_expired_at(now))
            .map(|e| e.value().clone())
            .collect()
    }

    pub fn live_stats(&self) -> CacheStats {
        let now = self.clock.now();
        let mut stats = CacheStats::default();
        for e in self.entries.iter() {
            if !e.value().is_expired_at(now) {
                stats.record(e.value().outcome);
            }
        }
        stats
    }

    /// Raw number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl<T> OutcomeCache<T> for MemoryCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn get_entry(&self, key: &str) -> Option<CacheEntry<T>> {
        self.lookup(key)
    }

    async fn set(&self, key: &str, value: Option<T>, outcome: Outcome) -> Option<CacheEntry<T>> {
        self.store(key, value, outcome)
    }

    async fn invalidate(&self, pattern: &str) -> usize {
        let removed = self.remove_matching(&KeyPattern::parse(pattern));
        debug!("Invalidated {} cache entries matching '{}'", removed, pattern);
        removed
    }

    async fn purge_expired(&self) -> usize {
        self.remove_expired()
    }

    fn stats(&self) -> CacheStats {
        self.live_stats()
    }

    fn policy(&self) -> &CachePolicy {
        &self.policy
    }
}
