//! Local token buckets, one per adapter.
//!
//! The orchestrator never waits for a token: an empty bucket means the
//! adapter is skipped for this resolution and the next one is tried.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use log::{debug, warn};

use crate::provider::RateLimit;

#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
    /// tokens per second
    rate: f64,
    capacity: f64,
}

impl TokenBucket {
    fn from_limit(limit: &RateLimit) -> Self {
        let capacity = f64::from(limit.burst_capacity.max(1));
        Self {
            tokens: capacity,
            last_refill: Instant::now(),
            rate: f64::from(limit.requests_per_minute) / 60.0,
            capacity,
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate).min(self.capacity);
        self.last_refill = now;
    }

    fn try_take(&mut self) -> bool {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Per-adapter token buckets.
///
/// Adapters without a configured limit get [`RateLimit::default`].
#[derive(Default)]
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, TokenBucket>>,
    limits: Mutex<HashMap<String, RateLimit>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_buckets(&self) -> MutexGuard<'_, HashMap<String, TokenBucket>> {
        self.buckets.lock().unwrap_or_else(|poisoned| {
            warn!("Rate limiter buckets mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn lock_limits(&self) -> MutexGuard<'_, HashMap<String, RateLimit>> {
        self.limits.lock().unwrap_or_else(|poisoned| {
            warn!("Rate limiter limits mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Sets the limit for `provider`, starting it with a full bucket.
    pub fn configure(&self, provider: &str, limit: RateLimit) {
        self.lock_limits().insert(provider.to_string(), limit);
        self.lock_buckets().remove(provider);
    }

    /// Takes a token if one is available. Never waits.
    pub fn try_acquire(&self, provider: &str) -> bool {
        let limit = self.lock_limits().get(provider).cloned().unwrap_or_default();
        let mut buckets = self.lock_buckets();
        let bucket = buckets
            .entry(provider.to_string())
            .or_insert_with(|| TokenBucket::from_limit(&limit));

        let acquired = bucket.try_take();
        if !acquired {
            debug!("Local rate limit reached for '{}'", provider);
        }
        acquired
    }

    /// Whole tokens currently available to `provider`.
    pub fn remaining(&self, provider: &str) -> u32 {
        let mut buckets = self.lock_buckets();
        match buckets.get_mut(provider) {
            Some(bucket) => {
                bucket.refill();
                bucket.tokens.floor() as u32
            }
            None => self
                .lock_limits()
                .get(provider)
                .cloned()
                .unwrap_or_default()
                .burst_capacity
                .max(1),
        }
    }

    pub fn reset(&self, provider: &str) {
        self.lock_buckets().remove(provider);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn limit(per_minute: u32, burst: u32) -> RateLimit {
        RateLimit {
            requests_per_minute: per_minute,
            burst_capacity: burst,
        }
    }

    #[test]
    fn test_burst_then_empty() {
        let limiter = RateLimiter::new();
        limiter.configure("FRED", limit(60, 3));

        for _ in 0..3 {
            assert!(limiter.try_acquire("FRED"));
        }
        assert!(!limiter.try_acquire("FRED"));
        assert_eq!(limiter.remaining("FRED"), 0);
    }

    #[test]
    fn test_bucket_refills_over_time() {
        let mut bucket = TokenBucket::from_limit(&limit(60, 1));
        assert!(bucket.try_take());
        assert!(!bucket.try_take());

        bucket.last_refill = Instant::now() - Duration::from_secs(2);
        assert!(bucket.try_take());
    }

    #[test]
    fn test_default_limit_for_unknown_provider() {
        let limiter = RateLimiter::new();
        let burst = RateLimit::default().burst_capacity;
        assert_eq!(limiter.remaining("NEW"), burst);
        for _ in 0..burst {
            assert!(limiter.try_acquire("NEW"));
        }
        assert!(!limiter.try_acquire("NEW"));
    }

    #[test]
    fn test_providers_are_isolated() {
        let limiter = RateLimiter::new();
        limiter.configure("A", limit(60, 1));
        assert!(limiter.try_acquire("A"));
        assert!(!limiter.try_acquire("A"));
        assert!(limiter.try_acquire("B"));
    }

    #[test]
    fn test_reset_restores_capacity() {
        let limiter = RateLimiter::new();
        limiter.configure("A", limit(60, 1));
        assert!(limiter.try_acquire("A"));
        limiter.reset("A");
        assert!(limiter.try_acquire("A"));
    }

    #[test]
    fn test_zero_burst_still_allows_one_call() {
        let limiter = RateLimiter::new();
        limiter.configure("A", limit(1, 0));
        assert!(limiter.try_acquire("A"));
        assert!(!limiter.try_acquire("A"));
    }
}
