use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Outcome;

/// One stored cache value.
///
/// `stored_at + ttl_ms` is the authoritative expiry instant. Entries are
/// never mutated; a refresh writes a new entry under the same key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    pub key: String,
    /// `None` for ConfirmedNoData and RateLimited entries
    pub value: Option<T>,
    pub stored_at: DateTime<Utc>,
    pub ttl_ms: u64,
    pub outcome: Outcome,
}

impl<T> CacheEntry<T> {
    pub fn new(
        key: impl Into<String>,
        value: Option<T>,
        outcome: Outcome,
        ttl: Duration,
        stored_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key: key.into(),
            value,
            stored_at,
            ttl_ms: u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
            outcome,
        }
    }

    /// `stored_at + ttl_ms`, saturating at the latest representable
    /// instant. A TTL past that point never expires.
    pub fn expires_at(&self) -> DateTime<Utc> {
        i64::try_from(self.ttl_ms)
            .ok()
            .and_then(chrono::Duration::try_milliseconds)
            .and_then(|ttl| self.stored_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Expired strictly after `stored_at + ttl_ms`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at()
    }

    /// Time left before expiry, zero once expired.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at() - now).to_std().unwrap_or(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry() -> CacheEntry<f64> {
        let stored = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        CacheEntry::new(
            "fred:economic_series:x",
            Some(1.0),
            Outcome::Success,
            Duration::from_secs(60),
            stored,
        )
    }

    #[test]
    fn test_expiry_boundary() {
        let e = entry();
        let ms = chrono::Duration::milliseconds;
        assert!(!e.is_expired_at(e.stored_at + ms(59_999)));
        assert!(!e.is_expired_at(e.expires_at()));
        assert!(e.is_expired_at(e.stored_at + ms(60_001)));
    }

    #[test]
    fn test_oversized_ttl_never_expires() {
        let stored = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        for ttl_ms in [9_000_000_000_000_000, i64::MAX as u64 + 1, u64::MAX] {
            let e: CacheEntry<f64> = CacheEntry {
                key: "k".to_string(),
                value: Some(1.0),
                stored_at: stored,
                ttl_ms,
                outcome: Outcome::Success,
            };
            assert_eq!(e.expires_at(), DateTime::<Utc>::MAX_UTC);
            assert!(!e.is_expired_at(stored + chrono::Duration::days(365 * 100)));
        }
    }

    #[test]
    fn test_remaining_never_negative() {
        let e = entry();
        assert_eq!(
            e.remaining_at(e.stored_at + chrono::Duration::seconds(10)),
            Duration::from_secs(50)
        );
        assert_eq!(
            e.remaining_at(e.stored_at + chrono::Duration::seconds(120)),
            Duration::ZERO
        );
    }
}
