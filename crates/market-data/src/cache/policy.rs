//! Outcome to TTL mapping.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::CacheError;
use crate::models::Outcome;

/// Default TTL for successful results: 1 hour.
pub const DEFAULT_SUCCESS_TTL: Duration = Duration::from_secs(60 * 60);

/// Default TTL for confirmed absence of data: 5 minutes.
pub const DEFAULT_NO_DATA_TTL: Duration = Duration::from_secs(5 * 60);

/// Default TTL for rate-limited calls: 1 minute.
pub const DEFAULT_RATE_LIMITED_TTL: Duration = Duration::from_secs(60);

/// Longest accepted TTL for any outcome: 10 years.
pub const MAX_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// How long a cache entry lives, per outcome.
///
/// `TransientError` has no TTL: transient failures are never cached.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachePolicy {
    pub success_ttl: Duration,
    pub no_data_ttl: Duration,
    pub rate_limited_ttl: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            success_ttl: DEFAULT_SUCCESS_TTL,
            no_data_ttl: DEFAULT_NO_DATA_TTL,
            rate_limited_ttl: DEFAULT_RATE_LIMITED_TTL,
        }
    }
}

impl CachePolicy {
    pub fn from_millis(success_ms: u64, no_data_ms: u64, rate_limited_ms: u64) -> Self {
        Self {
            success_ttl: Duration::from_millis(success_ms),
            no_data_ttl: Duration::from_millis(no_data_ms),
            rate_limited_ttl: Duration::from_millis(rate_limited_ms),
        }
    }

    /// TTL for an outcome, or `None` when the outcome must not be cached.
    pub fn ttl_for(&self, outcome: Outcome) -> Option<Duration> {
        match outcome {
            Outcome::Success => Some(self.success_ttl),
            Outcome::ConfirmedNoData => Some(self.no_data_ttl),
            Outcome::RateLimited => Some(self.rate_limited_ttl),
            Outcome::TransientError => None,
        }
    }

    /// Checks `RateLimited < ConfirmedNoData < Success`, non-zero TTLs and
    /// the [`MAX_TTL`] cap.
    pub fn validate(&self) -> Result<(), CacheError> {
        if self.success_ttl > MAX_TTL {
            return Err(CacheError::InvalidPolicy(format!(
                "success TTL ({:?}) exceeds the {:?} maximum",
                self.success_ttl, MAX_TTL
            )));
        }
        if self.rate_limited_ttl.is_zero() {
            return Err(CacheError::InvalidPolicy(
                "rate-limited TTL must be greater than zero".to_string(),
            ));
        }
        if self.rate_limited_ttl >= self.no_data_ttl {
            return Err(CacheError::InvalidPolicy(format!(
                "rate-limited TTL ({:?}) must be shorter than no-data TTL ({:?})",
                self.rate_limited_ttl, self.no_data_ttl
            )));
        }
        if self.no_data_ttl >= self.success_ttl {
            return Err(CacheError::InvalidPolicy(format!(
                "no-data TTL ({:?}) must be shorter than success TTL ({:?})",
                self.no_data_ttl, self.success_ttl
            )));
        }
        Ok(())
    }
}
