use std::fmt;

use serde::{Deserialize, Serialize};

/// Classification of a single adapter call.
///
/// Every adapter call ends in exactly one outcome, and the outcome alone
/// selects the caching policy applied to its result.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    /// The provider returned a usable value.
    Success,
    /// The provider answered, but it has no value for this query.
    ConfirmedNoData,
    /// The provider refused the call because of a rate limit.
    RateLimited,
    /// Network, transport or payload failure. Never cached.
    TransientError,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::ConfirmedNoData => "CONFIRMED_NO_DATA",
            Self::RateLimited => "RATE_LIMITED",
            Self::TransientError => "TRANSIENT_ERROR",
        }
    }

    /// Whether results with this outcome are ever written to the cache.
    pub fn is_cacheable(&self) -> bool {
        !matches!(self, Self::TransientError)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_errors_are_not_cacheable() {
        assert!(Outcome::Success.is_cacheable());
        assert!(Outcome::ConfirmedNoData.is_cacheable());
        assert!(Outcome::RateLimited.is_cacheable());
        assert!(!Outcome::TransientError.is_cacheable());
    }

    #[test]
    fn test_outcome_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&Outcome::ConfirmedNoData).unwrap();
        assert_eq!(json, "\"CONFIRMED_NO_DATA\"");
        let parsed: Outcome = serde_json::from_str("\"RATE_LIMITED\"").unwrap();
        assert_eq!(parsed, Outcome::RateLimited);
    }
}
