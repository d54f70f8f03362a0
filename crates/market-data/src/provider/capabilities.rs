//! Adapter capabilities and local rate limiting configuration.

use crate::models::QueryKind;

/// What an adapter can answer and how much its answers are trusted.
///
/// Used by the orchestrator to select the candidate adapters for a query.
#[derive(Clone, Debug)]
pub struct ProviderCapabilities {
    /// Query kinds this adapter serves.
    pub query_kinds: &'static [QueryKind],

    /// Whether the adapter needs an API key to be usable.
    pub requires_credential: bool,

    /// Confidence attached to every result, in [0, 1].
    pub confidence: f64,
}

impl ProviderCapabilities {
    pub fn serves(&self, kind: QueryKind) -> bool {
        self.query_kinds.contains(&kind)
    }
}

/// Client-side call budget for an adapter.
///
/// Feeds the orchestrator's token bucket: `burst_capacity` tokens refilled
/// at `requests_per_minute`. An empty bucket skips the adapter rather than
/// waiting for a token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimit {
    /// Sustained requests allowed per minute.
    pub requests_per_minute: u32,

    /// Requests that may be made back to back.
    pub burst_capacity: u32,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            requests_per_minute: 60,
            burst_capacity: 10,
        }
    }
}
