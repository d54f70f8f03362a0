//! The adapter trait every data source implements.

use async_trait::async_trait;

use crate::errors::MarketDataError;
use crate::models::{LogicalQuery, NormalizedResult};

use super::capabilities::{ProviderCapabilities, RateLimit};

/// One external data source.
///
/// An adapter turns a [`LogicalQuery`] into one provider call and
/// normalizes the answer. Expected negative answers are errors with a
/// specific class, not panics or empty successes:
///
/// - a valid response without a usable number is [`MarketDataError::NoData`]
/// - HTTP 429 or a provider rate-limit body is [`MarketDataError::RateLimited`]
/// - transport, status and decoding failures are the remaining variants
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use marketlens_market_data::provider::{ProviderAdapter, ProviderCapabilities};
///
/// struct MyAdapter;
///
/// #[async_trait]
/// impl ProviderAdapter for MyAdapter {
///     fn id(&self) -> &'static str {
///         "MY_SOURCE"
///     }
///
///     fn capabilities(&self) -> ProviderCapabilities {
///         ProviderCapabilities {
///             query_kinds: &[QueryKind::EconomicSeries],
///             requires_credential: false,
///             confidence: 0.9,
///         }
///     }
///
///     fn is_available(&self) -> bool {
///         true
///     }
///
///     // ... implement fetch
/// }
/// ```
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Unique identifier such as "FRED" or "WORLD_BANK".
    ///
    /// Used in cache keys, logs, diagnostics and as the `source` of results.
    fn id(&self) -> &'static str;

    /// Preference order. Lower values are tried first. Default is 10.
    fn priority(&self) -> u8 {
        10
    }

    fn capabilities(&self) -> ProviderCapabilities;

    /// Local call budget. Defaults to 60 requests per minute, burst 10.
    fn rate_limit(&self) -> RateLimit {
        RateLimit::default()
    }

    /// Cheap check, no network: typically "is a credential configured".
    fn is_available(&self) -> bool;

    /// Whether this adapter can answer `query`.
    ///
    /// Defaults to the declared query kinds. Adapters narrow it when they
    /// only cover some parameter values (e.g. mapped industries).
    fn supports(&self, query: &LogicalQuery) -> bool {
        self.capabilities().serves(query.kind())
    }

    /// Performs the provider call for `query`.
    async fn fetch(&self, query: &LogicalQuery) -> Result<NormalizedResult, MarketDataError>;
}
