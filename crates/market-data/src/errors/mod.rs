//! Error types and outcome classification for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: The main error enum for adapter and orchestrator operations
//! - [`CacheError`]: Failures of the persistence and external cache backends

mod cache;

pub use cache::CacheError;

use thiserror::Error;

use crate::models::{Outcome, QueryKind};
use crate::registry::AggregateFailure;

/// Errors that can occur during provider and orchestration operations.
///
/// Every adapter error maps onto an [`Outcome`] via [`outcome`](Self::outcome),
/// which decides how the result is cached and whether the orchestrator
/// moves on to the next adapter.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The provider answered with a valid response that carries no value
    /// (missing field, null, or a sentinel such as "None" or ".").
    #[error("No data: {provider} - {message}")]
    NoData {
        /// The provider that had no data
        provider: String,
        /// What was missing
        message: String,
    },

    /// The provider rate limited the request (HTTP 429 or a rate-limit body).
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
    },

    /// The request to the provider timed out.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// A provider-specific error occurred (non-2xx status, error envelope).
    #[error("Provider error: {provider} - {message}")]
    ProviderError {
        /// The provider that returned the error
        provider: String,
        /// The error message from the provider
        message: String,
    },

    /// The provider returned a payload that could not be decoded.
    #[error("Failed to parse {provider} response: {message}")]
    Parse {
        /// The provider whose payload was malformed
        provider: String,
        /// Decoder message
        message: String,
    },

    /// The adapter needs a credential that is not configured.
    #[error("Credential missing: {provider}")]
    CredentialMissing {
        /// The provider without a credential
        provider: String,
    },

    /// The adapter was asked for a query it does not serve.
    #[error("Unsupported query for {provider}: {kind}")]
    UnsupportedQuery {
        /// The provider that rejected the query
        provider: String,
        /// The rejected query kind
        kind: QueryKind,
    },

    /// No adapter is registered for this kind of query.
    #[error("No providers available for {0}")]
    NoProvidersAvailable(QueryKind),

    /// Every eligible adapter was tried, skipped or failed.
    #[error("{0}")]
    AllProvidersFailed(AggregateFailure),

    /// A network error occurred while communicating with a provider.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl MarketDataError {
    /// Returns the outcome class of this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use marketlens_market_data::errors::MarketDataError;
    /// use marketlens_market_data::Outcome;
    ///
    /// let error = MarketDataError::RateLimited { provider: "FRED".to_string() };
    /// assert_eq!(error.outcome(), Outcome::RateLimited);
    ///
    /// let error = MarketDataError::NoData {
    ///     provider: "FRED".to_string(),
    ///     message: "value '.'".to_string(),
    /// };
    /// assert_eq!(error.outcome(), Outcome::ConfirmedNoData);
    /// ```
    pub fn outcome(&self) -> Outcome {
        match self {
            Self::NoData { .. } => Outcome::ConfirmedNoData,
            Self::RateLimited { .. } => Outcome::RateLimited,
            Self::Timeout { .. }
            | Self::ProviderError { .. }
            | Self::Parse { .. }
            | Self::CredentialMissing { .. }
            | Self::UnsupportedQuery { .. }
            | Self::NoProvidersAvailable(_)
            | Self::AllProvidersFailed(_)
            | Self::Network(_) => Outcome::TransientError,
        }
    }

    pub(crate) fn no_data(provider: &str, message: impl Into<String>) -> Self {
        Self::NoData {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn rate_limited(provider: &str) -> Self {
        Self::RateLimited {
            provider: provider.to_string(),
        }
    }

    pub(crate) fn provider(provider: &str, message: impl Into<String>) -> Self {
        Self::ProviderError {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn parse(provider: &str, message: impl ToString) -> Self {
        Self::Parse {
            provider: provider.to_string(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_data_is_confirmed_no_data() {
        let error = MarketDataError::no_data("FRED", "missing observation");
        assert_eq!(error.outcome(), Outcome::ConfirmedNoData);
    }

    #[test]
    fn test_rate_limited_is_rate_limited() {
        let error = MarketDataError::rate_limited("ALPHA_VANTAGE");
        assert_eq!(error.outcome(), Outcome::RateLimited);
    }

    #[test]
    fn test_transport_and_payload_failures_are_transient() {
        let errors = [
            MarketDataError::Timeout {
                provider: "BLS".to_string(),
            },
            MarketDataError::provider("CENSUS", "HTTP 500 Internal Server Error"),
            MarketDataError::parse("WORLD_BANK", "expected value at line 1"),
            MarketDataError::CredentialMissing {
                provider: "FRED".to_string(),
            },
        ];
        for error in errors {
            assert_eq!(error.outcome(), Outcome::TransientError, "{}", error);
        }
    }

    #[test]
    fn test_error_display() {
        let error = MarketDataError::rate_limited("FRED");
        assert_eq!(format!("{}", error), "Rate limited: FRED");

        let error = MarketDataError::provider("CENSUS", "HTTP 503");
        assert_eq!(format!("{}", error), "Provider error: CENSUS - HTTP 503");

        let error = MarketDataError::UnsupportedQuery {
            provider: "BLS".to_string(),
            kind: QueryKind::CompanyFinancials,
        };
        assert_eq!(
            format!("{}", error),
            "Unsupported query for BLS: company_financials"
        );
    }
}
