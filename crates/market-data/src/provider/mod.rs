//! Provider adapters.
//!
//! This module contains:
//! - The `ProviderAdapter` trait that all data sources implement
//! - Capabilities, local rate limits and connection settings
//! - Concrete adapters (Census, World Bank, FRED, BLS, Alpha Vantage)
//! - The static fallback used when every live source fails
//!
//! # Architecture
//!
//! Adapters are independent: each owns its HTTP client and configuration
//! and nothing else. Caching, ordering, rate limiting and circuit breaking
//! live in the orchestrator, so an adapter only has to translate one query
//! into one call and classify the answer.

mod capabilities;
mod config;
pub(crate) mod http;
mod mock;
mod traits;

pub mod alpha_vantage;
pub mod bls;
pub mod census;
pub mod fred;
pub mod world_bank;

use std::sync::Arc;
use std::time::Duration;

// Re-exports
pub use alpha_vantage::AlphaVantageAdapter;
pub use bls::BlsAdapter;
pub use capabilities::{ProviderCapabilities, RateLimit};
pub use census::CensusAdapter;
pub use config::{AdapterConfig, DEFAULT_REQUEST_TIMEOUT};
pub use fred::FredAdapter;
pub use mock::StaticFallback;
pub use traits::ProviderAdapter;
pub use world_bank::WorldBankAdapter;

/// Credentials for the adapters that take one.
#[derive(Clone, Default)]
pub struct ProviderCredentials {
    pub alpha_vantage: Option<String>,
    pub fred: Option<String>,
    pub bls: Option<String>,
    pub census: Option<String>,
}

impl std::fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |k: &Option<String>| k.as_ref().map(|_| "***");
        f.debug_struct("ProviderCredentials")
            .field("alpha_vantage", &mask(&self.alpha_vantage))
            .field("fred", &mask(&self.fred))
            .field("bls", &mask(&self.bls))
            .field("census", &mask(&self.census))
            .finish()
    }
}

/// Every built-in adapter against the public endpoints.
pub fn default_adapters(
    credentials: &ProviderCredentials,
    timeout: Duration,
) -> Vec<Arc<dyn ProviderAdapter>> {
    let config = |base: &str, key: &Option<String>| {
        AdapterConfig::new(base)
            .with_api_key(key.clone())
            .with_timeout(timeout)
    };

    vec![
        Arc::new(CensusAdapter::new(config(census::BASE_URL, &credentials.census))),
        Arc::new(WorldBankAdapter::new(config(world_bank::BASE_URL, &None))),
        Arc::new(FredAdapter::new(config(fred::BASE_URL, &credentials.fred))),
        Arc::new(BlsAdapter::new(config(bls::BASE_URL, &credentials.bls))),
        Arc::new(AlphaVantageAdapter::new(config(
            alpha_vantage::BASE_URL,
            &credentials.alpha_vantage,
        ))),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QueryKind;

    #[test]
    fn test_default_adapters_cover_every_query_kind() {
        let adapters = default_adapters(&ProviderCredentials::default(), DEFAULT_REQUEST_TIMEOUT);
        for kind in QueryKind::ALL {
            assert!(
                adapters.iter().any(|a| a.capabilities().serves(kind)),
                "no adapter for {}",
                kind
            );
        }
    }

    #[test]
    fn test_keyless_adapters_are_available_without_credentials() {
        let adapters = default_adapters(&ProviderCredentials::default(), DEFAULT_REQUEST_TIMEOUT);
        let available: Vec<_> = adapters
            .iter()
            .filter(|a| a.is_available())
            .map(|a| a.id())
            .collect();
        assert_eq!(available, vec!["WORLD_BANK", "BLS"]);
    }

    #[test]
    fn test_credentials_debug_is_masked() {
        let creds = ProviderCredentials {
            fred: Some("abc123".to_string()),
            ..Default::default()
        };
        assert!(!format!("{:?}", creds).contains("abc123"));
    }
}
