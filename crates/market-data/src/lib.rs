//! MarketLens Market Data Crate
//!
//! This crate answers logical business-data questions ("how large is the
//! software market in the US", "latest value of FRED series GDP") by
//! consulting a set of public data providers in order.
//!
//! # Overview
//!
//! The market data crate supports:
//! - Multiple providers: FRED, BLS, Census CBP, World Bank, Alpha Vantage
//! - Outcome-aware caching, including negative results
//! - Memory, on-disk snapshot and Redis-backed cache backends
//! - Local rate limiting and circuit breaking
//! - Per-resolution diagnostics
//!
//! # Architecture
//!
//! ```text
//! +------------------+
//! |   LogicalQuery   |  (what is asked)
//! +------------------+
//!          |
//!          v
//! +----------------------+     +------------------+
//! | ProviderOrchestrator | <-> |  OutcomeCache    |  (TTL by outcome)
//! +----------------------+     +------------------+
//!          |
//!          v
//! +------------------+
//! | ProviderAdapter  |  (FRED, BLS, Census, ...)
//! +------------------+
//!          |
//!          v
//! +------------------+
//! | MarketSizeResult |  (value, source, details, confidence)
//! +------------------+
//! ```
//!
//! # Core Types
//!
//! - [`LogicalQuery`] - Provider-independent question
//! - [`Outcome`] - Classification of one adapter call
//! - [`NormalizedResult`] - One adapter's answer
//! - [`MarketSizeResult`] - The orchestrator's answer
//! - [`ProviderOrchestrator`] - Ordered resolution across adapters

pub mod cache;
pub mod errors;
pub mod models;
pub mod provider;
pub mod registry;

// Re-export all public types from models
pub use models::{
    LogicalQuery, MarketSizeResult, NormalizedResult, Outcome, ProviderId, QueryKind, MOCK_SOURCE,
};

// Re-export cache types
pub use cache::{build_cache, CacheConfig, CacheEntry, CachePolicy, OutcomeCache};

// Re-export error types
pub use errors::{CacheError, MarketDataError};

// Re-export provider types
pub use provider::{
    default_adapters, AdapterConfig, AlphaVantageAdapter, BlsAdapter, CensusAdapter, FredAdapter,
    ProviderAdapter, ProviderCapabilities, ProviderCredentials, RateLimit, StaticFallback,
    WorldBankAdapter,
};

// Re-export registry types
pub use registry::{
    AggregateFailure, CircuitBreaker, CircuitState, ProviderAttempt, ProviderOrchestrator,
    RateLimiter, ResolveDiagnostics, ResolveOptions, SkipReason,
};
