//! MarketLens Core - Market sizing calculators and the sizing service.
//!
//! This crate turns data resolved by `marketlens-market-data` into derived
//! market metrics (TAM, SAM/SOM, scenario forecasts, cross-source
//! validation). It also owns configuration and logging setup.

pub mod config;
pub mod constants;
pub mod errors;
pub mod sizing;
pub mod telemetry;

pub use config::Config;
pub use sizing::*;

// Re-export error types
pub use errors::Error;
pub use errors::Result;

// Re-export the data layer for consumers that only depend on core
pub use marketlens_market_data as market_data;
