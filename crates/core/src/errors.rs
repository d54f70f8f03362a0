//! Core error types for MarketLens.
//!
//! Provider failures arrive as [`MarketDataError`] from the market data
//! crate. Calculator and configuration errors are input problems and are
//! returned to the caller as-is.

use thiserror::Error;

pub use marketlens_market_data::errors::{CacheError, MarketDataError};

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the sizing service.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Market data operation failed: {0}")]
    MarketData(#[from] MarketDataError),

    #[error("Calculation failed: {0}")]
    Calculation(#[from] CalculatorError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Cache setup failed: {0}")]
    Cache(#[from] CacheError),

    #[error("Cannot cross-validate: {0}")]
    CrossValidation(String),
}

/// Invalid calculator input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalculatorError {
    #[error("Missing input: {0}")]
    MissingInput(&'static str),

    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },
}

impl CalculatorError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.into(),
        }
    }
}

/// Errors reading configuration from the environment.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{key}: cannot parse '{value}'")]
    InvalidValue { key: String, value: String },

    #[error("{key}: {reason}")]
    OutOfRange { key: String, reason: String },
}
