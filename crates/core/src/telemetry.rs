//! Logging bootstrap for binaries embedding MarketLens.

use std::str::FromStr;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::errors::ConfigError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::InvalidValue {
                key: "MARKETLENS_LOG_FORMAT".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Installs the global subscriber. `RUST_LOG` overrides the default
/// `info` filter. Returns false when a subscriber was already installed.
///
/// `log` records from the library crates reach the subscriber through the
/// `tracing-log` bridge that `try_init` sets up.
pub fn init_tracing(format: LogFormat) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(false))
            .try_init(),
        LogFormat::Text => registry.with(fmt::layer()).try_init(),
    };
    installed.is_ok()
}
