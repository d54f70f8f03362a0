//! Environment configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use marketlens_market_data::cache::{CacheConfig, CachePolicy, DEFAULT_FALLBACK_TIMEOUT};
use marketlens_market_data::provider::{
    alpha_vantage, bls, census, fred, ProviderCredentials, DEFAULT_REQUEST_TIMEOUT,
};

use crate::constants::DEFAULT_VALIDATION_THRESHOLD;
use crate::errors::ConfigError;
use crate::sizing::{SamFactors, ScenarioRates};
use crate::telemetry::LogFormat;

#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: ProviderCredentials,
    pub cache: CacheConfig,
    pub request_timeout: Duration,
    pub resolve_deadline: Option<Duration>,
    /// Answer `MarketSize` from the static table when every source fails
    pub mock_fallback: bool,
    pub sam_factors: SamFactors,
    pub scenario_rates: ScenarioRates,
    pub validation_threshold: f64,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            credentials: ProviderCredentials::default(),
            cache: CacheConfig::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            resolve_deadline: None,
            mock_fallback: true,
            sam_factors: SamFactors::default(),
            scenario_rates: ScenarioRates::default(),
            validation_threshold: DEFAULT_VALIDATION_THRESHOLD,
            log_format: LogFormat::default(),
        }
    }
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup. Unset and blank keys keep
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let parse = |key: &str| -> Result<Option<f64>, ConfigError> { parse_var(&get, key) };
        let millis = |key: &str| -> Result<Option<u64>, ConfigError> { parse_var(&get, key) };

        let defaults = Self::default();

        let credentials = ProviderCredentials {
            alpha_vantage: get(alpha_vantage::API_KEY_VAR),
            fred: get(fred::API_KEY_VAR),
            bls: get(bls::API_KEY_VAR),
            census: get(census::API_KEY_VAR),
        };

        let default_policy = CachePolicy::default();
        let ttl = |key: &str, fallback: Duration| -> Result<u64, ConfigError> {
            Ok(millis(key)?.unwrap_or(fallback.as_millis() as u64))
        };
        let policy = CachePolicy::from_millis(
            ttl("MARKETLENS_CACHE_SUCCESS_TTL_MS", default_policy.success_ttl)?,
            ttl("MARKETLENS_CACHE_NO_DATA_TTL_MS", default_policy.no_data_ttl)?,
            ttl("MARKETLENS_CACHE_RATE_LIMITED_TTL_MS", default_policy.rate_limited_ttl)?,
        );
        policy.validate().map_err(|e| ConfigError::OutOfRange {
            key: "MARKETLENS_CACHE_*_TTL_MS".to_string(),
            reason: e.to_string(),
        })?;

        let cache = CacheConfig {
            policy,
            persist_path: get("MARKETLENS_CACHE_PATH").map(PathBuf::from),
            redis_url: get("MARKETLENS_REDIS_URL"),
            fallback_timeout: millis("MARKETLENS_REDIS_FALLBACK_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_FALLBACK_TIMEOUT),
        };

        let factors = defaults.sam_factors;
        let sam_factors = SamFactors {
            geographic: parse("MARKETLENS_SAM_GEOGRAPHIC")?.unwrap_or(factors.geographic),
            regulatory: parse("MARKETLENS_SAM_REGULATORY")?.unwrap_or(factors.regulatory),
            competitive: parse("MARKETLENS_SAM_COMPETITIVE")?.unwrap_or(factors.competitive),
            som_fraction: parse("MARKETLENS_SOM_FRACTION")?.unwrap_or(factors.som_fraction),
        };
        sam_factors.validate().map_err(|e| ConfigError::OutOfRange {
            key: "MARKETLENS_SAM_*".to_string(),
            reason: e.to_string(),
        })?;

        let validation_threshold =
            parse("MARKETLENS_VALIDATION_THRESHOLD")?.unwrap_or(defaults.validation_threshold);
        if !(validation_threshold > 0.0 && validation_threshold.is_finite()) {
            return Err(ConfigError::OutOfRange {
                key: "MARKETLENS_VALIDATION_THRESHOLD".to_string(),
                reason: format!("{} must be positive", validation_threshold),
            });
        }

        let mock_fallback = match get("MARKETLENS_MOCK_FALLBACK") {
            None => defaults.mock_fallback,
            Some(v) => parse_bool(&v).ok_or(ConfigError::InvalidValue {
                key: "MARKETLENS_MOCK_FALLBACK".to_string(),
                value: v,
            })?,
        };

        let log_format = match get("MARKETLENS_LOG_FORMAT") {
            Some(v) => v.parse()?,
            None => defaults.log_format,
        };

        Ok(Self {
            credentials,
            cache,
            request_timeout: millis("MARKETLENS_REQUEST_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.request_timeout),
            resolve_deadline: millis("MARKETLENS_RESOLVE_DEADLINE_MS")?.map(Duration::from_millis),
            mock_fallback,
            sam_factors,
            scenario_rates: defaults.scenario_rates,
            validation_threshold,
            log_format,
        })
    }
}

fn parse_var<T, G>(get: &G, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|raw| {
            raw.parse::<T>().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
            })
        })
        .transpose()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.cache.policy, CachePolicy::default());
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.cache.fallback_timeout, Duration::from_millis(250));
        assert!(config.cache.persist_path.is_none());
        assert!(config.resolve_deadline.is_none());
        assert!(config.mock_fallback);
        assert_eq!(config.sam_factors, SamFactors::default());
        assert_eq!(config.validation_threshold, 0.2);
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("FRED_API_KEY", " fred-key "),
            ("CENSUS_API_KEY", ""),
            ("MARKETLENS_CACHE_SUCCESS_TTL_MS", "7200000"),
            ("MARKETLENS_CACHE_PATH", "/tmp/marketlens.json"),
            ("MARKETLENS_RESOLVE_DEADLINE_MS", "5000"),
            ("MARKETLENS_SAM_GEOGRAPHIC", "0.5"),
            ("MARKETLENS_MOCK_FALLBACK", "off"),
            ("MARKETLENS_LOG_FORMAT", "json"),
        ])
        .unwrap();

        assert_eq!(config.credentials.fred.as_deref(), Some("fred-key"));
        assert!(config.credentials.census.is_none());
        assert_eq!(config.cache.policy.success_ttl, Duration::from_secs(7200));
        assert_eq!(
            config.cache.persist_path,
            Some(PathBuf::from("/tmp/marketlens.json"))
        );
        assert_eq!(config.resolve_deadline, Some(Duration::from_secs(5)));
        assert_eq!(config.sam_factors.geographic, 0.5);
        assert!(!config.mock_fallback);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_unparseable_number() {
        let err = config(&[("MARKETLENS_SOM_FRACTION", "ten percent")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: "MARKETLENS_SOM_FRACTION".to_string(),
                value: "ten percent".to_string(),
            }
        );
    }

    #[test]
    fn test_ttl_ordering_is_enforced() {
        let err = config(&[("MARKETLENS_CACHE_RATE_LIMITED_TTL_MS", "600000")]).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { .. }));
    }

    #[test]
    fn test_oversized_ttl_is_rejected() {
        let err = config(&[("MARKETLENS_CACHE_SUCCESS_TTL_MS", "9000000000000000")]).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { .. }));
        assert!(err.to_string().contains("maximum"));
    }

    #[test]
    fn test_factor_out_of_range() {
        let err = config(&[("MARKETLENS_SAM_COMPETITIVE", "1.5")]).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { .. }));
    }
}
