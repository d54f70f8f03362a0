//! FRED (Federal Reserve Economic Data) adapter.
//!
//! Answers `EconomicSeries` queries with the latest observation of a
//! series, via `series/observations?sort_order=desc&limit=1`.
//!
//! API documentation: https://fred.stlouisfed.org/docs/api/fred/

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::errors::MarketDataError;
use crate::models::{LogicalQuery, NormalizedResult, QueryKind};
use crate::provider::http::{parse_json, parse_number, HttpClient};
use crate::provider::{AdapterConfig, ProviderAdapter, ProviderCapabilities, RateLimit};

pub const BASE_URL: &str = "https://api.stlouisfed.org/fred";
pub const API_KEY_VAR: &str = "FRED_API_KEY";
const PROVIDER_ID: &str = "FRED";
const CONFIDENCE: f64 = 0.95;

/// FRED's marker for a missing observation.
const MISSING_VALUE: &str = ".";

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    #[serde(default)]
    units: Option<String>,
    #[serde(default)]
    observations: Vec<Observation>,
}

#[derive(Debug, Deserialize)]
struct Observation {
    date: String,
    value: String,
}

/// Error envelope, sent with 4xx statuses.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error_code: u16,
    error_message: String,
}

/// FRED adapter.
pub struct FredAdapter {
    http: HttpClient,
    config: AdapterConfig,
}

impl FredAdapter {
    pub fn new(config: AdapterConfig) -> Self {
        Self {
            http: HttpClient::new(PROVIDER_ID, &config),
            config,
        }
    }

    /// Classifies a FRED error envelope.
    fn classify_error(series_id: &str, error: ErrorResponse) -> MarketDataError {
        if error.error_code == StatusCode::TOO_MANY_REQUESTS.as_u16() {
            return MarketDataError::rate_limited(PROVIDER_ID);
        }
        if error.error_code == 400 && error.error_message.contains("does not exist") {
            return MarketDataError::no_data(
                PROVIDER_ID,
                format!("series '{}' does not exist", series_id),
            );
        }
        MarketDataError::provider(
            PROVIDER_ID,
            format!("{}: {}", error.error_code, error.error_message),
        )
    }

    fn normalize(series_id: &str, body: &str) -> Result<NormalizedResult, MarketDataError> {
        let response: ObservationsResponse = parse_json(PROVIDER_ID, body)?;

        let observation = response.observations.first().ok_or_else(|| {
            MarketDataError::no_data(
                PROVIDER_ID,
                format!("no observations for '{}'", series_id),
            )
        })?;

        let value = parse_number(&observation.value, &[MISSING_VALUE]).ok_or_else(|| {
            MarketDataError::no_data(
                PROVIDER_ID,
                format!(
                    "'{}' has no value on {} ('{}')",
                    series_id, observation.date, observation.value
                ),
            )
        })?;

        let details = json!({
            "seriesId": series_id,
            "date": observation.date,
            "units": response.units,
        });
        Ok(NormalizedResult::new(value, PROVIDER_ID, details, CONFIDENCE))
    }
}

#[async_trait]
impl ProviderAdapter for FredAdapter {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn priority(&self) -> u8 {
        5
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            query_kinds: &[QueryKind::EconomicSeries],
            requires_credential: true,
            confidence: CONFIDENCE,
        }
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit {
            requests_per_minute: 120,
            burst_capacity: 20,
        }
    }

    fn is_available(&self) -> bool {
        self.config.has_api_key()
    }

    async fn fetch(&self, query: &LogicalQuery) -> Result<NormalizedResult, MarketDataError> {
        let LogicalQuery::EconomicSeries { series_id } = query else {
            return Err(MarketDataError::UnsupportedQuery {
                provider: PROVIDER_ID.to_string(),
                kind: query.kind(),
            });
        };
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| MarketDataError::CredentialMissing {
                provider: PROVIDER_ID.to_string(),
            })?;

        let series_id = series_id.trim().to_uppercase();
        let url = self.http.url(
            &format!("{}/series/observations", self.config.base()),
            &[
                ("series_id", series_id.as_str()),
                ("api_key", api_key),
                ("file_type", "json"),
                ("sort_order", "desc"),
                ("limit", "1"),
            ],
        )?;

        let response = self.http.get(url).await?;
        if !response.status.is_success() {
            // FRED explains 4xx responses in a JSON envelope
            return match serde_json::from_str::<ErrorResponse>(&response.body) {
                Ok(error) => Err(Self::classify_error(&series_id, error)),
                Err(_) => Err(MarketDataError::provider(
                    PROVIDER_ID,
                    format!("HTTP {}", response.status),
                )),
            };
        }

        let result = Self::normalize(&series_id, &response.body)?;
        debug!("FRED {} = {}", series_id, result.value);
        Ok(result)
    }
}
