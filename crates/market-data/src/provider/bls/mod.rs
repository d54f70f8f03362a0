//! Bureau of Labor Statistics adapter.
//!
//! Answers `IndustryEmployment` queries with the latest value of a BLS
//! time series (e.g. `CES5000000001`, information sector employment).
//! The public API works without a registration key at lower daily limits,
//! so this adapter is always available; a key is sent when configured.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::errors::MarketDataError;
use crate::models::{LogicalQuery, NormalizedResult, QueryKind};
use crate::provider::http::{parse_json, parse_number, HttpClient};
use crate::provider::{AdapterConfig, ProviderAdapter, ProviderCapabilities, RateLimit};

pub const BASE_URL: &str = "https://api.bls.gov/publicAPI/v2";
pub const API_KEY_VAR: &str = "BLS_API_KEY";
const PROVIDER_ID: &str = "BLS";
const CONFIDENCE: f64 = 0.95;

const STATUS_SUCCEEDED: &str = "REQUEST_SUCCEEDED";
const STATUS_NOT_PROCESSED: &str = "REQUEST_NOT_PROCESSED";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimeseriesResponse {
    status: String,
    #[serde(default)]
    message: Vec<String>,
    #[serde(rename = "Results")]
    results: Option<TimeseriesResults>,
}

#[derive(Debug, Deserialize)]
struct TimeseriesResults {
    #[serde(default)]
    series: Vec<Series>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Series {
    #[serde(rename = "seriesID")]
    series_id: String,
    #[serde(default)]
    data: Vec<DataPoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataPoint {
    year: String,
    period: String,
    #[serde(default)]
    period_name: Option<String>,
    value: String,
}

/// BLS adapter.
pub struct BlsAdapter {
    http: HttpClient,
    config: AdapterConfig,
}

impl BlsAdapter {
    pub fn new(config: AdapterConfig) -> Self {
        Self {
            http: HttpClient::new(PROVIDER_ID, &config),
            config,
        }
    }

    fn normalize(series_id: &str, body: &str) -> Result<NormalizedResult, MarketDataError> {
        let response: TimeseriesResponse = parse_json(PROVIDER_ID, body)?;

        if response.status == STATUS_NOT_PROCESSED {
            if response
                .message
                .iter()
                .any(|m| m.to_lowercase().contains("threshold"))
            {
                return Err(MarketDataError::rate_limited(PROVIDER_ID));
            }
            return Err(MarketDataError::provider(
                PROVIDER_ID,
                response.message.join("; "),
            ));
        }
        if response.status != STATUS_SUCCEEDED {
            warn!("BLS returned status {}: {:?}", response.status, response.message);
        }

        // BLS returns the series with an empty data array for unknown ids
        let point = response
            .results
            .as_ref()
            .and_then(|r| r.series.iter().find(|s| s.series_id.eq_ignore_ascii_case(series_id)))
            .and_then(|s| s.data.first())
            .ok_or_else(|| {
                let reason = response
                    .message
                    .first()
                    .cloned()
                    .unwrap_or_else(|| format!("no data for series '{}'", series_id));
                MarketDataError::no_data(PROVIDER_ID, reason)
            })?;

        let value = parse_number(&point.value, &["-"]).ok_or_else(|| {
            MarketDataError::no_data(
                PROVIDER_ID,
                format!("'{}' not reported for {} {}", series_id, point.period, point.year),
            )
        })?;

        let details = json!({
            "seriesId": series_id,
            "year": point.year,
            "period": point.period,
            "periodName": point.period_name,
        });
        Ok(NormalizedResult::new(value, PROVIDER_ID, details, CONFIDENCE))
    }
}

#[async_trait]
impl ProviderAdapter for BlsAdapter {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            query_kinds: &[QueryKind::IndustryEmployment],
            requires_credential: false,
            confidence: CONFIDENCE,
        }
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit {
            requests_per_minute: 30,
            burst_capacity: 10,
        }
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn fetch(&self, query: &LogicalQuery) -> Result<NormalizedResult, MarketDataError> {
        let LogicalQuery::IndustryEmployment { series_id } = query else {
            return Err(MarketDataError::UnsupportedQuery {
                provider: PROVIDER_ID.to_string(),
                kind: query.kind(),
            });
        };

        let series_id = series_id.trim().to_uppercase();
        let base = format!("{}/timeseries/data/{}", self.config.base(), series_id);
        let mut params: Vec<(&str, &str)> = Vec::new();
        if let Some(key) = self.config.api_key.as_deref() {
            params.push(("registrationkey", key));
        }
        let url = self.http.url(&base, &params)?;
        let body = self.http.get(url).await?.into_success_body(PROVIDER_ID)?;

        let result = Self::normalize(&series_id, &body)?;
        debug!("BLS {} = {}", series_id, result.value);
        Ok(result)
    }
}
