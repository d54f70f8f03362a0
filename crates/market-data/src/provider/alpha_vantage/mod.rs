//! Alpha Vantage company fundamentals adapter.
//!
//! Answers `CompanyFinancials` queries from the OVERVIEW endpoint. The
//! value is the company's market capitalization in its reporting currency.
//!
//! Note: Alpha Vantage free tier is limited to 5 API calls per minute, and
//! signals exhaustion with a `Note` or `Information` body on HTTP 200.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::errors::MarketDataError;
use crate::models::{LogicalQuery, NormalizedResult, QueryKind};
use crate::provider::http::{parse_json, parse_number, HttpClient};
use crate::provider::{AdapterConfig, ProviderAdapter, ProviderCapabilities, RateLimit};

pub const BASE_URL: &str = "https://www.alphavantage.co/query";
pub const API_KEY_VAR: &str = "ALPHA_VANTAGE_API_KEY";
const PROVIDER_ID: &str = "ALPHA_VANTAGE";
const CONFIDENCE: f64 = 0.9;

/// Values Alpha Vantage uses for "not reported".
const SENTINELS: &[&str] = &["None", "-", "0"];

/// OVERVIEW response. The API returns many more fields; only those used
/// for the result details are mapped.
#[derive(Debug, Default, Deserialize)]
struct CompanyOverviewResponse {
    #[serde(rename = "Symbol")]
    symbol: Option<String>,
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "Sector")]
    sector: Option<String>,
    #[serde(rename = "Industry")]
    industry: Option<String>,
    #[serde(rename = "Currency")]
    currency: Option<String>,
    #[serde(rename = "MarketCapitalization")]
    market_capitalization: Option<String>,
    #[serde(rename = "RevenueTTM")]
    revenue_ttm: Option<String>,
    #[serde(rename = "PERatio")]
    pe_ratio: Option<String>,
    #[serde(rename = "LatestQuarter")]
    latest_quarter: Option<String>,

    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

impl CompanyOverviewResponse {
    fn number(field: &Option<String>) -> Option<f64> {
        field.as_deref().and_then(|v| parse_number(v, SENTINELS))
    }

    fn is_empty(&self) -> bool {
        self.symbol.is_none()
            && self.market_capitalization.is_none()
            && self.error_message.is_none()
            && self.note.is_none()
            && self.information.is_none()
    }
}

/// Alpha Vantage adapter.
pub struct AlphaVantageAdapter {
    http: HttpClient,
    config: AdapterConfig,
}

impl AlphaVantageAdapter {
    pub fn new(config: AdapterConfig) -> Self {
        Self {
            http: HttpClient::new(PROVIDER_ID, &config),
            config,
        }
    }

    fn is_rate_limit_message(msg: &str) -> bool {
        let lower = msg.to_lowercase();
        lower.contains("call frequency") || lower.contains("rate limit")
    }

    /// Maps the envelope fields Alpha Vantage uses for errors and throttling.
    fn check_api_error(
        response: &CompanyOverviewResponse,
        symbol: &str,
    ) -> Result<(), MarketDataError> {
        if let Some(msg) = &response.error_message {
            // Unknown symbols come back as "Invalid API call"
            if msg.contains("Invalid API call") {
                return Err(MarketDataError::no_data(
                    PROVIDER_ID,
                    format!("unknown symbol '{}'", symbol),
                ));
            }
            return Err(MarketDataError::provider(PROVIDER_ID, msg.clone()));
        }

        for msg in [&response.note, &response.information].into_iter().flatten() {
            if Self::is_rate_limit_message(msg) {
                return Err(MarketDataError::rate_limited(PROVIDER_ID));
            }
        }

        if let Some(msg) = &response.information {
            warn!("Alpha Vantage info: {}", msg);
            return Err(MarketDataError::provider(PROVIDER_ID, msg.clone()));
        }

        Ok(())
    }

    fn normalize(symbol: &str, body: &str) -> Result<NormalizedResult, MarketDataError> {
        let response: CompanyOverviewResponse = parse_json(PROVIDER_ID, body)?;

        if response.is_empty() {
            return Err(MarketDataError::no_data(
                PROVIDER_ID,
                format!("no overview for '{}'", symbol),
            ));
        }
        Self::check_api_error(&response, symbol)?;

        let market_cap = CompanyOverviewResponse::number(&response.market_capitalization)
            .ok_or_else(|| {
                MarketDataError::no_data(
                    PROVIDER_ID,
                    format!("no market capitalization for '{}'", symbol),
                )
            })?;

        let details = json!({
            "symbol": response.symbol.as_deref().unwrap_or(symbol),
            "name": response.name,
            "sector": response.sector,
            "industry": response.industry,
            "currency": response.currency,
            "revenueTtm": CompanyOverviewResponse::number(&response.revenue_ttm),
            "peRatio": CompanyOverviewResponse::number(&response.pe_ratio),
            "latestQuarter": response.latest_quarter,
            "metric": "market_capitalization",
        });

        Ok(NormalizedResult::new(market_cap, PROVIDER_ID, details, CONFIDENCE))
    }
}

#[async_trait]
impl ProviderAdapter for AlphaVantageAdapter {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            query_kinds: &[QueryKind::CompanyFinancials],
            requires_credential: true,
            confidence: CONFIDENCE,
        }
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit {
            requests_per_minute: 5,
            burst_capacity: 5,
        }
    }

    fn is_available(&self) -> bool {
        self.config.has_api_key()
    }

    async fn fetch(&self, query: &LogicalQuery) -> Result<NormalizedResult, MarketDataError> {
        let LogicalQuery::CompanyFinancials { symbol } = query else {
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

        let symbol = symbol.trim().to_uppercase();
        let url = self.http.url(
            self.config.base(),
            &[("function", "OVERVIEW"), ("symbol", &symbol), ("apikey", api_key)],
        )?;
        let body = self.http.get(url).await?.into_success_body(PROVIDER_ID)?;

        let result = Self::normalize(&symbol, &body)?;
        debug!("Alpha Vantage market cap for {}: {}", symbol, result.value);
        Ok(result)
    }
}
