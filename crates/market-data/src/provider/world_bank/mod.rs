//! World Bank Open Data adapter.
//!
//! Answers `CountryIndicator` queries directly, and `MarketSize` queries
//! for the industries that map onto a value-added indicator (e.g.
//! manufacturing value added, current USD). No credential is needed.
//!
//! API documentation: https://datahelpdesk.worldbank.org/knowledgebase/articles/889392

mod models;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::errors::MarketDataError;
use crate::models::{LogicalQuery, NormalizedResult, QueryKind};
use crate::provider::http::{parse_json, HttpClient};
use crate::provider::{AdapterConfig, ProviderAdapter, ProviderCapabilities, RateLimit};

use models::split;

pub const BASE_URL: &str = "https://api.worldbank.org/v2";
const PROVIDER_ID: &str = "WORLD_BANK";
const CONFIDENCE: f64 = 0.8;

/// Number of most recent periods requested; the newest non-null one wins.
const RECENT_PERIODS: &str = "5";

/// Industries answerable as market size, by value-added indicator.
const INDUSTRY_INDICATORS: &[(&[&str], &str)] = &[
    (&["manufacturing", "31", "32", "33", "31-33"], "NV.IND.MANF.CD"),
    (&["services"], "NV.SRV.TOTL.CD"),
    (&["agriculture", "11"], "NV.AGR.TOTL.CD"),
    (&["industry"], "NV.IND.TOTL.CD"),
];

fn industry_indicator(industry: &str) -> Option<&'static str> {
    let industry = industry.trim().to_lowercase();
    INDUSTRY_INDICATORS
        .iter()
        .find(|(names, _)| names.contains(&industry.as_str()))
        .map(|(_, indicator)| *indicator)
}

/// ISO 3166 alpha-2/alpha-3 code, or "us" style aliases. FIPS codes are
/// numeric and rejected.
fn country_code(region: &str) -> Option<String> {
    let region = region.trim();
    let valid = (2..=3).contains(&region.len()) && region.chars().all(|c| c.is_ascii_alphabetic());
    valid.then(|| region.to_uppercase())
}

/// World Bank adapter.
pub struct WorldBankAdapter {
    http: HttpClient,
    config: AdapterConfig,
}

impl WorldBankAdapter {
    pub fn new(config: AdapterConfig) -> Self {
        Self {
            http: HttpClient::new(PROVIDER_ID, &config),
            config,
        }
    }

    /// (country, indicator) for a query this adapter can answer.
    fn target(query: &LogicalQuery) -> Option<(String, String)> {
        match query {
            LogicalQuery::CountryIndicator { country, indicator } => {
                let indicator = indicator.trim();
                if indicator.is_empty() {
                    return None;
                }
                Some((country_code(country)?, indicator.to_uppercase()))
            }
            LogicalQuery::MarketSize { industry, region } => Some((
                country_code(region)?,
                industry_indicator(industry)?.to_string(),
            )),
            _ => None,
        }
    }

    fn normalize(
        country: &str,
        indicator: &str,
        body: &str,
    ) -> Result<NormalizedResult, MarketDataError> {
        let payload: Vec<Value> = parse_json(PROVIDER_ID, body)?;
        let (meta, rows) = split(payload).map_err(|e| MarketDataError::parse(PROVIDER_ID, e))?;

        if let Some(messages) = meta.message.filter(|m| !m.is_empty()) {
            let text = messages.iter().map(|m| m.text()).collect::<Vec<_>>().join("; ");
            // "Invalid value" (id 120) is how unknown countries/indicators are reported
            let invalid_value = messages.iter().any(|m| {
                m.id.as_deref() == Some("120")
                    || m.key.as_deref().is_some_and(|k| k.eq_ignore_ascii_case("invalid value"))
            });
            return Err(if invalid_value {
                MarketDataError::no_data(PROVIDER_ID, text)
            } else {
                MarketDataError::provider(PROVIDER_ID, text)
            });
        }

        let row = rows.iter().find(|r| r.value.is_some()).ok_or_else(|| {
            MarketDataError::no_data(
                PROVIDER_ID,
                format!(
                    "no reported value for {} in {} ({} rows)",
                    indicator,
                    country,
                    meta.total.unwrap_or(rows.len() as u64)
                ),
            )
        })?;
        let value = row
            .value
            .filter(|v| v.is_finite())
            .ok_or_else(|| MarketDataError::no_data(PROVIDER_ID, "non-finite value"))?;

        let details = json!({
            "country": row.country.value,
            "countryCode": row.countryiso3code.as_deref().unwrap_or(&row.country.id),
            "indicator": row.indicator.id,
            "indicatorName": row.indicator.value,
            "year": row.date,
            "unit": row.unit,
        });
        Ok(NormalizedResult::new(value, PROVIDER_ID, details, CONFIDENCE))
    }
}

#[async_trait]
impl ProviderAdapter for WorldBankAdapter {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn priority(&self) -> u8 {
        20
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            query_kinds: &[QueryKind::MarketSize, QueryKind::CountryIndicator],
            requires_credential: false,
            confidence: CONFIDENCE,
        }
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit::default()
    }

    fn is_available(&self) -> bool {
        true
    }

    fn supports(&self, query: &LogicalQuery) -> bool {
        Self::target(query).is_some()
    }

    async fn fetch(&self, query: &LogicalQuery) -> Result<NormalizedResult, MarketDataError> {
        let (country, indicator) =
            Self::target(query).ok_or_else(|| MarketDataError::UnsupportedQuery {
                provider: PROVIDER_ID.to_string(),
                kind: query.kind(),
            })?;

        let url = self.http.url(
            &format!(
                "{}/country/{}/indicator/{}",
                self.config.base(),
                country,
                indicator
            ),
            &[("format", "json"), ("mrv", RECENT_PERIODS)],
        )?;
        let body = self.http.get(url).await?.into_success_body(PROVIDER_ID)?;

        let result = Self::normalize(&country, &indicator, &body)?;
        debug!("World Bank {} {} = {}", country, indicator, result.value);
        Ok(result)
    }
}
