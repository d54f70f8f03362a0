//! US Census Bureau adapter (County Business Patterns).
//!
//! Answers `MarketSize` queries for US geographies. CBP has no revenue
//! figure, so annual payroll (`PAYANN`, reported in thousands of USD) is
//! the market-size proxy: `value = PAYANN * 1000`. Establishment and
//! employee counts ride along in the details.
//!
//! Regions: `"us"` for the nation, a 2-digit state FIPS code (`"06"`), or a
//! 5-digit county FIPS code (`"06075"`). Industries: a NAICS code, or one of
//! a few sector names mapped to their NAICS sector.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;
use tracing::debug;

use crate::errors::MarketDataError;
use crate::models::{LogicalQuery, NormalizedResult, QueryKind};
use crate::provider::http::{parse_json, parse_number, HttpClient};
use crate::provider::{AdapterConfig, ProviderAdapter, ProviderCapabilities, RateLimit};

pub const BASE_URL: &str = "https://api.census.gov/data";
pub const API_KEY_VAR: &str = "CENSUS_API_KEY";
pub const DEFAULT_YEAR: u16 = 2021;
const PROVIDER_ID: &str = "CENSUS";
const CONFIDENCE: f64 = 0.9;

const FIELDS: &str = "ESTAB,EMP,PAYANN,NAICS2017_LABEL";

/// Sector names accepted in place of a NAICS code.
const SECTOR_CODES: &[(&str, &str)] = &[
    ("agriculture", "11"),
    ("construction", "23"),
    ("manufacturing", "31-33"),
    ("retail", "44-45"),
    ("information", "51"),
    ("software", "5132"),
    ("finance", "52"),
    ("real estate", "53"),
    ("professional services", "54"),
    ("healthcare", "62"),
    ("hospitality", "72"),
];

/// A CBP geography clause.
#[derive(Debug, PartialEq, Eq)]
enum Geography {
    Nation,
    State(String),
    County { state: String, county: String },
}

impl Geography {
    fn parse(region: &str) -> Option<Self> {
        let region = region.trim().to_lowercase();
        let all_digits = !region.is_empty() && region.chars().all(|c| c.is_ascii_digit());
        match region.as_str() {
            "us" | "usa" | "united states" => Some(Self::Nation),
            r if all_digits && r.len() == 2 => Some(Self::State(r.to_string())),
            r if all_digits && r.len() == 5 => Some(Self::County {
                state: r[..2].to_string(),
                county: r[2..].to_string(),
            }),
            _ => None,
        }
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::Nation => vec![("for", "us:*".to_string())],
            Self::State(state) => vec![("for", format!("state:{}", state))],
            Self::County { state, county } => vec![
                ("for", format!("county:{}", county)),
                ("in", format!("state:{}", state)),
            ],
        }
    }
}

fn naics_code(industry: &str) -> Option<String> {
    let industry = industry.trim().to_lowercase();
    let is_code = (2..=6).contains(&industry.len())
        && industry.chars().all(|c| c.is_ascii_digit() || c == '-');
    if is_code {
        return Some(industry);
    }
    SECTOR_CODES
        .iter()
        .find(|(name, _)| *name == industry)
        .map(|(_, code)| code.to_string())
}

/// Census CBP adapter.
pub struct CensusAdapter {
    http: HttpClient,
    config: AdapterConfig,
    year: u16,
}

impl CensusAdapter {
    pub fn new(config: AdapterConfig) -> Self {
        Self {
            http: HttpClient::new(PROVIDER_ID, &config),
            config,
            year: DEFAULT_YEAR,
        }
    }

    /// Selects the CBP vintage.
    pub fn with_year(mut self, year: u16) -> Self {
        self.year = year;
        self
    }

    /// Reads the first data row of a CBP table.
    fn normalize(
        naics: &str,
        region: &str,
        year: u16,
        body: &str,
    ) -> Result<NormalizedResult, MarketDataError> {
        let table: Vec<Vec<Option<String>>> = parse_json(PROVIDER_ID, body)?;

        let mut rows = table.iter();
        let header = rows
            .next()
            .ok_or_else(|| MarketDataError::parse(PROVIDER_ID, "empty table"))?;
        let row = rows.next().ok_or_else(|| {
            MarketDataError::no_data(
                PROVIDER_ID,
                format!("no CBP rows for NAICS {} in {}", naics, region),
            )
        })?;

        let column = |name: &str| -> Option<&str> {
            let idx = header.iter().position(|h| h.as_deref() == Some(name))?;
            row.get(idx)?.as_deref()
        };

        let payroll_thousands = column("PAYANN")
            .and_then(|v| parse_number(v, &["0", "N"]))
            .ok_or_else(|| {
                MarketDataError::no_data(
                    PROVIDER_ID,
                    format!("payroll not reported for NAICS {} in {}", naics, region),
                )
            })?;

        let details = json!({
            "naics": naics,
            "label": column("NAICS2017_LABEL"),
            "region": region,
            "year": year,
            "establishments": column("ESTAB").and_then(|v| parse_number(v, &[])),
            "employees": column("EMP").and_then(|v| parse_number(v, &[])),
            "annualPayrollThousands": payroll_thousands,
            "metric": "annual_payroll_usd",
        });

        Ok(NormalizedResult::new(
            payroll_thousands * 1000.0,
            PROVIDER_ID,
            details,
            CONFIDENCE,
        ))
    }
}

#[async_trait]
impl ProviderAdapter for CensusAdapter {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            query_kinds: &[QueryKind::MarketSize],
            requires_credential: true,
            confidence: CONFIDENCE,
        }
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit {
            requests_per_minute: 60,
            burst_capacity: 10,
        }
    }

    fn is_available(&self) -> bool {
        self.config.has_api_key()
    }

    fn supports(&self, query: &LogicalQuery) -> bool {
        match query {
            LogicalQuery::MarketSize { industry, region } => {
                naics_code(industry).is_some() && Geography::parse(region).is_some()
            }
            _ => false,
        }
    }

    async fn fetch(&self, query: &LogicalQuery) -> Result<NormalizedResult, MarketDataError> {
        let unsupported = || MarketDataError::UnsupportedQuery {
            provider: PROVIDER_ID.to_string(),
            kind: query.kind(),
        };
        let LogicalQuery::MarketSize { industry, region } = query else {
            return Err(unsupported());
        };
        let naics = naics_code(industry).ok_or_else(unsupported)?;
        let geography = Geography::parse(region).ok_or_else(unsupported)?;
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| MarketDataError::CredentialMissing {
                provider: PROVIDER_ID.to_string(),
            })?;

        let geo_params = geography.params();
        let mut params: Vec<(&str, &str)> = vec![("get", FIELDS), ("NAICS2017", naics.as_str())];
        params.extend(geo_params.iter().map(|(k, v)| (*k, v.as_str())));
        params.push(("key", api_key));

        let url = self
            .http
            .url(&format!("{}/{}/cbp", self.config.base(), self.year), &params)?;
        let response = self.http.get(url).await?;

        // Census answers 204 with an empty body when nothing matches
        if response.status == StatusCode::NO_CONTENT || response.body.trim().is_empty() {
            return Err(MarketDataError::no_data(
                PROVIDER_ID,
                format!("no CBP data for NAICS {} in {}", naics, region),
            ));
        }
        let body = response.into_success_body(PROVIDER_ID)?;

        let result = Self::normalize(&naics, region, self.year, &body)?;
        debug!("Census CBP {} in {}: {}", naics, region, result.value);
        Ok(result)
    }
}
