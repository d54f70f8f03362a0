use std::fmt;

use serde::{Deserialize, Serialize};

/// Discriminant of a [`LogicalQuery`].
///
/// Adapters declare the kinds they can serve; the orchestrator uses the kind
/// to pick the candidate adapters for a query.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    MarketSize,
    EconomicSeries,
    IndustryEmployment,
    CompanyFinancials,
    CountryIndicator,
}

impl QueryKind {
    pub const ALL: [QueryKind; 5] = [
        QueryKind::MarketSize,
        QueryKind::EconomicSeries,
        QueryKind::IndustryEmployment,
        QueryKind::CompanyFinancials,
        QueryKind::CountryIndicator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MarketSize => "market_size",
            Self::EconomicSeries => "economic_series",
            Self::IndustryEmployment => "industry_employment",
            Self::CompanyFinancials => "company_financials",
            Self::CountryIndicator => "country_indicator",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A provider-independent question, e.g. "market size for software in the US".
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogicalQuery {
    /// Size of an industry in a region. `industry` is a NAICS code or a
    /// common industry name, `region` a US state FIPS code, `"us"`, or an
    /// ISO country code.
    MarketSize { industry: String, region: String },

    /// Latest observation of a central-bank / macro series (e.g. "GDP").
    EconomicSeries { series_id: String },

    /// Latest value of a labor statistics series (e.g. "CES5000000001").
    IndustryEmployment { series_id: String },

    /// Company fundamentals; the value is the market capitalization.
    CompanyFinancials { symbol: String },

    /// International development indicator for a country.
    CountryIndicator { country: String, indicator: String },
}

impl LogicalQuery {
    pub fn market_size(industry: impl Into<String>, region: impl Into<String>) -> Self {
        Self::MarketSize {
            industry: industry.into(),
            region: region.into(),
        }
    }

    pub fn economic_series(series_id: impl Into<String>) -> Self {
        Self::EconomicSeries {
            series_id: series_id.into(),
        }
    }

    pub fn industry_employment(series_id: impl Into<String>) -> Self {
        Self::IndustryEmployment {
            series_id: series_id.into(),
        }
    }

    pub fn company_financials(symbol: impl Into<String>) -> Self {
        Self::CompanyFinancials {
            symbol: symbol.into(),
        }
    }

    pub fn country_indicator(country: impl Into<String>, indicator: impl Into<String>) -> Self {
        Self::CountryIndicator {
            country: country.into(),
            indicator: indicator.into(),
        }
    }

    pub fn kind(&self) -> QueryKind {
        match self {
            Self::MarketSize { .. } => QueryKind::MarketSize,
            Self::EconomicSeries { .. } => QueryKind::EconomicSeries,
            Self::IndustryEmployment { .. } => QueryKind::IndustryEmployment,
            Self::CompanyFinancials { .. } => QueryKind::CompanyFinancials,
            Self::CountryIndicator { .. } => QueryKind::CountryIndicator,
        }
    }

    /// Query parameters in a fixed order, trimmed and lower-cased.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let norm = |s: &str| s.trim().to_lowercase();
        match self {
            Self::MarketSize { industry, region } => {
                vec![("industry", norm(industry)), ("region", norm(region))]
            }
            Self::EconomicSeries { series_id } | Self::IndustryEmployment { series_id } => {
                vec![("series_id", norm(series_id))]
            }
            Self::CompanyFinancials { symbol } => vec![("symbol", norm(symbol))],
            Self::CountryIndicator { country, indicator } => {
                vec![("country", norm(country)), ("indicator", norm(indicator))]
            }
        }
    }

    /// Cache key for this query as answered by `provider`.
    ///
    /// Format: `<provider>:<kind>:<md5 of canonical params>`. The provider
    /// prefix lets callers drop everything one adapter cached with a single
    /// prefix invalidation.
    pub fn cache_key(&self, provider: &str) -> String {
        let canonical = self
            .params()
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        format!(
            "{}:{}:{:x}",
            provider.to_lowercase(),
            self.kind(),
            md5::compute(canonical.as_bytes())
        )
    }
}

impl fmt::Display for LogicalQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self
            .params()
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{}({})", self.kind(), params)
    }
}
