//! Static market-size estimates used when every live source fails.

use serde_json::json;

use crate::models::{LogicalQuery, NormalizedResult, MOCK_SOURCE};

const CONFIDENCE: f64 = 0.3;

/// Rough global market sizes in USD, by industry keyword.
const INDUSTRY_SIZES: &[(&str, f64)] = &[
    ("software", 650e9),
    ("technology", 5.0e12),
    ("healthcare", 9.8e12),
    ("finance", 26.5e12),
    ("retail", 27.3e12),
    ("manufacturing", 16.2e12),
    ("construction", 13.6e12),
    ("energy", 8.5e12),
    ("agriculture", 3.9e12),
    ("education", 7.3e12),
];

/// Fallback for unknown industries.
const DEFAULT_SIZE: f64 = 1.0e12;

/// Answers `MarketSize` queries from a fixed table.
///
/// Results are always labelled `source = "mock"` and carry the reason the
/// live sources failed, so a fabricated number is never mistaken for data.
#[derive(Clone, Debug, Default)]
pub struct StaticFallback;

impl StaticFallback {
    pub fn new() -> Self {
        Self
    }

    /// Estimate for `query`, or `None` when the query shape has no fallback.
    pub fn lookup(&self, query: &LogicalQuery, reason: &str) -> Option<NormalizedResult> {
        let LogicalQuery::MarketSize { industry, region } = query else {
            return None;
        };

        let needle = industry.trim().to_lowercase();
        let (matched, value) = INDUSTRY_SIZES
            .iter()
            .find(|(name, _)| needle.contains(name))
            .map(|(name, size)| (Some(*name), *size))
            .unwrap_or((None, DEFAULT_SIZE));

        let details = json!({
            "industry": industry,
            "region": region,
            "matchedIndustry": matched,
            "fallback_reason": reason,
            "note": "static estimate, not provider data",
        });
        Some(NormalizedResult::new(value, MOCK_SOURCE, details, CONFIDENCE))
    }
}
