use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Provider-independent result of one adapter call.
///
/// Built fresh by an adapter for every successful call and never mutated
/// afterwards; the orchestrator caches it as-is.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedResult {
    /// The numeric answer (USD, persons, index points... depending on query)
    pub value: f64,

    /// Adapter that produced the value
    pub source: String,

    /// Provider-specific context (period, units, raw identifiers)
    pub details: Value,

    /// Adapter confidence in [0, 1]
    pub confidence: f64,
}

impl NormalizedResult {
    pub fn new(value: f64, source: impl Into<String>, details: Value, confidence: f64) -> Self {
        Self {
            value,
            source: source.into(),
            details,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// Orchestrator answer to a logical query.
///
/// `source` always names the adapter that produced `value`, or `"mock"`
/// when the static fallback table answered.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSizeResult {
    pub value: f64,
    pub source: String,
    pub details: Value,
    pub confidence: f64,
    /// True when the value came from a live cache entry
    pub cached: bool,
}

impl MarketSizeResult {
    pub fn from_normalized(result: NormalizedResult, cached: bool) -> Self {
        Self {
            value: result.value,
            source: result.source,
            details: result.details,
            confidence: result.confidence,
            cached,
        }
    }

    pub fn is_mock(&self) -> bool {
        self.source == super::MOCK_SOURCE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_confidence_is_clamped() {
        let r = NormalizedResult::new(1.0, "FRED", json!({}), 1.7);
        assert_eq!(r.confidence, 1.0);
        let r = NormalizedResult::new(1.0, "FRED", json!({}), -0.2);
        assert_eq!(r.confidence, 0.0);
    }

    #[test]
    fn test_market_size_result_keeps_source() {
        let r = NormalizedResult::new(42.0, "CENSUS", json!({"year": 2021}), 0.9);
        let m = MarketSizeResult::from_normalized(r, true);
        assert_eq!(m.source, "CENSUS");
        assert!(m.cached);
        assert!(!m.is_mock());
        assert_eq!(m.details["year"], 2021);
    }
}
