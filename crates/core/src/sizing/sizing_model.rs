//! Market sizing domain models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use marketlens_market_data::MarketSizeResult;

use crate::constants::*;
use crate::errors::CalculatorError;

/// Narrows the final TAM to a segment, applied once after compounding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SegmentationAdjustment {
    /// Share of the market kept, in (0, 1]
    pub factor: f64,
    pub rationale: Option<String>,
}

/// Input for the TAM calculator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TamParams {
    pub base_market_size: Option<f64>,
    pub annual_growth_rate: f64,
    pub projection_years: u32,
    pub segmentation_adjustment: Option<SegmentationAdjustment>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct YearProjection {
    /// 1 for the first projected year
    pub year: u32,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TamResult {
    pub base_market_size: f64,
    pub final_tam: f64,
    pub annual_growth_rate: f64,
    /// Compound annual growth rate of the unsegmented projection
    pub cagr: f64,
    pub projection_years: u32,
    pub segmentation_factor: Option<f64>,
    /// Compounded values before segmentation, one per year
    pub projections: Vec<YearProjection>,
    pub assumptions: Vec<String>,
    pub calculated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintType {
    Geographic,
    Regulatory,
    Competitive,
}

impl ConstraintType {
    /// Order in which constraints are applied.
    pub const ORDER: [ConstraintType; 3] = [Self::Geographic, Self::Regulatory, Self::Competitive];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Geographic => "geographic",
            Self::Regulatory => "regulatory",
            Self::Competitive => "competitive",
        }
    }
}

impl fmt::Display for ConstraintType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Constraint categories present for a SAM calculation. Each value is a
/// free-text description recorded in the audit trail.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SamConstraints {
    pub geographic: Option<String>,
    pub regulatory: Option<String>,
    pub competitive: Option<String>,
}

impl SamConstraints {
    pub fn geographic(description: impl Into<String>) -> Self {
        Self {
            geographic: Some(description.into()),
            ..Default::default()
        }
    }

    pub fn get(&self, constraint_type: ConstraintType) -> Option<&str> {
        match constraint_type {
            ConstraintType::Geographic => self.geographic.as_deref(),
            ConstraintType::Regulatory => self.regulatory.as_deref(),
            ConstraintType::Competitive => self.competitive.as_deref(),
        }
    }
}

/// Reduction factors for SAM and the SOM fraction.
///
/// The defaults are illustrative, not empirical; override them per market.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SamFactors {
    pub geographic: f64,
    pub regulatory: f64,
    pub competitive: f64,
    pub som_fraction: f64,
}

impl Default for SamFactors {
    fn default() -> Self {
        Self {
            geographic: DEFAULT_GEOGRAPHIC_FACTOR,
            regulatory: DEFAULT_REGULATORY_FACTOR,
            competitive: DEFAULT_COMPETITIVE_FACTOR,
            som_fraction: DEFAULT_SOM_FRACTION,
        }
    }
}

impl SamFactors {
    pub fn factor(&self, constraint_type: ConstraintType) -> f64 {
        match constraint_type {
            ConstraintType::Geographic => self.geographic,
            ConstraintType::Regulatory => self.regulatory,
            ConstraintType::Competitive => self.competitive,
        }
    }

    /// Every factor must lie in (0, 1].
    pub fn validate(&self) -> Result<(), CalculatorError> {
        let checks = [
            ("geographic_factor", self.geographic),
            ("regulatory_factor", self.regulatory),
            ("competitive_factor", self.competitive),
            ("som_fraction", self.som_fraction),
        ];
        for (field, value) in checks {
            if !(value > 0.0 && value <= 1.0) {
                return Err(CalculatorError::invalid(
                    field,
                    format!("{} is outside (0, 1]", value),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SamParams {
    pub tam: Option<f64>,
    #[serde(default)]
    pub constraints: SamConstraints,
}

/// One constraint applied during a SAM calculation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppliedConstraint {
    pub constraint_type: ConstraintType,
    pub impact_factor: f64,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SamResult {
    pub tam: f64,
    pub sam: f64,
    pub som: f64,
    pub constraints_applied: Vec<AppliedConstraint>,
    pub sam_to_tam_ratio: f64,
    pub calculated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    Conservative,
    Optimistic,
    Pessimistic,
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conservative => write!(f, "conservative"),
            Self::Optimistic => write!(f, "optimistic"),
            Self::Pessimistic => write!(f, "pessimistic"),
        }
    }
}

impl FromStr for Scenario {
    type Err = CalculatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "conservative" => Ok(Self::Conservative),
            "optimistic" => Ok(Self::Optimistic),
            "pessimistic" => Ok(Self::Pessimistic),
            other => Err(CalculatorError::invalid(
                "scenario",
                format!("unknown scenario '{}'", other),
            )),
        }
    }
}

/// Annual growth rate used for each scenario.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioRates {
    pub conservative: f64,
    pub optimistic: f64,
    pub pessimistic: f64,
}

impl Default for ScenarioRates {
    fn default() -> Self {
        Self {
            conservative: CONSERVATIVE_GROWTH_RATE,
            optimistic: OPTIMISTIC_GROWTH_RATE,
            pessimistic: PESSIMISTIC_GROWTH_RATE,
        }
    }
}

impl ScenarioRates {
    pub fn rate(&self, scenario: Scenario) -> f64 {
        match scenario {
            Scenario::Conservative => self.conservative,
            Scenario::Optimistic => self.optimistic,
            Scenario::Pessimistic => self.pessimistic,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ForecastParams {
    pub base_value: Option<f64>,
    pub scenario: Scenario,
    pub years: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPoint {
    pub year: u32,
    pub value: f64,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ForecastResult {
    pub scenario: Scenario,
    pub growth_rate: f64,
    pub base_value: f64,
    pub points: Vec<ForecastPoint>,
    /// Final value over base value, minus one
    pub total_growth: f64,
    pub calculated_at: DateTime<Utc>,
}

/// Comparison of a candidate value against an independent reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub candidate: f64,
    pub reference: f64,
    /// `|candidate - reference| / reference`
    pub variance: f64,
    pub threshold: f64,
    pub is_valid: bool,
    /// `max(0, 1 - variance)`
    pub confidence: f64,
}

/// One independent estimate of the same quantity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Estimate {
    pub source: String,
    pub value: f64,
}

impl Estimate {
    pub fn new(source: impl Into<String>, value: f64) -> Self {
        Self {
            source: source.into(),
            value,
        }
    }
}

/// Agreement across several estimates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusReport {
    pub estimates: Vec<Estimate>,
    pub mean: f64,
    pub std_dev: f64,
    pub coefficient_of_variation: f64,
    pub min: f64,
    pub max: f64,
    pub threshold: f64,
    /// True when the coefficient of variation is below the threshold
    pub consensus: bool,
}

/// Input for a one-call resolve, TAM and SAM pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SizeMarketRequest {
    pub industry: String,
    pub region: String,
    pub annual_growth_rate: f64,
    pub projection_years: u32,
    pub segmentation_adjustment: Option<SegmentationAdjustment>,
    #[serde(default)]
    pub constraints: SamConstraints,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MarketSizingReport {
    /// Resolved base market size
    pub market: MarketSizeResult,
    pub tam: TamResult,
    pub sam: SamResult,
}

/// A value resolved twice from different sources and compared.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CrossValidation {
    pub primary: MarketSizeResult,
    pub reference: MarketSizeResult,
    pub validation: ValidationResult,
}
