use log::debug;

use super::{ConsensusReport, Estimate, ValidationResult};
use crate::errors::{CalculatorError, Result};

fn check_threshold(threshold: f64) -> Result<()> {
    if !threshold.is_finite() || threshold <= 0.0 {
        return Err(CalculatorError::invalid(
            "threshold",
            format!("{} must be a positive number", threshold),
        )
        .into());
    }
    Ok(())
}

/// Compares `candidate` with an independently obtained `reference`.
///
/// `variance = |candidate - reference| / |reference|`, valid when below
/// `threshold`.
pub fn validate_estimate(
    candidate: f64,
    reference: f64,
    threshold: f64,
) -> Result<ValidationResult> {
    if !candidate.is_finite() {
        return Err(
            CalculatorError::invalid("candidate", format!("{} is not finite", candidate)).into(),
        );
    }
    if !reference.is_finite() || reference == 0.0 {
        return Err(CalculatorError::invalid(
            "reference",
            format!("{} must be finite and non-zero", reference),
        )
        .into());
    }
    check_threshold(threshold)?;

    let variance = (candidate - reference).abs() / reference.abs();
    let result = ValidationResult {
        candidate,
        reference,
        variance,
        threshold,
        is_valid: variance < threshold,
        confidence: (1.0 - variance).max(0.0),
    };
    debug!(
        "Validation: {} vs {} -> variance {:.4} ({})",
        candidate,
        reference,
        variance,
        if result.is_valid { "valid" } else { "invalid" }
    );
    Ok(result)
}

/// Scores several independent estimates against their mean.
///
/// Consensus holds when the coefficient of variation (population standard
/// deviation over mean) is below `threshold`.
pub fn validate_many(estimates: &[Estimate], threshold: f64) -> Result<ConsensusReport> {
    if estimates.len() < 2 {
        return Err(CalculatorError::invalid(
            "estimates",
            format!("need at least two, got {}", estimates.len()),
        )
        .into());
    }
    if let Some(bad) = estimates.iter().find(|e| !e.value.is_finite()) {
        return Err(CalculatorError::invalid(
            "estimates",
            format!("'{}' is not finite", bad.source),
        )
        .into());
    }
    check_threshold(threshold)?;

    let count = estimates.len() as f64;
    let mean = estimates.iter().map(|e| e.value).sum::<f64>() / count;
    if mean <= 0.0 {
        return Err(CalculatorError::invalid("estimates", "mean must be positive").into());
    }

    let std_dev = (estimates
        .iter()
        .map(|e| (e.value - mean).powi(2))
        .sum::<f64>()
        / count)
        .sqrt();
    let coefficient_of_variation = std_dev / mean;

    let min = estimates.iter().map(|e| e.value).fold(f64::INFINITY, f64::min);
    let max = estimates
        .iter()
        .map(|e| e.value)
        .fold(f64::NEG_INFINITY, f64::max);

    Ok(ConsensusReport {
        estimates: estimates.to_vec(),
        mean,
        std_dev,
        coefficient_of_variation,
        min,
        max,
        threshold,
        consensus: coefficient_of_variation < threshold,
    })
}
