use chrono::Utc;
use log::debug;

use super::{TamParams, TamResult, YearProjection};
use crate::constants::MAX_PROJECTION_YEARS;
use crate::errors::{CalculatorError, Result};

/// Projects a total addressable market.
///
/// Growth compounds year by year from `base_market_size`. The segmentation
/// factor, if any, is applied once to the final compounded value; the
/// per-year projections are left unsegmented.
pub fn calculate_tam(params: &TamParams) -> Result<TamResult> {
    let base = params
        .base_market_size
        .ok_or(CalculatorError::MissingInput("base_market_size"))?;
    if !base.is_finite() || base < 0.0 {
        return Err(CalculatorError::invalid(
            "base_market_size",
            format!("{} is not a non-negative number", base),
        )
        .into());
    }

    let rate = params.annual_growth_rate;
    if !rate.is_finite() || rate <= -1.0 {
        return Err(CalculatorError::invalid(
            "annual_growth_rate",
            format!("{} must be greater than -1", rate),
        )
        .into());
    }

    let years = params.projection_years;
    if years == 0 || years > MAX_PROJECTION_YEARS {
        return Err(CalculatorError::invalid(
            "projection_years",
            format!("{} is outside 1..={}", years, MAX_PROJECTION_YEARS),
        )
        .into());
    }

    let segmentation = params.segmentation_adjustment.as_ref();
    if let Some(adjustment) = segmentation {
        let factor = adjustment.factor;
        if !(factor > 0.0 && factor <= 1.0) {
            return Err(CalculatorError::invalid(
                "segmentation_factor",
                format!("{} is outside (0, 1]", factor),
            )
            .into());
        }
    }

    let mut size = base;
    let mut projections = Vec::with_capacity(years as usize);
    for year in 1..=years {
        size *= 1.0 + rate;
        projections.push(YearProjection { year, value: size });
    }

    let final_tam = segmentation.map_or(size, |adjustment| size * adjustment.factor);

    let mut assumptions = vec![
        format!("Base market size of {:.0}", base),
        format!(
            "Annual growth rate of {:.2}% compounded over {} years",
            rate * 100.0,
            years
        ),
    ];
    if let Some(adjustment) = segmentation {
        let mut line = format!(
            "Segmentation factor of {} applied to the final year",
            adjustment.factor
        );
        if let Some(rationale) = adjustment.rationale.as_deref().filter(|r| !r.trim().is_empty()) {
            line.push_str(&format!(": {}", rationale.trim()));
        }
        assumptions.push(line);
    }

    debug!(
        "TAM: base {} at {} over {} years -> {}",
        base, rate, years, final_tam
    );

    Ok(TamResult {
        base_market_size: base,
        final_tam,
        annual_growth_rate: rate,
        cagr: rate,
        projection_years: years,
        segmentation_factor: segmentation.map(|a| a.factor),
        projections,
        assumptions,
        calculated_at: Utc::now(),
    })
}
