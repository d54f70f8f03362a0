use chrono::Utc;
use log::debug;

use super::{ForecastParams, ForecastPoint, ForecastResult, ScenarioRates};
use crate::constants::{FORECAST_BAND, MAX_PROJECTION_YEARS};
use crate::errors::{CalculatorError, Result};

/// Projects `base_value` forward at the scenario's growth rate, with a
/// symmetric band of `FORECAST_BAND` around every point.
pub fn forecast(params: &ForecastParams, rates: &ScenarioRates) -> Result<ForecastResult> {
    let base = params
        .base_value
        .ok_or(CalculatorError::MissingInput("base_value"))?;
    if !base.is_finite() || base < 0.0 {
        return Err(CalculatorError::invalid(
            "base_value",
            format!("{} is not a non-negative number", base),
        )
        .into());
    }
    if params.years == 0 || params.years > MAX_PROJECTION_YEARS {
        return Err(CalculatorError::invalid(
            "years",
            format!("{} is outside 1..={}", params.years, MAX_PROJECTION_YEARS),
        )
        .into());
    }

    let growth_rate = rates.rate(params.scenario);
    if !growth_rate.is_finite() || growth_rate <= -1.0 {
        return Err(CalculatorError::invalid(
            "growth_rate",
            format!("{} rate {} must be greater than -1", params.scenario, growth_rate),
        )
        .into());
    }

    let mut value = base;
    let points: Vec<ForecastPoint> = (1..=params.years)
        .map(|year| {
            value *= 1.0 + growth_rate;
            ForecastPoint {
                year,
                value,
                lower: value * (1.0 - FORECAST_BAND),
                upper: value * (1.0 + FORECAST_BAND),
            }
        })
        .collect();

    let total_growth = if base > 0.0 { value / base - 1.0 } else { 0.0 };

    debug!(
        "Forecast ({}): {} -> {} over {} years",
        params.scenario, base, value, params.years
    );

    Ok(ForecastResult {
        scenario: params.scenario,
        growth_rate,
        base_value: base,
        points,
        total_growth,
        calculated_at: Utc::now(),
    })
}
