use chrono::Utc;
use log::debug;

use super::{AppliedConstraint, ConstraintType, SamFactors, SamParams, SamResult};
use crate::errors::{CalculatorError, Result};

/// Narrows a TAM to the serviceable market.
///
/// Present constraints multiply the running value by their factor in the
/// order geographic, regulatory, competitive. SOM is `sam * som_fraction`.
pub fn calculate_sam(params: &SamParams, factors: &SamFactors) -> Result<SamResult> {
    let tam = params.tam.ok_or(CalculatorError::MissingInput("tam"))?;
    if !tam.is_finite() || tam < 0.0 {
        let reason = format!("{} is not a non-negative number", tam);
        return Err(CalculatorError::invalid("tam", reason).into());
    }
    factors.validate()?;

    let mut sam = tam;
    let mut constraints_applied = Vec::new();
    for constraint_type in ConstraintType::ORDER {
        let Some(description) = params.constraints.get(constraint_type) else {
            continue;
        };
        let impact_factor = factors.factor(constraint_type);
        sam *= impact_factor;

        let description = match description.trim() {
            "" => format!("{} constraint", constraint_type),
            text => text.to_string(),
        };
        constraints_applied.push(AppliedConstraint {
            constraint_type,
            impact_factor,
            description,
        });
    }

    let sam_to_tam_ratio = constraints_applied
        .iter()
        .map(|c| c.impact_factor)
        .product::<f64>();
    let som = sam * factors.som_fraction;

    debug!(
        "SAM: {} -> {} after {} constraint(s), SOM {}",
        tam,
        sam,
        constraints_applied.len(),
        som
    );

    Ok(SamResult {
        tam,
        sam,
        som,
        constraints_applied,
        sam_to_tam_ratio,
        calculated_at: Utc::now(),
    })
}
