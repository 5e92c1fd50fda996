//! Two-level weighting: normalized × primary(category) × secondary(indicator).
//!
//! No default substitution. A missing weight fails the call; sibling
//! weights are multiplied as given and never renormalized.

use std::collections::BTreeMap;

use dr_core::entities::Column;
use dr_core::{IndicatorCode, IndicatorMatrix, WeightSpec};

use crate::AlgoError;

/// Combined primary × secondary factor for one indicator.
pub fn weight_factor(indicator: &IndicatorCode, weights: &WeightSpec) -> Result<f64, AlgoError> {
    let category = weights
        .category(indicator)
        .ok_or_else(|| AlgoError::MissingCategory { indicator: indicator.clone() })?;
    let primary = weights
        .primary
        .get(category)
        .copied()
        .ok_or_else(|| AlgoError::MissingPrimaryWeight {
            indicator: indicator.clone(),
            category: category.clone(),
        })?;
    let secondary = weights
        .secondary_for(indicator)
        .ok_or_else(|| AlgoError::MissingSecondaryWeight { indicator: indicator.clone() })?;
    Ok(primary * secondary)
}

pub fn apply_weight(
    normalized: f64,
    indicator: &IndicatorCode,
    weights: &WeightSpec,
) -> Result<f64, AlgoError> {
    Ok(normalized * weight_factor(indicator, weights)?)
}

/// Weight every normalized column and return the region-major weighted matrix.
pub fn apply_weights(
    normalized_by_indicator: &BTreeMap<IndicatorCode, Column>,
    weights: &WeightSpec,
) -> Result<IndicatorMatrix, AlgoError> {
    let mut weighted: BTreeMap<IndicatorCode, Column> = BTreeMap::new();
    for (code, column) in normalized_by_indicator {
        let factor = weight_factor(code, weights)?;
        tracing::debug!(indicator = %code, factor, "weighting");
        let col = column.iter().map(|(r, v)| (r.clone(), v * factor)).collect();
        weighted.insert(code.clone(), col);
    }
    Ok(IndicatorMatrix::from_columns(&weighted))
}
