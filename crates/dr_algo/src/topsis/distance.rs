//! Euclidean distances to both ideals and the closeness score d⁻/(d⁺+d⁻).

use std::collections::BTreeMap;

use dr_core::{DistanceResult, IdealSolution, IndicatorMatrix, RegionId};

use crate::AlgoError;

/// Distances over the ideal's indicator set; 0/0 scores stay 0.
pub fn calculate_distances(
    weighted: &IndicatorMatrix,
    ideal: &IdealSolution,
) -> Result<BTreeMap<RegionId, DistanceResult>, AlgoError> {
    distances(weighted, ideal, None)
}

/// Same as [`calculate_distances`] with `default_score` for both-zero distances.
pub fn calculate_distances_with_default(
    weighted: &IndicatorMatrix,
    ideal: &IdealSolution,
    default_score: f64,
) -> Result<BTreeMap<RegionId, DistanceResult>, AlgoError> {
    distances(weighted, ideal, Some(default_score))
}

fn distances(
    weighted: &IndicatorMatrix,
    ideal: &IdealSolution,
    default_score: Option<f64>,
) -> Result<BTreeMap<RegionId, DistanceResult>, AlgoError> {
    let mut out = BTreeMap::new();
    for (region, row) in weighted.rows() {
        let mut pos_sq = 0.0;
        let mut neg_sq = 0.0;
        for (code, best) in &ideal.positive {
            let worst = ideal.negative.get(code).copied().unwrap_or(*best);
            let v = row.get(code).copied().ok_or_else(|| AlgoError::MissingCell {
                region: region.clone(),
                indicator: code.clone(),
            })?;
            pos_sq += (best - v) * (best - v);
            neg_sq += (v - worst) * (v - worst);
        }
        let result = DistanceResult::from_distances(pos_sq.sqrt(), neg_sq.sqrt(), default_score);
        if result.defaulted {
            tracing::warn!(%region, score = result.comprehensive_score, "both distances zero, default score applied");
        }
        out.insert(region.clone(), result);
    }
    Ok(out)
}
