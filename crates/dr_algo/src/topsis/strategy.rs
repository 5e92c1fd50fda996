//! Calculator strategies behind one trait, selected by an explicit
//! [`Strategy`] parameter.
//!
//! - `legacy`: ideals over the cohort, strict distances, default score for 0/0.
//! - `unified`: skips non-finite or absent cells, and for a one-region cohort
//!   (when enabled) builds theoretical ideals value·(1 ± baseline_ratio).
//!
//! On clean multi-region input both produce identical results.

use std::collections::BTreeMap;

use dr_core::entities::Row;
use dr_core::{
    DistanceResult, EvalParams, IdealSolution, IndicatorCode, IndicatorMatrix, RegionId, Strategy,
};

use super::{calculate_distances_with_default, calculate_ideal_solutions};
use crate::AlgoError;

/// Ideal solution and per-region distances from one calculator run.
#[derive(Clone, Debug, PartialEq)]
pub struct TopsisOutcome {
    pub ideal: IdealSolution,
    pub distances: BTreeMap<RegionId, DistanceResult>,
    /// Ideals were synthesized from a single region's own values.
    pub theoretical_baseline: bool,
}

pub trait TopsisCalculator {
    fn strategy(&self) -> Strategy;

    fn calculate(
        &self,
        weighted: &IndicatorMatrix,
        params: &EvalParams,
    ) -> Result<TopsisOutcome, AlgoError>;
}

pub struct LegacyCalculator;
pub struct UnifiedCalculator;

static LEGACY: LegacyCalculator = LegacyCalculator;
static UNIFIED: UnifiedCalculator = UnifiedCalculator;

pub fn calculator_for(strategy: Strategy) -> &'static dyn TopsisCalculator {
    match strategy {
        Strategy::Legacy => &LEGACY,
        Strategy::Unified => &UNIFIED,
    }
}

impl TopsisCalculator for LegacyCalculator {
    fn strategy(&self) -> Strategy {
        Strategy::Legacy
    }

    fn calculate(
        &self,
        weighted: &IndicatorMatrix,
        params: &EvalParams,
    ) -> Result<TopsisOutcome, AlgoError> {
        if weighted.is_empty() {
            return Err(AlgoError::EmptyCohort);
        }
        let ideal = calculate_ideal_solutions(weighted);
        let distances = calculate_distances_with_default(weighted, &ideal, params.default_score)?;
        Ok(TopsisOutcome { ideal, distances, theoretical_baseline: false })
    }
}

impl TopsisCalculator for UnifiedCalculator {
    fn strategy(&self) -> Strategy {
        Strategy::Unified
    }

    fn calculate(
        &self,
        weighted: &IndicatorMatrix,
        params: &EvalParams,
    ) -> Result<TopsisOutcome, AlgoError> {
        if weighted.is_empty() {
            return Err(AlgoError::EmptyCohort);
        }
        let indicators: Vec<IndicatorCode> = weighted.indicators().into_iter().collect();

        let (ideal, theoretical_baseline) = match single_row(weighted) {
            Some(row) if params.single_region_handling => {
                (theoretical_ideal(row, &indicators, params.baseline_ratio), true)
            }
            _ => (finite_ideal(weighted, &indicators), false),
        };

        let distances = weighted
            .rows()
            .iter()
            .map(|(region, row)| {
                let pos = lenient_distance(row, &ideal.positive);
                let neg = lenient_distance(row, &ideal.negative);
                let result = DistanceResult::from_distances(pos, neg, Some(params.default_score));
                if result.defaulted {
                    tracing::warn!(%region, score = result.comprehensive_score, "both distances zero, default score applied");
                }
                (region.clone(), result)
            })
            .collect();

        Ok(TopsisOutcome { ideal, distances, theoretical_baseline })
    }
}

fn single_row(weighted: &IndicatorMatrix) -> Option<&Row> {
    if weighted.region_count() == 1 {
        weighted.rows().values().next()
    } else {
        None
    }
}

fn theoretical_ideal(row: &Row, indicators: &[IndicatorCode], ratio: f64) -> IdealSolution {
    let mut ideal = IdealSolution::default();
    for code in indicators {
        let (best, worst) = match row.get(code) {
            Some(v) if v.is_finite() => {
                let up = v * (1.0 + ratio);
                let down = v * (1.0 - ratio);
                (up.max(down), up.min(down))
            }
            _ => (1.0, 0.0),
        };
        ideal.positive.insert(code.clone(), best);
        ideal.negative.insert(code.clone(), worst);
    }
    tracing::debug!(indicators = indicators.len(), ratio, "single region, theoretical baseline");
    ideal
}

fn finite_ideal(weighted: &IndicatorMatrix, indicators: &[IndicatorCode]) -> IdealSolution {
    let mut ideal = IdealSolution::default();
    for code in indicators {
        let finite = weighted
            .rows()
            .values()
            .filter_map(|row| row.get(code).copied())
            .filter(|v| v.is_finite());
        let bounds = finite.fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        });
        if let Some((lo, hi)) = bounds {
            ideal.positive.insert(code.clone(), hi);
            ideal.negative.insert(code.clone(), lo);
        }
    }
    ideal
}

/// Euclidean distance over the indicators where both sides are finite.
fn lenient_distance(row: &Row, target: &BTreeMap<IndicatorCode, f64>) -> f64 {
    target
        .iter()
        .filter_map(|(code, t)| row.get(code).map(|v| (*v, *t)))
        .filter(|(v, t)| v.is_finite() && t.is_finite())
        .map(|(v, t)| (v - t) * (v - t))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: &[(&str, &[(&str, f64)])]) -> IndicatorMatrix {
        let mut m = IndicatorMatrix::new();
        for (r, cells) in rows {
            for (k, v) in *cells {
                m.insert(RegionId::new(*r).unwrap(), k.parse().unwrap(), *v);
            }
        }
        m
    }

    #[test]
    fn selection_is_explicit() {
        assert_eq!(calculator_for(Strategy::Legacy).strategy(), Strategy::Legacy);
        assert_eq!(calculator_for(Strategy::Unified).strategy(), Strategy::Unified);
    }

    #[test]
    fn single_region_scores_default_under_both() {
        let w = matrix(&[("only", &[("x", 0.2), ("y", 0.7)])]);
        let params = EvalParams::default();
        for s in [Strategy::Legacy, Strategy::Unified] {
            let out = calculator_for(s).calculate(&w, &params).unwrap();
            let d = out.distances.values().next().unwrap();
            assert!((d.comprehensive_score - 0.5).abs() < 1e-12, "{s}");
            assert!(!d.comprehensive_score.is_nan());
        }
    }

    #[test]
    fn unified_baseline_brackets_the_region() {
        let w = matrix(&[("only", &[("x", 0.5)])]);
        let out = UnifiedCalculator.calculate(&w, &EvalParams::default()).unwrap();
        assert!(out.theoretical_baseline);
        let x: IndicatorCode = "x".parse().unwrap();
        assert!((out.ideal.positive[&x] - 0.6).abs() < 1e-12);
        assert!((out.ideal.negative[&x] - 0.4).abs() < 1e-12);
        let d = out.distances.values().next().unwrap();
        assert!(!d.defaulted);
    }

    #[test]
    fn unified_single_region_can_be_disabled() {
        let w = matrix(&[("only", &[("x", 0.5)])]);
        let params = EvalParams { single_region_handling: false, ..EvalParams::default() };
        let out = UnifiedCalculator.calculate(&w, &params).unwrap();
        assert!(!out.theoretical_baseline);
        assert!(out.distances.values().next().unwrap().defaulted);
    }

    #[test]
    fn strategies_agree_on_clean_cohorts() {
        let w = matrix(&[
            ("a", &[("x", 0.1), ("y", 0.5)]),
            ("b", &[("x", 0.4), ("y", 0.2)]),
            ("c", &[("x", 0.3), ("y", 0.3)]),
        ]);
        let p = EvalParams::default();
        let l = LegacyCalculator.calculate(&w, &p).unwrap();
        let u = UnifiedCalculator.calculate(&w, &p).unwrap();
        assert_eq!(l.ideal, u.ideal);
        for (r, d) in &l.distances {
            assert!((d.comprehensive_score - u.distances[r].comprehensive_score).abs() < 1e-15);
        }
    }

    #[test]
    fn unified_skips_non_finite_cells() {
        let w = matrix(&[
            ("a", &[("x", f64::NAN), ("y", 0.5)]),
            ("b", &[("x", 0.4), ("y", 0.2)]),
        ]);
        let out = UnifiedCalculator.calculate(&w, &EvalParams::default()).unwrap();
        assert!(out.distances.values().all(|d| d.comprehensive_score.is_finite()));
        assert!(LegacyCalculator.calculate(&IndicatorMatrix::new(), &EvalParams::default()).is_err());
    }
}
