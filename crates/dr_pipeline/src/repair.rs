//! crates/dr_pipeline/src/repair.rs
//! Bounded, deterministic fixes driven by a diagnostic report.
//!
//! Matrix repair:
//! - missing / NaN / Infinite cell → `params.missing_fill`, unless the
//!   indicator is missing in more than `missing_rate_limit` of the regions;
//! - IQR outlier → clamped to the nearest fence, only with `clamp_outliers`;
//! - all-zero indicator → normalized by raw value (recorded, no data change);
//! - 0/0 score → `params.default_score` (recorded, applied by the calculator).
//!
//! The repaired matrix is diagnosed again: remaining errors are unresolved,
//! remaining warnings are accepted. Nothing is dropped silently.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use dr_algo::stats;
use dr_core::{DistanceResult, EvalParams, IndicatorCode, IndicatorMatrix, RegionId};

use crate::diagnose::{diagnose, DiagnosticIssue, DiagnosticReport};
use crate::validate::{EntityRef, SCORE_TOLERANCE};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FixKind {
    FillMissing,
    ReplaceNonFinite,
    ClampOutlier,
    RawValueNormalization,
    DefaultScore,
    NanDistance,
    InfiniteDistance,
    NegativeDistance,
    ScoreRecomputed,
    ScoreClamped,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AppliedFix {
    pub kind: FixKind,
    #[serde(rename = "where")]
    pub where_: EntityRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<f64>,
    pub note: String,
}

impl AppliedFix {
    fn new(kind: FixKind, where_: EntityRef, before: Option<f64>, after: Option<f64>, note: impl Into<String>) -> Self {
        let fix = Self { kind, where_, before, after, note: note.into() };
        tracing::warn!(kind = ?fix.kind, at = %fix.where_, note = %fix.note, "repair applied");
        fix
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RepairOutcome {
    pub matrix: IndicatorMatrix,
    pub applied: Vec<AppliedFix>,
    /// Errors still present after repair; the caller must not proceed silently.
    pub unresolved: Vec<DiagnosticIssue>,
    /// Warnings left in place.
    pub accepted: Vec<DiagnosticIssue>,
}

impl RepairOutcome {
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

// ---------- Matrix repair ----------

pub fn repair(report: &DiagnosticReport) -> RepairOutcome {
    let subject = &report.subject;
    let params = &subject.params;
    let mut matrix = subject.matrix.clone();
    let mut applied = Vec::new();

    let blocked: BTreeSet<&IndicatorCode> = report
        .issues
        .iter()
        .filter(|i| i.code == "Indicator.Incomplete" && i.is_error())
        .filter_map(|i| match &i.where_ {
            EntityRef::Indicator(k) => Some(k),
            _ => None,
        })
        .collect();

    let mut fences: BTreeMap<IndicatorCode, Option<(f64, f64)>> = BTreeMap::new();

    for issue in &report.issues {
        let EntityRef::Cell(region, code) = &issue.where_ else { continue };
        match issue.code {
            "Cell.Missing" | "Cell.NaN" | "Cell.Infinite" if !blocked.contains(code) => {
                let before = matrix.get(region, code);
                let kind = if before.is_some() { FixKind::ReplaceNonFinite } else { FixKind::FillMissing };
                matrix.insert(region.clone(), code.clone(), params.missing_fill);
                applied.push(AppliedFix::new(
                    kind,
                    issue.where_.clone(),
                    before,
                    Some(params.missing_fill),
                    format!("{} filled with neutral value", issue.code),
                ));
            }
            "Indicator.Outlier" if params.clamp_outliers => {
                let bounds = *fences
                    .entry(code.clone())
                    .or_insert_with(|| outlier_fences(&subject.matrix, code, params.outlier_iqr_k));
                let (Some((lo, hi)), Some(v)) = (bounds, matrix.get(region, code)) else { continue };
                let clamped = v.clamp(lo, hi);
                if clamped != v {
                    matrix.insert(region.clone(), code.clone(), clamped);
                    applied.push(AppliedFix::new(
                        FixKind::ClampOutlier,
                        issue.where_.clone(),
                        Some(v),
                        Some(clamped),
                        format!("clamped to [{lo}, {hi}]"),
                    ));
                }
            }
            _ => {}
        }
    }

    for code in &report.metrics.zero_denominator_indicators {
        applied.push(AppliedFix::new(
            FixKind::RawValueNormalization,
            EntityRef::Indicator(code.clone()),
            None,
            None,
            "all values zero; normalized by raw value",
        ));
    }
    for issue in report.issues.iter().filter(|i| {
        matches!(i.code, "Trial.AllZeroDistances" | "Trial.DegenerateScore")
    }) {
        applied.push(AppliedFix::new(
            FixKind::DefaultScore,
            issue.where_.clone(),
            None,
            Some(params.default_score),
            "0/0 score replaced by default score",
        ));
    }

    let after = diagnose(&matrix, &subject.weights, params);
    let (unresolved, accepted): (Vec<_>, Vec<_>) = after
        .issues
        .into_iter()
        .filter(|i| !matches!(i.code, "Trial.AllZeroDistances" | "Trial.DegenerateScore"))
        .partition(DiagnosticIssue::is_error);

    tracing::info!(
        applied = applied.len(),
        unresolved = unresolved.len(),
        accepted = accepted.len(),
        "repair finished"
    );
    RepairOutcome { matrix, applied, unresolved, accepted }
}

fn outlier_fences(matrix: &IndicatorMatrix, code: &IndicatorCode, k: f64) -> Option<(f64, f64)> {
    let values: Vec<f64> = matrix.column(code).into_values().filter(|v| v.is_finite()).collect();
    stats::quartiles(&values).map(|q| q.fences(k))
}

// ---------- Result repair ----------

/// NaN distance → 0, Infinite → 1, negative → |d|; scores recomputed,
/// defaulted, or clamped into [0, 1]. Every change is recorded.
pub fn repair_results(
    distances: &BTreeMap<RegionId, DistanceResult>,
    params: &EvalParams,
) -> (BTreeMap<RegionId, DistanceResult>, Vec<AppliedFix>) {
    let mut fixes = Vec::new();
    let mut out = BTreeMap::new();

    for (region, d) in distances {
        let here = || EntityRef::Region(region.clone());
        let pos = repair_distance(d.positive_distance, "positive", here(), &mut fixes);
        let neg = repair_distance(d.negative_distance, "negative", here(), &mut fixes);

        let mut score = d.comprehensive_score;
        let mut defaulted = d.defaulted;
        let total = pos + neg;
        if total > 0.0 {
            let expected = neg / total;
            if !score.is_finite() || (score - expected).abs() > SCORE_TOLERANCE {
                fixes.push(AppliedFix::new(FixKind::ScoreRecomputed, here(), Some(score), Some(expected), "score recomputed from distances"));
                score = expected;
                defaulted = false;
            }
        } else if score != params.default_score {
            fixes.push(AppliedFix::new(FixKind::DefaultScore, here(), Some(score), Some(params.default_score), "0/0 score replaced by default score"));
            score = params.default_score;
            defaulted = true;
        }
        if !(0.0..=1.0).contains(&score) {
            let clamped = score.clamp(0.0, 1.0);
            fixes.push(AppliedFix::new(FixKind::ScoreClamped, here(), Some(score), Some(clamped), "score clamped to [0, 1]"));
            score = clamped;
        }

        out.insert(
            region.clone(),
            DistanceResult {
                positive_distance: pos,
                negative_distance: neg,
                comprehensive_score: score,
                defaulted,
            },
        );
    }
    (out, fixes)
}

fn repair_distance(v: f64, side: &str, where_: EntityRef, fixes: &mut Vec<AppliedFix>) -> f64 {
    let (kind, fixed) = if v.is_nan() {
        (FixKind::NanDistance, 0.0)
    } else if v.is_infinite() {
        (FixKind::InfiniteDistance, 1.0)
    } else if v < 0.0 {
        (FixKind::NegativeDistance, v.abs())
    } else {
        return v;
    };
    fixes.push(AppliedFix::new(kind, where_, Some(v), Some(fixed), format!("{side} distance")));
    fixed
}

#[cfg(test)]
mod tests {
    use super::*;
    use dr_core::WeightSpec;

    fn r(s: &str) -> RegionId {
        s.parse().unwrap()
    }
    fn k(s: &str) -> IndicatorCode {
        s.parse().unwrap()
    }
    fn weights(codes: &[&str]) -> WeightSpec {
        let mut w = WeightSpec::default();
        w.primary.insert("all".parse().unwrap(), 1.0);
        for c in codes {
            w.category_of.insert(k(c), "all".parse().unwrap());
            w.secondary.insert(k(c), 0.5);
        }
        w
    }

    #[test]
    fn fills_isolated_gaps_and_reports_nothing_unresolved() {
        let mut m = IndicatorMatrix::new();
        for (name, x, y) in [("a", 1.0, 3.0), ("b", 2.0, f64::NAN), ("c", 3.0, 1.0), ("d", 4.0, 2.0)] {
            m.insert(r(name), k("x"), x);
            m.insert(r(name), k("y"), y);
        }
        m.insert(r("e"), k("x"), 5.0);
        let params = EvalParams::default();
        let out = repair(&diagnose(&m, &weights(&["x", "y"]), &params));
        assert!(out.is_complete(), "{:?}", out.unresolved);
        assert_eq!(out.matrix.get(&r("b"), &k("y")), Some(0.0));
        assert_eq!(out.matrix.get(&r("e"), &k("y")), Some(0.0));
        let kinds: Vec<FixKind> = out.applied.iter().map(|f| f.kind).collect();
        assert!(kinds.contains(&FixKind::ReplaceNonFinite));
        assert!(kinds.contains(&FixKind::FillMissing));
    }

    #[test]
    fn mostly_missing_indicator_stays_unresolved() {
        let mut m = IndicatorMatrix::new();
        m.insert(r("a"), k("x"), 1.0);
        m.insert(r("a"), k("y"), 1.0);
        m.insert(r("b"), k("x"), 2.0);
        m.insert(r("c"), k("x"), 3.0);
        let out = repair(&diagnose(&m, &weights(&["x", "y"]), &EvalParams::default()));
        assert!(!out.is_complete());
        assert!(out.unresolved.iter().any(|i| i.code == "Indicator.Incomplete"));
        assert_eq!(out.matrix.get(&r("b"), &k("y")), None);
    }

    #[test]
    fn missing_weight_is_never_repaired() {
        let mut m = IndicatorMatrix::new();
        m.insert(r("a"), k("x"), 1.0);
        m.insert(r("b"), k("x"), 2.0);
        let out = repair(&diagnose(&m, &WeightSpec::default(), &EvalParams::default()));
        assert!(out.unresolved.iter().any(|i| i.code.starts_with("Weight.")));
    }

    #[test]
    fn outliers_clamped_only_when_enabled() {
        let mut m = IndicatorMatrix::new();
        for (name, v) in [("a", 1.0), ("b", 2.0), ("c", 3.0), ("d", 2.0), ("e", 100.0)] {
            m.insert(r(name), k("v"), v);
        }
        let w = weights(&["v"]);
        let kept = repair(&diagnose(&m, &w, &EvalParams::default()));
        assert_eq!(kept.matrix.get(&r("e"), &k("v")), Some(100.0));
        assert!(kept.accepted.iter().any(|i| i.code == "Indicator.Outlier"));

        let params = EvalParams { clamp_outliers: true, ..Default::default() };
        let clamped = repair(&diagnose(&m, &w, &params));
        assert_eq!(clamped.matrix.get(&r("e"), &k("v")), Some(4.5));
        assert!(clamped.applied.iter().any(|f| f.kind == FixKind::ClampOutlier));
    }

    #[test]
    fn zero_column_records_raw_value_fix() {
        let mut m = IndicatorMatrix::new();
        for (name, x, z) in [("a", 1.0, 0.0), ("b", 2.0, 0.0)] {
            m.insert(r(name), k("x"), x);
            m.insert(r(name), k("z"), z);
        }
        let out = repair(&diagnose(&m, &weights(&["x", "z"]), &EvalParams::default()));
        assert!(out.applied.iter().any(|f| f.kind == FixKind::RawValueNormalization
            && f.where_ == EntityRef::Indicator(k("z"))));
    }

    #[test]
    fn results_are_made_finite_and_bounded() {
        let mut d = BTreeMap::new();
        d.insert(r("nan"), DistanceResult { positive_distance: f64::NAN, negative_distance: 0.3, comprehensive_score: f64::NAN, defaulted: false });
        d.insert(r("inf"), DistanceResult { positive_distance: 0.2, negative_distance: f64::INFINITY, comprehensive_score: 1.0, defaulted: false });
        d.insert(r("neg"), DistanceResult { positive_distance: -0.1, negative_distance: 0.1, comprehensive_score: 0.5, defaulted: false });
        d.insert(r("zero"), DistanceResult { positive_distance: 0.0, negative_distance: 0.0, comprehensive_score: 0.0, defaulted: false });
        d.insert(r("ok"), DistanceResult::from_distances(0.1, 0.3, None));
        let (fixed, fixes) = repair_results(&d, &EvalParams::default());

        assert_eq!(fixed[&r("nan")].positive_distance, 0.0);
        assert_eq!(fixed[&r("nan")].comprehensive_score, 1.0);
        assert_eq!(fixed[&r("inf")].negative_distance, 1.0);
        assert!((fixed[&r("inf")].comprehensive_score - 1.0 / 1.2).abs() < 1e-12);
        assert_eq!(fixed[&r("neg")].positive_distance, 0.1);
        assert_eq!(fixed[&r("zero")].comprehensive_score, 0.5);
        assert!(fixed[&r("zero")].defaulted);
        assert_eq!(fixed[&r("ok")], d[&r("ok")]);
        assert!(fixes.iter().all(|f| f.where_ != EntityRef::Region(r("ok"))));
        assert!(fixed.values().all(|d| (0.0..=1.0).contains(&d.comprehensive_score)));
    }

    #[test]
    fn tiny_nonzero_distances_keep_their_ratio() {
        let mut d = BTreeMap::new();
        d.insert(r("close"), DistanceResult::from_distances(1e-12, 3e-12, Some(0.5)));
        d.insert(r("stale"), DistanceResult { positive_distance: 1e-13, negative_distance: 3e-13, comprehensive_score: 0.5, defaulted: true });
        d.insert(r("zero"), DistanceResult { positive_distance: 0.0, negative_distance: 0.0, comprehensive_score: 0.5, defaulted: true });
        let (fixed, fixes) = repair_results(&d, &EvalParams::default());

        assert_eq!(fixed[&r("close")], d[&r("close")]);
        assert!((fixed[&r("close")].comprehensive_score - 0.75).abs() < 1e-12);
        assert!((fixed[&r("stale")].comprehensive_score - 0.75).abs() < 1e-12);
        assert!(!fixed[&r("stale")].defaulted);
        assert_eq!(fixed[&r("zero")].comprehensive_score, 0.5);
        assert_eq!(fixes.len(), 1);
        assert_eq!(fixes[0].kind, FixKind::ScoreRecomputed);
    }
}
