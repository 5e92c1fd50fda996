//! crates/dr_pipeline/src/validate.rs
//! Checks run before and after the calculation stages.
//!
//! Nothing here fails: every finding lands in a `ValidationReport` and the
//! caller decides whether to proceed. `pass` is false iff any issue is an
//! error. Issues are ordered by (code, where, message) so reports are stable
//! across runs.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use dr_algo::stats::{self, Summary};
use dr_core::{
    CategoryCode, DistanceResult, EvalParams, IdealSolution, IndicatorCode, IndicatorMatrix,
    RegionId, WeightSpec,
};

/// Population variance below this counts as zero.
pub const ZERO_VARIANCE_EPS: f64 = 1e-10;
/// max/min above this (with min > 0) is a wide-range warning.
pub const WIDE_RANGE_RATIO: f64 = 1000.0;
/// Missing share above this is worth a warning even when repair can fill it.
pub const MISSING_RATE_WARN: f64 = 0.1;
/// Allowed gap between a stored score and d⁻/(d⁺+d⁻).
pub const SCORE_TOLERANCE: f64 = 0.001;
pub const DISTANCE_RATIO_LIMIT: f64 = 1000.0;
/// Share of regions with usable results below which the run is suspect.
pub const MIN_VALID_SHARE: f64 = 0.8;

// ---------- Report model ----------

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Where a finding points.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityRef {
    Root,
    Region(RegionId),
    Indicator(IndicatorCode),
    Cell(RegionId, IndicatorCode),
    Category(CategoryCode),
    Weight(IndicatorCode),
    Param(&'static str),
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Root => f.write_str("root"),
            EntityRef::Region(r) => write!(f, "region:{r}"),
            EntityRef::Indicator(k) => write!(f, "indicator:{k}"),
            EntityRef::Cell(r, k) => write!(f, "cell:{r}/{k}"),
            EntityRef::Category(c) => write!(f, "category:{c}"),
            EntityRef::Weight(k) => write!(f, "weight:{k}"),
            EntityRef::Param(p) => write!(f, "param:{p}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
    #[serde(rename = "where")]
    pub where_: EntityRef,
}

impl ValidationIssue {
    pub fn error(code: &'static str, where_: EntityRef, message: impl Into<String>) -> Self {
        Self { severity: Severity::Error, code, message: message.into(), where_ }
    }

    pub fn warning(code: &'static str, where_: EntityRef, message: impl Into<String>) -> Self {
        Self { severity: Severity::Warning, code, message: message.into(), where_ }
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Spread of one indicator over its finite values.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IndicatorStats {
    /// Regions without a finite value (absent, NaN or Infinite).
    pub missing: usize,
    pub missing_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coefficient_of_variation: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MatrixStats {
    pub regions: usize,
    pub indicators: usize,
    pub cells: usize,
    pub nan: usize,
    pub infinite: usize,
    pub zero: usize,
    pub negative: usize,
    pub missing: usize,
    /// Finite cells over regions × indicators.
    pub completeness: f64,
    /// 0–100.
    pub quality_score: f64,
    pub per_indicator: BTreeMap<IndicatorCode, IndicatorStats>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub pass: bool,
    pub issues: Vec<ValidationIssue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matrix: Option<MatrixStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scores: Option<Summary>,
}

impl ValidationReport {
    pub fn from_issues(mut issues: Vec<ValidationIssue>) -> Self {
        sort_issues_stably(&mut issues);
        let pass = !issues.iter().any(ValidationIssue::is_error);
        Self { pass, issues, matrix: None, scores: None }
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| !i.is_error())
    }

    /// Combine two reports; statistics from `self` win when both carry them.
    pub fn merge(self, other: ValidationReport) -> Self {
        let mut issues = self.issues;
        issues.extend(other.issues);
        let mut merged = Self::from_issues(issues);
        merged.matrix = self.matrix.or(other.matrix);
        merged.scores = self.scores.or(other.scores);
        merged
    }
}

// ---------- Input checks ----------

/// Input checks with default thresholds.
pub fn validate(matrix: &IndicatorMatrix) -> ValidationReport {
    validate_with(matrix, &EvalParams::default())
}

/// Input checks using the outlier fence and missing-rate limit from `params`.
pub fn validate_with(matrix: &IndicatorMatrix, params: &EvalParams) -> ValidationReport {
    let mut issues = Vec::new();
    if matrix.is_empty() {
        issues.push(ValidationIssue::error("Matrix.Empty", EntityRef::Root, "matrix has no regions"));
        return ValidationReport::from_issues(issues);
    }
    let indicators = matrix.indicators();
    if indicators.is_empty() {
        issues.push(ValidationIssue::error(
            "Matrix.NoIndicators",
            EntityRef::Root,
            "no region carries any indicator value",
        ));
    }

    let mut counts = CellCounts::default();
    check_cells(matrix, &indicators, &mut counts, &mut issues);
    let per_indicator = check_indicators(matrix, &indicators, params, &mut issues);

    let expected = matrix.region_count() * indicators.len();
    let finite = expected - counts.missing - counts.nan - counts.infinite;
    let completeness = if expected == 0 { 0.0 } else { finite as f64 / expected as f64 };
    let quality_score = quality_score(completeness, &issues);

    let mut report = ValidationReport::from_issues(issues);
    report.matrix = Some(MatrixStats {
        regions: matrix.region_count(),
        indicators: indicators.len(),
        cells: matrix.cell_count(),
        nan: counts.nan,
        infinite: counts.infinite,
        zero: counts.zero,
        negative: counts.negative,
        missing: counts.missing,
        completeness,
        quality_score,
        per_indicator,
    });
    tracing::debug!(
        pass = report.pass,
        issues = report.issues.len(),
        quality = quality_score,
        "input validation"
    );
    report
}

#[derive(Default)]
struct CellCounts {
    nan: usize,
    infinite: usize,
    zero: usize,
    negative: usize,
    missing: usize,
}

fn check_cells(
    matrix: &IndicatorMatrix,
    indicators: &BTreeSet<IndicatorCode>,
    counts: &mut CellCounts,
    issues: &mut Vec<ValidationIssue>,
) {
    for (region, row) in matrix.rows() {
        if row.is_empty() && !indicators.is_empty() {
            issues.push(ValidationIssue::error(
                "Region.NoIndicators",
                EntityRef::Region(region.clone()),
                format!("region {region} has no indicator values"),
            ));
        }
        for code in indicators {
            let cell = || EntityRef::Cell(region.clone(), code.clone());
            match row.get(code).copied() {
                None => {
                    counts.missing += 1;
                    if !row.is_empty() {
                        issues.push(ValidationIssue::error(
                            "Cell.Missing",
                            cell(),
                            format!("region {region} lacks indicator {code}"),
                        ));
                    }
                }
                Some(v) if v.is_nan() => {
                    counts.nan += 1;
                    issues.push(ValidationIssue::error("Cell.NaN", cell(), "value is NaN"));
                }
                Some(v) if v.is_infinite() => {
                    counts.infinite += 1;
                    issues.push(ValidationIssue::error("Cell.Infinite", cell(), format!("value is {v}")));
                }
                Some(v) if v < 0.0 => {
                    counts.negative += 1;
                    issues.push(ValidationIssue::warning(
                        "Cell.Negative",
                        cell(),
                        format!("negative value {v}"),
                    ));
                }
                Some(v) => {
                    if v == 0.0 {
                        counts.zero += 1;
                    }
                }
            }
        }
    }
}

fn check_indicators(
    matrix: &IndicatorMatrix,
    indicators: &BTreeSet<IndicatorCode>,
    params: &EvalParams,
    issues: &mut Vec<ValidationIssue>,
) -> BTreeMap<IndicatorCode, IndicatorStats> {
    let n = matrix.region_count();
    let mut out = BTreeMap::new();

    for code in indicators {
        let finite: Vec<(&RegionId, f64)> = matrix
            .rows()
            .iter()
            .filter_map(|(r, row)| row.get(code).copied().filter(|v| v.is_finite()).map(|v| (r, v)))
            .collect();
        let values: Vec<f64> = finite.iter().map(|(_, v)| *v).collect();
        let here = || EntityRef::Indicator(code.clone());

        let missing = n - values.len();
        let missing_rate = missing as f64 / n as f64;
        if missing_rate > params.missing_rate_limit {
            issues.push(ValidationIssue::error(
                "Indicator.Incomplete",
                here(),
                format!(
                    "{code} missing in {missing}/{n} regions ({:.0}% > limit {:.0}%)",
                    missing_rate * 100.0,
                    params.missing_rate_limit * 100.0
                ),
            ));
        } else if missing_rate > MISSING_RATE_WARN {
            issues.push(ValidationIssue::warning(
                "Indicator.Incomplete",
                here(),
                format!("{code} missing in {missing}/{n} regions"),
            ));
        }

        let summary = stats::summarize(&values);

        if n >= 2 && values.len() >= 2 {
            let variance = stats::population_variance(&values).unwrap_or(0.0);
            let identical = values.windows(2).all(|w| w[0] == w[1]);
            if variance < ZERO_VARIANCE_EPS || identical {
                issues.push(ValidationIssue::warning(
                    "Indicator.ZeroVariance",
                    here(),
                    format!("{code} does not vary across regions (variance {variance:e})"),
                ));
            }
        }

        if let Some(q) = stats::quartiles(&values) {
            let (lo, hi) = q.fences(params.outlier_iqr_k);
            for (region, v) in &finite {
                if *v < lo || *v > hi {
                    issues.push(ValidationIssue::warning(
                        "Indicator.Outlier",
                        EntityRef::Cell((*region).clone(), code.clone()),
                        format!("{v} outside [{lo}, {hi}]"),
                    ));
                }
            }
        }

        if let Some(s) = &summary {
            if s.min > 0.0 && s.max / s.min > WIDE_RANGE_RATIO {
                issues.push(ValidationIssue::warning(
                    "Indicator.WideRange",
                    here(),
                    format!("{code} spans {} to {} (ratio {:.0})", s.min, s.max, s.max / s.min),
                ));
            }
        }

        out.insert(
            code.clone(),
            IndicatorStats {
                missing,
                missing_rate,
                coefficient_of_variation: summary.as_ref().and_then(Summary::coefficient_of_variation),
                summary,
            },
        );
    }
    out
}

const CONSISTENCY_CODES: &[&str] = &["Cell.Missing", "Region.NoIndicators"];
const ANOMALY_CODES: &[&str] = &[
    "Cell.Negative",
    "Indicator.Outlier",
    "Indicator.WideRange",
    "Indicator.ZeroVariance",
];

/// 100 × (0.6 + 0.4·completeness) × 0.7 on consistency errors × (1 − min(0.3, 0.05·anomalies)).
fn quality_score(completeness: f64, issues: &[ValidationIssue]) -> f64 {
    let mut score = 100.0 * (0.6 + 0.4 * completeness);
    if issues.iter().any(|i| i.is_error() && CONSISTENCY_CODES.contains(&i.code)) {
        score *= 0.7;
    }
    let anomalies = issues.iter().filter(|i| ANOMALY_CODES.contains(&i.code)).count();
    score *= 1.0 - (0.05 * anomalies as f64).min(0.3);
    score
}

// ---------- Weight checks ----------

/// Every indicator in `matrix` must resolve to a category, a primary weight
/// and a secondary weight. Weights outside (0, 1] are only warned about.
pub fn validate_weights(matrix: &IndicatorMatrix, weights: &WeightSpec) -> ValidationReport {
    let mut issues = Vec::new();
    let mut categories = BTreeSet::new();

    for code in matrix.indicators() {
        let here = || EntityRef::Weight(code.clone());
        match weights.category(&code) {
            None => issues.push(ValidationIssue::error(
                "Weight.MissingCategory",
                here(),
                format!("{code} has no owning category"),
            )),
            Some(cat) => {
                categories.insert(cat.clone());
                if !weights.primary.contains_key(cat) {
                    issues.push(ValidationIssue::error(
                        "Weight.MissingPrimary",
                        here(),
                        format!("category {cat} of {code} has no primary weight"),
                    ));
                }
            }
        }
        match weights.secondary_for(&code) {
            None => issues.push(ValidationIssue::error(
                "Weight.MissingSecondary",
                here(),
                format!("{code} has no secondary weight"),
            )),
            Some(w) => check_weight_value(w, here(), &mut issues),
        }
    }
    for cat in categories {
        if let Some(w) = weights.primary.get(&cat) {
            check_weight_value(*w, EntityRef::Category(cat.clone()), &mut issues);
        }
    }
    ValidationReport::from_issues(issues)
}

fn check_weight_value(w: f64, where_: EntityRef, issues: &mut Vec<ValidationIssue>) {
    if !w.is_finite() {
        issues.push(ValidationIssue::error("Weight.NonFinite", where_, format!("weight is {w}")));
    } else if !(w > 0.0 && w <= 1.0) {
        issues.push(ValidationIssue::warning(
            "Weight.OutOfRange",
            where_,
            format!("weight {w} outside (0, 1]"),
        ));
    }
}

// ---------- Result checks ----------

/// Indicators whose ideals coincide.
pub fn check_ideal(ideal: &IdealSolution) -> Vec<ValidationIssue> {
    ideal
        .zero_spread()
        .into_iter()
        .map(|code| {
            tracing::warn!(indicator = %code, "no discrimination: positive and negative ideals coincide");
            ValidationIssue::warning(
                "Ideal.NoDiscrimination",
                EntityRef::Indicator(code.clone()),
                format!("{code} has identical positive and negative ideals"),
            )
        })
        .collect()
}

/// Sanity of per-region distances and scores after the calculator ran.
pub fn validate_results(
    distances: &BTreeMap<RegionId, DistanceResult>,
    params: &EvalParams,
) -> ValidationReport {
    let mut issues = Vec::new();
    if distances.is_empty() {
        issues.push(ValidationIssue::error("Result.Empty", EntityRef::Root, "no region has a result"));
        return ValidationReport::from_issues(issues);
    }

    let mut scores = Vec::with_capacity(distances.len());
    for (region, d) in distances {
        let errors_before = issues.len();
        let here = || EntityRef::Region(region.clone());
        for (side, v) in [("positive", d.positive_distance), ("negative", d.negative_distance)] {
            if v.is_nan() {
                issues.push(ValidationIssue::error("Distance.NaN", here(), format!("{side} distance is NaN")));
            } else if v.is_infinite() {
                issues.push(ValidationIssue::error("Distance.Infinite", here(), format!("{side} distance is {v}")));
            } else if v < 0.0 {
                issues.push(ValidationIssue::error("Distance.Negative", here(), format!("{side} distance {v} < 0")));
            }
        }
        let s = d.comprehensive_score;
        if !s.is_finite() {
            issues.push(ValidationIssue::error("Score.NonFinite", here(), format!("score is {s}")));
        } else if !(0.0..=1.0).contains(&s) {
            issues.push(ValidationIssue::error("Score.OutOfRange", here(), format!("score {s} outside [0, 1]")));
        }
        if issues.len() > errors_before {
            continue;
        }
        scores.push(s);

        let (pos, neg) = (d.positive_distance, d.negative_distance);
        let total = pos + neg;
        if pos == 0.0 && neg == 0.0 {
            issues.push(ValidationIssue::warning(
                "Score.Degenerate",
                here(),
                format!("both distances are zero; score {s}"),
            ));
        } else if total > 0.0 && (s - neg / total).abs() > SCORE_TOLERANCE {
            issues.push(ValidationIssue::warning(
                "Score.Inconsistent",
                here(),
                format!("score {s} differs from d⁻/(d⁺+d⁻) = {}", neg / total),
            ));
        }
        if pos > 0.0 && neg > 0.0 && pos.max(neg) / pos.min(neg) > DISTANCE_RATIO_LIMIT {
            issues.push(ValidationIssue::warning(
                "Distance.RatioExtreme",
                here(),
                format!("distance ratio {:.0}", pos.max(neg) / pos.min(neg)),
            ));
        }
    }

    let share = scores.len() as f64 / distances.len() as f64;
    if share < MIN_VALID_SHARE {
        issues.push(ValidationIssue::warning(
            "Result.LowValidShare",
            EntityRef::Root,
            format!("only {}/{} regions have usable results", scores.len(), distances.len()),
        ));
    }
    let summary = stats::summarize(&scores);
    if let Some(s) = &summary {
        if s.count >= 2 && s.range < params.discrimination_floor {
            issues.push(ValidationIssue::warning(
                "Result.LowDiscrimination",
                EntityRef::Root,
                format!("score range {} below {}", s.range, params.discrimination_floor),
            ));
        }
    }

    let mut report = ValidationReport::from_issues(issues);
    report.scores = summary;
    report
}

// ---------- Utilities ----------

fn sort_issues_stably(issues: &mut [ValidationIssue]) {
    issues.sort_by(|a, b| {
        a.code
            .cmp(b.code)
            .then_with(|| a.where_.cmp(&b.where_))
            .then_with(|| a.message.cmp(&b.message))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(s: &str) -> RegionId {
        s.parse().unwrap()
    }
    fn k(s: &str) -> IndicatorCode {
        s.parse().unwrap()
    }
    fn matrix(rows: &[(&str, &[(&str, f64)])]) -> IndicatorMatrix {
        let mut m = IndicatorMatrix::new();
        for (region, cells) in rows {
            m.insert_region(r(region));
            for (code, v) in *cells {
                m.insert(r(region), k(code), *v);
            }
        }
        m
    }
    fn codes(report: &ValidationReport) -> Vec<&'static str> {
        report.issues.iter().map(|i| i.code).collect()
    }

    #[test]
    fn clean_matrix_passes_with_full_quality() {
        let m = matrix(&[
            ("a", &[("x", 1.0), ("y", 4.0)]),
            ("b", &[("x", 2.0), ("y", 5.0)]),
            ("c", &[("x", 3.0), ("y", 6.0)]),
        ]);
        let rep = validate(&m);
        assert!(rep.pass, "{:?}", rep.issues);
        assert!(rep.issues.is_empty());
        let stats = rep.matrix.unwrap();
        assert_eq!(stats.completeness, 1.0);
        assert_eq!(stats.quality_score, 100.0);
        assert_eq!(stats.per_indicator[&k("x")].summary.unwrap().max, 3.0);
    }

    #[test]
    fn empty_matrix_is_an_error() {
        let rep = validate(&IndicatorMatrix::new());
        assert!(!rep.pass);
        assert_eq!(codes(&rep), vec!["Matrix.Empty"]);
    }

    #[test]
    fn bad_cells_are_reported_per_cell() {
        let m = matrix(&[
            ("a", &[("x", f64::NAN), ("y", 1.0)]),
            ("b", &[("x", f64::INFINITY)]),
            ("c", &[("x", -2.0), ("y", 3.0)]),
        ]);
        let rep = validate(&m);
        assert!(!rep.pass);
        let c = codes(&rep);
        assert!(c.contains(&"Cell.NaN"));
        assert!(c.contains(&"Cell.Infinite"));
        assert!(c.contains(&"Cell.Missing"));
        assert!(c.contains(&"Cell.Negative"));
        let stats = rep.matrix.unwrap();
        assert_eq!((stats.nan, stats.infinite, stats.negative, stats.missing), (1, 1, 1, 1));
        assert!(stats.quality_score < 70.0);
    }

    #[test]
    fn missing_rate_above_limit_is_an_error() {
        let m = matrix(&[
            ("a", &[("x", 1.0), ("y", 1.0)]),
            ("b", &[("x", 2.0)]),
            ("c", &[("x", 3.0)]),
        ]);
        let rep = validate(&m);
        let inc: Vec<_> = rep.issues.iter().filter(|i| i.code == "Indicator.Incomplete").collect();
        assert_eq!(inc.len(), 1);
        assert_eq!(inc[0].severity, Severity::Error);
        assert_eq!(inc[0].where_, EntityRef::Indicator(k("y")));
    }

    #[test]
    fn zero_variance_and_outliers_are_warnings() {
        let m = matrix(&[
            ("a", &[("flat", 1.0), ("v", 1.0)]),
            ("b", &[("flat", 1.0), ("v", 2.0)]),
            ("c", &[("flat", 1.0), ("v", 3.0)]),
            ("d", &[("flat", 1.0), ("v", 2.0)]),
            ("e", &[("flat", 1.0), ("v", 100.0)]),
        ]);
        let rep = validate(&m);
        assert!(rep.pass);
        assert!(rep
            .warnings()
            .any(|i| i.code == "Indicator.ZeroVariance" && i.where_ == EntityRef::Indicator(k("flat"))));
        assert!(rep
            .warnings()
            .any(|i| i.code == "Indicator.Outlier" && i.where_ == EntityRef::Cell(r("e"), k("v"))));
    }

    #[test]
    fn wide_range_needs_positive_min() {
        let m = matrix(&[("a", &[("x", 0.01)]), ("b", &[("x", 50.0)])]);
        assert!(codes(&validate(&m)).contains(&"Indicator.WideRange"));
        let m = matrix(&[("a", &[("x", 0.0)]), ("b", &[("x", 50.0)])]);
        assert!(!codes(&validate(&m)).contains(&"Indicator.WideRange"));
    }

    #[test]
    fn issues_are_sorted_stably() {
        let m = matrix(&[
            ("b", &[("x", f64::NAN)]),
            ("a", &[("x", f64::NAN)]),
        ]);
        let rep = validate(&m);
        let nan: Vec<_> = rep.issues.iter().filter(|i| i.code == "Cell.NaN").map(|i| i.where_.to_string()).collect();
        assert_eq!(nan, vec!["cell:a/x", "cell:b/x"]);
        let mut sorted = rep.issues.clone();
        sort_issues_stably(&mut sorted);
        assert_eq!(sorted, rep.issues);
    }

    #[test]
    fn weight_gaps_are_errors_and_ranges_warnings() {
        let m = matrix(&[("a", &[("x", 1.0), ("y", 1.0), ("z", 1.0)])]);
        let mut w = WeightSpec::default();
        w.category_of.insert(k("x"), "c1".parse().unwrap());
        w.category_of.insert(k("y"), "c2".parse().unwrap());
        w.primary.insert("c1".parse().unwrap(), 1.5);
        w.secondary.insert(k("x"), 0.5);
        w.secondary.insert(k("y"), 0.5);
        let rep = validate_weights(&m, &w);
        assert!(!rep.pass);
        let c = codes(&rep);
        assert!(c.contains(&"Weight.MissingCategory"));
        assert!(c.contains(&"Weight.MissingPrimary"));
        assert!(c.contains(&"Weight.MissingSecondary"));
        assert!(c.contains(&"Weight.OutOfRange"));
    }

    fn dr(pos: f64, neg: f64, score: f64) -> DistanceResult {
        DistanceResult { positive_distance: pos, negative_distance: neg, comprehensive_score: score, defaulted: false }
    }

    #[test]
    fn result_errors_and_warnings() {
        let mut d = BTreeMap::new();
        d.insert(r("a"), dr(f64::NAN, 0.1, 0.5));
        d.insert(r("b"), dr(0.2, 0.2, 1.5));
        d.insert(r("c"), dr(0.1, 0.3, 0.9));
        d.insert(r("d"), dr(0.0, 0.0, 0.5));
        d.insert(r("e"), dr(0.3, 0.1, 0.25));
        let rep = validate_results(&d, &EvalParams::default());
        assert!(!rep.pass);
        let c = codes(&rep);
        assert!(c.contains(&"Distance.NaN"));
        assert!(c.contains(&"Score.OutOfRange"));
        assert!(c.contains(&"Score.Inconsistent"));
        assert!(c.contains(&"Score.Degenerate"));
        assert!(c.contains(&"Result.LowValidShare"));
        assert_eq!(rep.scores.unwrap().count, 3);
    }

    #[test]
    fn flat_scores_have_low_discrimination() {
        let mut d = BTreeMap::new();
        d.insert(r("a"), dr(0.1, 0.1, 0.5));
        d.insert(r("b"), dr(0.1, 0.1, 0.5));
        let rep = validate_results(&d, &EvalParams::default());
        assert!(rep.pass);
        assert!(codes(&rep).contains(&"Result.LowDiscrimination"));
    }

    #[test]
    fn zero_spread_ideal_is_flagged() {
        let mut ideal = IdealSolution::default();
        ideal.positive.insert(k("x"), 0.3);
        ideal.negative.insert(k("x"), 0.3);
        ideal.positive.insert(k("y"), 0.5);
        ideal.negative.insert(k("y"), 0.1);
        let issues = check_ideal(&ideal);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].where_, EntityRef::Indicator(k("x")));
    }
}
