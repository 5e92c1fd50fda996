//! crates/dr_pipeline/src/diagnose.rs
//! Trial run of the calculation chain with failure classification.
//!
//! `diagnose` always returns a report. Input findings are carried over from
//! validation, then the chain is run once on whatever cells are present; a
//! stage error becomes a `CalculationFailed` issue and diagnosis continues
//! with the partial results it has.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use dr_algo::stats::{self, Summary};
use dr_algo::{apply_weights, calculator_for, normalize_all, zero_denominator_indicators};
use dr_core::{
    DistanceResult, EvalParams, IdealSolution, IndicatorCode, IndicatorMatrix, RegionId,
    WeightSpec,
};

use crate::validate::{
    validate_weights, validate_with, EntityRef, Severity, ValidationIssue, ValidationReport,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    EmptyInput,
    InvalidValue,
    MissingValue,
    MissingWeight,
    WeightRange,
    NoDiscrimination,
    Outlier,
    ScaleSpread,
    AllZeroDistances,
    DegenerateScore,
    MissingDistance,
    NanPropagation,
    CalculationFailed,
}

impl IssueCategory {
    /// Stable snake_case code, same as the serialized form.
    pub const fn code(self) -> &'static str {
        match self {
            IssueCategory::EmptyInput => "empty_input",
            IssueCategory::InvalidValue => "invalid_value",
            IssueCategory::MissingValue => "missing_value",
            IssueCategory::MissingWeight => "missing_weight",
            IssueCategory::WeightRange => "weight_range",
            IssueCategory::NoDiscrimination => "no_discrimination",
            IssueCategory::Outlier => "outlier",
            IssueCategory::ScaleSpread => "scale_spread",
            IssueCategory::AllZeroDistances => "all_zero_distances",
            IssueCategory::DegenerateScore => "degenerate_score",
            IssueCategory::MissingDistance => "missing_distance",
            IssueCategory::NanPropagation => "nan_propagation",
            IssueCategory::CalculationFailed => "calculation_failed",
        }
    }

    pub const fn hint(self) -> &'static str {
        match self {
            IssueCategory::EmptyInput => "supply at least one region with indicator values",
            IssueCategory::InvalidValue => {
                "correct the source record; repair substitutes the neutral fill value"
            }
            IssueCategory::MissingValue => {
                "collect the missing values; repair fills isolated gaps with the neutral value"
            }
            IssueCategory::MissingWeight => {
                "add the category mapping and primary/secondary weights for the indicator"
            }
            IssueCategory::WeightRange => "check the weight table; weights are expected in (0, 1]",
            IssueCategory::NoDiscrimination => {
                "the indicator is identical everywhere; consider dropping it from the run"
            }
            IssueCategory::Outlier => {
                "verify the value at source; enable clamp_outliers to winsorize to the IQR fences"
            }
            IssueCategory::ScaleSpread => "check units; values differ by more than three orders of magnitude",
            IssueCategory::AllZeroDistances => {
                "every region coincides with both ideals; scores fall back to the default score"
            }
            IssueCategory::DegenerateScore => "the region's score falls back to the default score",
            IssueCategory::MissingDistance => "the region dropped out of the distance stage; check its cells",
            IssueCategory::NanPropagation => "a non-finite input reached the distances; repair the input cells",
            IssueCategory::CalculationFailed => "fix the reported configuration or input error and rerun",
        }
    }
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DiagnosticIssue {
    pub category: IssueCategory,
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
    #[serde(rename = "where")]
    pub where_: EntityRef,
    pub hint: &'static str,
    /// A deterministic fix exists for this finding.
    pub repairable: bool,
}

impl DiagnosticIssue {
    fn new(
        category: IssueCategory,
        severity: Severity,
        code: &'static str,
        where_: EntityRef,
        message: impl Into<String>,
        repairable: bool,
    ) -> Self {
        Self { category, severity, code, message: message.into(), where_, hint: category.hint(), repairable }
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DistanceStats {
    pub positive: Summary,
    pub negative: Summary,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DiagnosticMetrics {
    pub total_regions: usize,
    /// Indicators with at least one finite value.
    pub valid_indicators: usize,
    pub nan_count: usize,
    pub infinite_count: usize,
    pub zero_count: usize,
    /// Indicators normalized by raw value (all-zero column).
    pub zero_denominator_indicators: Vec<IndicatorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ideal: Option<IdealSolution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_stats: Option<DistanceStats>,
}

/// Inputs the diagnosis ran on; repair works from these.
#[derive(Clone, Debug, PartialEq)]
pub struct DiagnosedInputs {
    pub matrix: IndicatorMatrix,
    pub weights: WeightSpec,
    pub params: EvalParams,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DiagnosticReport {
    /// No error-severity issue.
    pub healthy: bool,
    pub input: ValidationReport,
    pub issues: Vec<DiagnosticIssue>,
    pub metrics: DiagnosticMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distances: Option<BTreeMap<RegionId, DistanceResult>>,
    pub recommendations: Vec<String>,
    #[serde(skip)]
    pub subject: DiagnosedInputs,
}

impl DiagnosticReport {
    pub fn errors(&self) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues.iter().filter(|i| i.is_error())
    }

    pub fn by_category(&self, category: IssueCategory) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues.iter().filter(move |i| i.category == category)
    }
}

// ---------- Entry point ----------

pub fn diagnose(
    matrix: &IndicatorMatrix,
    weights: &WeightSpec,
    params: &EvalParams,
) -> DiagnosticReport {
    let input = validate_with(matrix, params).merge(validate_weights(matrix, weights));
    let mut issues: Vec<DiagnosticIssue> =
        input.issues.iter().map(|i| classify(i, params)).collect();

    let mut metrics = DiagnosticMetrics { total_regions: matrix.region_count(), ..Default::default() };
    if let Some(s) = &input.matrix {
        metrics.nan_count = s.nan;
        metrics.infinite_count = s.infinite;
        metrics.zero_count = s.zero;
        metrics.valid_indicators =
            s.per_indicator.values().filter(|i| i.summary.is_some()).count();
    }

    let distances = if matrix.is_empty() {
        None
    } else {
        trial_run(matrix, weights, params, &input, &mut metrics, &mut issues)
    };

    issues.sort_by(|a, b| {
        a.category
            .cmp(&b.category)
            .then_with(|| a.code.cmp(b.code))
            .then_with(|| a.where_.cmp(&b.where_))
            .then_with(|| a.message.cmp(&b.message))
    });
    let healthy = !issues.iter().any(DiagnosticIssue::is_error);
    let recommendations = recommendations(&issues);
    tracing::debug!(healthy, issues = issues.len(), "diagnosis complete");

    DiagnosticReport {
        healthy,
        input,
        issues,
        metrics,
        distances,
        recommendations,
        subject: DiagnosedInputs {
            matrix: matrix.clone(),
            weights: weights.clone(),
            params: params.clone(),
        },
    }
}

// ---------- Trial run ----------

fn trial_run(
    matrix: &IndicatorMatrix,
    weights: &WeightSpec,
    params: &EvalParams,
    input: &ValidationReport,
    metrics: &mut DiagnosticMetrics,
    issues: &mut Vec<DiagnosticIssue>,
) -> Option<BTreeMap<RegionId, DistanceResult>> {
    let columns = matrix.columns();
    metrics.zero_denominator_indicators = zero_denominator_indicators(&columns);

    let weighted = match apply_weights(&normalize_all(&columns), weights) {
        Ok(w) => w,
        Err(e) => {
            issues.push(calculation_failed("weight", &e));
            return None;
        }
    };
    let outcome = match calculator_for(params.strategy).calculate(&weighted, params) {
        Ok(o) => o,
        Err(e) => {
            issues.push(calculation_failed("distance", &e));
            return None;
        }
    };

    // Zero-spread indicators already flagged on input are not repeated.
    let flagged: BTreeSet<&EntityRef> = input
        .issues
        .iter()
        .filter(|i| i.code == "Indicator.ZeroVariance")
        .map(|i| &i.where_)
        .collect();
    for code in outcome.ideal.zero_spread() {
        let here = EntityRef::Indicator(code.clone());
        if !flagged.contains(&here) && !outcome.theoretical_baseline {
            issues.push(DiagnosticIssue::new(
                IssueCategory::NoDiscrimination,
                Severity::Warning,
                "Ideal.NoDiscrimination",
                here,
                format!("{code} has identical positive and negative ideals"),
                false,
            ));
        }
    }

    classify_distances(matrix, &outcome.distances, params, issues);

    let pos: Vec<f64> = outcome.distances.values().map(|d| d.positive_distance).filter(|v| v.is_finite()).collect();
    let neg: Vec<f64> = outcome.distances.values().map(|d| d.negative_distance).filter(|v| v.is_finite()).collect();
    if let (Some(positive), Some(negative)) = (stats::summarize(&pos), stats::summarize(&neg)) {
        metrics.distance_stats = Some(DistanceStats { positive, negative });
    }
    metrics.ideal = Some(outcome.ideal);
    Some(outcome.distances)
}

fn calculation_failed(stage: &str, e: &dr_algo::AlgoError) -> DiagnosticIssue {
    tracing::warn!(stage, error = %e, "trial calculation failed");
    let (category, where_) = match e {
        dr_algo::AlgoError::MissingCategory { indicator }
        | dr_algo::AlgoError::MissingPrimaryWeight { indicator, .. }
        | dr_algo::AlgoError::MissingSecondaryWeight { indicator } => {
            (IssueCategory::MissingWeight, EntityRef::Weight(indicator.clone()))
        }
        dr_algo::AlgoError::MissingCell { region, indicator } => {
            (IssueCategory::CalculationFailed, EntityRef::Cell(region.clone(), indicator.clone()))
        }
        dr_algo::AlgoError::EmptyCohort => (IssueCategory::CalculationFailed, EntityRef::Root),
    };
    DiagnosticIssue::new(
        category,
        Severity::Error,
        "Trial.Failed",
        where_,
        format!("{stage} stage failed: {e}"),
        false,
    )
}

/// All-zero distances, missing distance keys, NaN propagation, degenerate scores.
fn classify_distances(
    matrix: &IndicatorMatrix,
    distances: &BTreeMap<RegionId, DistanceResult>,
    params: &EvalParams,
    issues: &mut Vec<DiagnosticIssue>,
) {
    for region in matrix.regions() {
        if !distances.contains_key(region) {
            issues.push(DiagnosticIssue::new(
                IssueCategory::MissingDistance,
                Severity::Error,
                "Trial.MissingDistance",
                EntityRef::Region(region.clone()),
                format!("no distance computed for {region}"),
                false,
            ));
        }
    }

    let non_finite: Vec<&RegionId> = distances
        .iter()
        .filter(|(_, d)| {
            !(d.positive_distance.is_finite()
                && d.negative_distance.is_finite()
                && d.comprehensive_score.is_finite())
        })
        .map(|(r, _)| r)
        .collect();
    for region in &non_finite {
        issues.push(DiagnosticIssue::new(
            IssueCategory::NanPropagation,
            Severity::Error,
            "Trial.NonFinite",
            EntityRef::Region((*region).clone()),
            format!("distances or score of {region} are not finite"),
            true,
        ));
    }

    let zero: Vec<&RegionId> = distances
        .iter()
        .filter(|(_, d)| d.positive_distance == 0.0 && d.negative_distance == 0.0)
        .map(|(r, _)| r)
        .collect();
    if !zero.is_empty() && zero.len() == distances.len() && distances.len() > 1 {
        issues.push(DiagnosticIssue::new(
            IssueCategory::AllZeroDistances,
            Severity::Warning,
            "Trial.AllZeroDistances",
            EntityRef::Root,
            format!("all {} regions have zero distances; score {}", zero.len(), params.default_score),
            true,
        ));
    } else {
        for region in zero {
            issues.push(DiagnosticIssue::new(
                IssueCategory::DegenerateScore,
                Severity::Warning,
                "Trial.DegenerateScore",
                EntityRef::Region(region.clone()),
                format!("both distances of {region} are zero; score {}", params.default_score),
                true,
            ));
        }
    }
}

// ---------- Classification of input findings ----------

fn classify(issue: &ValidationIssue, params: &EvalParams) -> DiagnosticIssue {
    use IssueCategory::*;
    let (category, repairable) = match issue.code {
        "Matrix.Empty" | "Matrix.NoIndicators" => (EmptyInput, false),
        "Cell.NaN" | "Cell.Infinite" => (InvalidValue, true),
        "Cell.Negative" => (InvalidValue, false),
        "Cell.Missing" => (MissingValue, true),
        "Region.NoIndicators" => (MissingValue, false),
        "Indicator.Incomplete" => (MissingValue, !issue.is_error()),
        "Indicator.ZeroVariance" => (NoDiscrimination, false),
        "Indicator.Outlier" => (Outlier, params.clamp_outliers),
        "Indicator.WideRange" => (ScaleSpread, false),
        "Weight.OutOfRange" => (WeightRange, false),
        c if c.starts_with("Weight.") => (MissingWeight, false),
        _ => (CalculationFailed, false),
    };
    DiagnosticIssue::new(
        category,
        issue.severity,
        issue.code,
        issue.where_.clone(),
        issue.message.clone(),
        repairable,
    )
}

fn recommendations(issues: &[DiagnosticIssue]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for issue in issues {
        if seen.insert(issue.category) {
            let n = issues.iter().filter(|i| i.category == issue.category).count();
            out.push(format!("{} ({n}): {}", issue.category, issue.category.hint()));
        }
    }
    out
}
