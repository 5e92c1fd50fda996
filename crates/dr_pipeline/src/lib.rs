//! crates/dr_pipeline/src/lib.rs
#![forbid(unsafe_code)]

//! Evaluation chain orchestration:
//! select → validate → normalize → weight → TOPSIS → result check → grade.
//!
//! `evaluate` refuses input that fails validation and hands the report back.
//! `evaluate_with_repair` diagnoses first, applies the deterministic fixes
//! and refuses only what repair could not resolve. Math lives in `dr_algo`;
//! canonical JSON and hashing in `dr_io`.

use std::collections::BTreeMap;

use thiserror::Error;

use dr_algo::{
    apply_weights, calculator_for, cohort_stats, grade_all, normalize_all,
    zero_denominator_indicators, AlgoError,
};
use dr_core::entities::Row;
use dr_core::{
    CohortStats, DistanceResult, EvalParams, GradeResult, IdealSolution, IndicatorCode,
    IndicatorMatrix, LevelScheme, RegionId, Strategy, WeightSpec,
};
use dr_io::IoError;

pub mod validate;
pub mod diagnose;
pub mod repair;
pub mod build_result;

pub use build_result::{build_evaluation_doc, verify_doc_id, EvaluationDoc, NoteDoc, RegionDoc};
pub use diagnose::{diagnose, DiagnosticIssue, DiagnosticReport, IssueCategory};
pub use repair::{repair, repair_results, AppliedFix, FixKind, RepairOutcome};
pub use validate::{
    check_ideal, validate, validate_results, validate_weights, validate_with, EntityRef,
    Severity, ValidationIssue, ValidationReport,
};

// ---------------------------- Errors ----------------------------

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("input rejected by validation ({} error(s))", .0.errors().count())]
    Rejected(ValidationReport),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("{} issue(s) could not be repaired", .0.len())]
    Unresolved(Vec<DiagnosticIssue>),
    #[error("io: {0}")]
    Io(String),
    #[error("build: {0}")]
    Build(String),
}

impl From<IoError> for PipelineError {
    fn from(e: IoError) -> Self {
        match e {
            IoError::Hash(m) => PipelineError::Build(format!("hash: {m}")),
            other => PipelineError::Io(other.to_string()),
        }
    }
}

impl From<AlgoError> for PipelineError {
    fn from(e: AlgoError) -> Self {
        if e.is_configuration() {
            PipelineError::Configuration(e.to_string())
        } else {
            PipelineError::Build(e.to_string())
        }
    }
}

// ---------------------------- Outputs ----------------------------

#[derive(Clone, Debug, PartialEq)]
pub struct RegionEvaluation {
    pub normalized: Row,
    pub weighted: Row,
    pub distance: DistanceResult,
    pub grade: GradeResult,
}

/// Everything one run produced, keyed by region.
#[derive(Clone, Debug, PartialEq)]
pub struct Evaluation {
    pub strategy: Strategy,
    pub indicators: Vec<IndicatorCode>,
    pub regions: BTreeMap<RegionId, RegionEvaluation>,
    pub ideal: IdealSolution,
    pub theoretical_baseline: bool,
    pub cohort: CohortStats,
    pub scheme: LevelScheme,
    /// Warning-level findings from every check, stably ordered.
    pub warnings: Vec<ValidationIssue>,
    pub fixes: Vec<AppliedFix>,
}

impl Evaluation {
    pub fn scores(&self) -> BTreeMap<RegionId, f64> {
        self.regions
            .iter()
            .map(|(r, e)| (r.clone(), e.distance.comprehensive_score))
            .collect()
    }

    /// Regions by score descending, ties by id.
    pub fn ranking(&self) -> Vec<(&RegionId, &RegionEvaluation)> {
        let mut out: Vec<_> = self.regions.iter().collect();
        out.sort_by(|(ra, a), (rb, b)| {
            b.distance
                .comprehensive_score
                .total_cmp(&a.distance.comprehensive_score)
                .then_with(|| ra.cmp(rb))
        });
        out
    }
}

// ---------------------------- Entry points ----------------------------

/// Run the chain on input that must already be clean.
pub fn evaluate(
    matrix: &IndicatorMatrix,
    weights: &WeightSpec,
    params: &EvalParams,
) -> Result<Evaluation, PipelineError> {
    check_params(params)?;
    let matrix = select_indicators(matrix, params)?;
    let warnings = checked_input(&matrix, weights, params)?;
    run_chain(&matrix, weights, params, warnings, Vec::new())
}

/// Diagnose, repair, then run the chain on the repaired matrix.
pub fn evaluate_with_repair(
    matrix: &IndicatorMatrix,
    weights: &WeightSpec,
    params: &EvalParams,
) -> Result<Evaluation, PipelineError> {
    check_params(params)?;
    let matrix = select_indicators(matrix, params)?;

    let report = diagnose(&matrix, weights, params);
    let weight_errors: Vec<&DiagnosticIssue> = report
        .errors()
        .filter(|i| i.category == IssueCategory::MissingWeight)
        .collect();
    if !weight_errors.is_empty() {
        return Err(PipelineError::Configuration(join_messages(weight_errors)));
    }

    let outcome = repair(&report);
    if !outcome.is_complete() {
        let mismatched: Vec<&DiagnosticIssue> = outcome
            .unresolved
            .iter()
            .filter(|i| i.code == "Indicator.Incomplete")
            .collect();
        if !mismatched.is_empty() {
            return Err(PipelineError::Configuration(join_messages(mismatched)));
        }
        return Err(PipelineError::Unresolved(outcome.unresolved));
    }

    let warnings = checked_input(&outcome.matrix, weights, params)?;
    run_chain(&outcome.matrix, weights, params, warnings, outcome.applied)
}

// ---------------------------- Stages ----------------------------

fn check_params(params: &EvalParams) -> Result<(), PipelineError> {
    params
        .validate_domains()
        .map_err(|e| PipelineError::Configuration(e.to_string()))
}

fn select_indicators(
    matrix: &IndicatorMatrix,
    params: &EvalParams,
) -> Result<IndicatorMatrix, PipelineError> {
    let Some(list) = &params.indicators else {
        return Ok(matrix.clone());
    };
    let present = matrix.indicators();
    if let Some(absent) = list.iter().find(|k| !present.contains(*k)) {
        return Err(PipelineError::Configuration(format!(
            "selected indicator {absent} is not in the matrix"
        )));
    }
    Ok(matrix.select(list))
}

/// Weight errors are configuration errors; other errors reject the input.
/// Returns the warnings to carry forward.
fn checked_input(
    matrix: &IndicatorMatrix,
    weights: &WeightSpec,
    params: &EvalParams,
) -> Result<Vec<ValidationIssue>, PipelineError> {
    let weight_report = validate_weights(matrix, weights);
    if !weight_report.pass {
        let msgs: Vec<String> = weight_report.errors().map(|i| i.message.clone()).collect();
        return Err(PipelineError::Configuration(msgs.join("; ")));
    }
    let report = validate_with(matrix, params).merge(weight_report);
    if !report.pass {
        return Err(PipelineError::Rejected(report));
    }
    Ok(report.issues)
}

fn run_chain(
    matrix: &IndicatorMatrix,
    weights: &WeightSpec,
    params: &EvalParams,
    mut warnings: Vec<ValidationIssue>,
    mut fixes: Vec<AppliedFix>,
) -> Result<Evaluation, PipelineError> {
    let columns = matrix.columns();
    for code in zero_denominator_indicators(&columns) {
        warnings.push(ValidationIssue::warning(
            "Normalize.RawValue",
            EntityRef::Indicator(code.clone()),
            format!("{code} is zero in every region; raw values kept"),
        ));
    }
    let normalized = normalize_all(&columns);
    tracing::debug!(indicators = normalized.len(), "normalized");
    let weighted = apply_weights(&normalized, weights)?;

    let calculator = calculator_for(params.strategy);
    let outcome = calculator.calculate(&weighted, params)?;
    tracing::debug!(strategy = %calculator.strategy(), baseline = outcome.theoretical_baseline, "distances computed");
    if !outcome.theoretical_baseline {
        warnings.extend(check_ideal(&outcome.ideal));
    }

    let (distances, result_fixes) = repair_results(&outcome.distances, params);
    fixes.extend(result_fixes);
    let checked = validate_results(&distances, params);
    if !checked.pass {
        return Err(PipelineError::Rejected(checked));
    }
    warnings.extend(checked.issues);

    let scores: BTreeMap<RegionId, f64> =
        distances.iter().map(|(r, d)| (r.clone(), d.comprehensive_score)).collect();
    let grades = grade_all(&scores);
    let cohort = cohort_stats(&scores);
    let scheme = grades.values().next().map_or(LevelScheme::Absolute, |g| g.scheme);

    let normalized_rows = IndicatorMatrix::from_columns(&normalized);
    let mut regions = BTreeMap::new();
    for (region, distance) in distances {
        let Some(grade) = grades.get(&region).copied() else { continue };
        regions.insert(
            region.clone(),
            RegionEvaluation {
                normalized: normalized_rows.row(&region).cloned().unwrap_or_default(),
                weighted: weighted.row(&region).cloned().unwrap_or_default(),
                distance,
                grade,
            },
        );
    }

    let warnings = ValidationReport::from_issues(warnings).issues;
    tracing::info!(
        regions = regions.len(),
        strategy = %params.strategy,
        scheme = %scheme,
        mean = cohort.mean,
        stdev = cohort.stdev,
        warnings = warnings.len(),
        fixes = fixes.len(),
        "evaluation complete"
    );

    Ok(Evaluation {
        strategy: params.strategy,
        indicators: matrix.indicators().into_iter().collect(),
        regions,
        ideal: outcome.ideal,
        theoretical_baseline: outcome.theoretical_baseline,
        cohort,
        scheme,
        warnings,
        fixes,
    })
}

fn join_messages(issues: Vec<&DiagnosticIssue>) -> String {
    issues.iter().map(|i| i.message.as_str()).collect::<Vec<_>>().join("; ")
}
