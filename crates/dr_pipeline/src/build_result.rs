//! Evaluation document: the canonical, hashable artifact of one run.
//!
//! The id is `EVAL:<sha256>` over the canonical JSON of the document with
//! the `id` field removed, so identical inputs and parameters always yield
//! byte-identical documents with the same id.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use dr_core::entities::Row;
use dr_core::{CohortStats, IdealSolution, IndicatorCode, Level, LevelScheme, RegionId, Strategy};
use dr_io::hasher;
use dr_io::loader::InputDigests;

use crate::{Evaluation, PipelineError};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionDoc {
    pub normalized: Row,
    pub weighted: Row,
    pub positive_distance: f64,
    pub negative_distance: f64,
    pub score: f64,
    #[serde(default)]
    pub defaulted: bool,
    pub level: Level,
    /// Display label for `level`.
    pub label: String,
}

/// A warning or applied fix flattened to text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDoc {
    pub code: String,
    pub location: String,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvaluationDoc {
    pub id: String,
    pub strategy: Strategy,
    pub scheme: LevelScheme,
    pub cohort: CohortStats,
    pub theoretical_baseline: bool,
    pub indicators: Vec<IndicatorCode>,
    pub ideal: IdealSolution,
    pub regions: BTreeMap<RegionId, RegionDoc>,
    pub warnings: Vec<NoteDoc>,
    pub fixes: Vec<NoteDoc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<InputDigests>,
}

pub fn build_evaluation_doc(
    eval: &Evaluation,
    inputs: Option<&InputDigests>,
) -> Result<EvaluationDoc, PipelineError> {
    let regions = eval
        .regions
        .iter()
        .map(|(region, e)| {
            let doc = RegionDoc {
                normalized: e.normalized.clone(),
                weighted: e.weighted.clone(),
                positive_distance: e.distance.positive_distance,
                negative_distance: e.distance.negative_distance,
                score: e.distance.comprehensive_score,
                defaulted: e.distance.defaulted,
                level: e.grade.level,
                label: e.grade.level.label_zh().to_string(),
            };
            (region.clone(), doc)
        })
        .collect();

    let warnings = eval
        .warnings
        .iter()
        .map(|w| NoteDoc {
            code: w.code.to_string(),
            location: w.where_.to_string(),
            message: w.message.clone(),
        })
        .collect();
    let fixes = eval
        .fixes
        .iter()
        .map(|f| NoteDoc {
            code: serde_json::to_value(f.kind)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default(),
            location: f.where_.to_string(),
            message: match (f.before, f.after) {
                (Some(b), Some(a)) => format!("{}: {b} → {a}", f.note),
                (None, Some(a)) => format!("{}: {a}", f.note),
                _ => f.note.clone(),
            },
        })
        .collect();

    let mut doc = EvaluationDoc {
        id: String::new(),
        strategy: eval.strategy,
        scheme: eval.scheme,
        cohort: eval.cohort,
        theoretical_baseline: eval.theoretical_baseline,
        indicators: eval.indicators.clone(),
        ideal: eval.ideal.clone(),
        regions,
        warnings,
        fixes,
        inputs: inputs.cloned(),
    };
    doc.id = hasher::eval_id_from_canonical(&body_without_id(&doc)?)?;
    tracing::debug!(id = %doc.id, "evaluation document built");
    Ok(doc)
}

/// Recompute the id of `doc` and compare.
pub fn verify_doc_id(doc: &EvaluationDoc) -> Result<bool, PipelineError> {
    Ok(hasher::eval_id_from_canonical(&body_without_id(doc)?)? == doc.id)
}

fn body_without_id(doc: &EvaluationDoc) -> Result<Value, PipelineError> {
    let mut body = serde_json::to_value(doc).map_err(|e| PipelineError::Build(e.to_string()))?;
    if let Some(obj) = body.as_object_mut() {
        obj.remove("id");
    }
    Ok(body)
}
