//! dr_report: presentation model over an evaluation document.
//!
//! The renderer reads a finished `EvaluationDoc` and never recomputes scores,
//! levels or cohort statistics. Numbers are formatted once here, so the JSON
//! and HTML renderings show identical text.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use dr_core::{Level, LevelScheme};
use dr_pipeline::{EvaluationDoc, NoteDoc};

#[cfg(feature = "render_html")]
pub mod render_html;
#[cfg(feature = "render_json")]
pub mod render_json;

#[cfg(feature = "render_html")]
pub use render_html::render_html;
#[cfg(feature = "render_json")]
pub use render_json::{render_json, render_json_string};

/// Decimal places for scores and distances.
pub const SCORE_DP: usize = 4;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("evaluation document unreadable: {0}")]
    Json(String),
    #[error("missing field: {0}")]
    MissingField(String),
    #[error("inconsistent document: {0}")]
    Inconsistent(String),
}

// ---------- model ----------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cover {
    pub strategy: String,
    pub scheme: String,
    pub region_count: usize,
    pub indicators: Vec<String>,
    /// One-region cohort scored against a theoretical baseline.
    pub theoretical_baseline: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortBlock {
    pub count: usize,
    pub mean: String,
    pub stdev: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankRow {
    /// Competition rank: equal scores share a rank.
    pub rank: usize,
    pub region: String,
    pub score: String,
    pub level: Level,
    pub label: String,
    pub positive_distance: String,
    pub negative_distance: String,
    pub defaulted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelCount {
    pub level: Level,
    pub label: String,
    pub count: usize,
    pub share_pct_1dp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdealRow {
    pub indicator: String,
    pub positive: String,
    pub negative: String,
    pub spread: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteRow {
    pub code: String,
    pub location: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Integrity {
    pub evaluation_id: String,
    pub matrix_sha256: Option<String>,
    pub weights_sha256: Option<String>,
    pub params_sha256: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportModel {
    pub cover: Cover,
    pub cohort: CohortBlock,
    pub ranking: Vec<RankRow>,
    pub distribution: Vec<LevelCount>,
    pub ideal: Vec<IdealRow>,
    pub warnings: Vec<NoteRow>,
    pub fixes: Vec<NoteRow>,
    pub integrity: Integrity,
}

// ---------- building ----------

/// Build the model from a typed document.
pub fn build_model(doc: &EvaluationDoc) -> Result<ReportModel, ReportError> {
    if !doc.id.starts_with("EVAL:") {
        return Err(ReportError::Inconsistent(format!("unexpected id {:?}", doc.id)));
    }
    if doc.regions.is_empty() {
        return Err(ReportError::MissingField("regions".into()));
    }

    let ranking = rank_rows(doc)?;
    let distribution = level_distribution(doc.scheme, &ranking);

    let ideal = doc
        .indicators
        .iter()
        .map(|k| {
            let pos = doc.ideal.positive.get(k).copied();
            let neg = doc.ideal.negative.get(k).copied();
            match (pos, neg) {
                (Some(p), Some(n)) => Ok(IdealRow {
                    indicator: k.to_string(),
                    positive: fmt_fixed(p, SCORE_DP),
                    negative: fmt_fixed(n, SCORE_DP),
                    spread: fmt_fixed(p - n, SCORE_DP),
                }),
                _ => Err(ReportError::MissingField(format!("ideal/{k}"))),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ReportModel {
        cover: Cover {
            strategy: doc.strategy.to_string(),
            scheme: doc.scheme.to_string(),
            region_count: doc.regions.len(),
            indicators: doc.indicators.iter().map(ToString::to_string).collect(),
            theoretical_baseline: doc.theoretical_baseline,
        },
        cohort: CohortBlock {
            count: doc.cohort.count,
            mean: fmt_fixed(doc.cohort.mean, SCORE_DP),
            stdev: fmt_fixed(doc.cohort.stdev, SCORE_DP),
        },
        ranking,
        distribution,
        ideal,
        warnings: doc.warnings.iter().map(note_row).collect(),
        fixes: doc.fixes.iter().map(note_row).collect(),
        integrity: Integrity {
            evaluation_id: doc.id.clone(),
            matrix_sha256: doc.inputs.as_ref().map(|d| d.matrix_sha256.clone()),
            weights_sha256: doc.inputs.as_ref().map(|d| d.weights_sha256.clone()),
            params_sha256: doc.inputs.as_ref().and_then(|d| d.params_sha256.clone()),
        },
    })
}

/// Build the model from a document read back as JSON.
pub fn build_model_from_value(v: &Value) -> Result<ReportModel, ReportError> {
    let doc: EvaluationDoc =
        serde_json::from_value(v.clone()).map_err(|e| ReportError::Json(e.to_string()))?;
    build_model(&doc)
}

fn rank_rows(doc: &EvaluationDoc) -> Result<Vec<RankRow>, ReportError> {
    let mut rows: Vec<_> = doc.regions.iter().collect();
    if let Some((region, _)) = rows.iter().find(|(_, r)| !r.score.is_finite()) {
        return Err(ReportError::Inconsistent(format!("non-finite score for {region}")));
    }
    // Score descending, region id ascending on ties.
    rows.sort_by(|(ra, a), (rb, b)| b.score.total_cmp(&a.score).then_with(|| ra.cmp(rb)));

    let mut out = Vec::with_capacity(rows.len());
    let mut prev: Option<f64> = None;
    let mut rank = 0usize;
    for (i, (region, r)) in rows.into_iter().enumerate() {
        if prev != Some(r.score) {
            rank = i + 1;
            prev = Some(r.score);
        }
        out.push(RankRow {
            rank,
            region: region.to_string(),
            score: fmt_fixed(r.score, SCORE_DP),
            level: r.level,
            label: r.label.clone(),
            positive_distance: fmt_fixed(r.positive_distance, SCORE_DP),
            negative_distance: fmt_fixed(r.negative_distance, SCORE_DP),
            defaulted: r.defaulted,
        });
    }
    Ok(out)
}

/// Counts per level of the scheme, strongest first, zeros included.
fn level_distribution(scheme: LevelScheme, ranking: &[RankRow]) -> Vec<LevelCount> {
    let total = ranking.len();
    scheme
        .levels()
        .iter()
        .map(|&level| {
            let count = ranking.iter().filter(|r| r.level == level).count();
            LevelCount {
                level,
                label: level.label_zh().to_string(),
                count,
                share_pct_1dp: fmt_pct_1dp(count, total),
            }
        })
        .collect()
}

fn note_row(n: &NoteDoc) -> NoteRow {
    NoteRow {
        code: n.code.clone(),
        location: n.location.clone(),
        message: n.message.clone(),
    }
}

// ---------- formatting ----------

/// Fixed decimals; non-finite values print as `n/a`.
pub fn fmt_fixed(v: f64, dp: usize) -> String {
    if v.is_finite() {
        let s = format!("{v:.dp$}");
        // Avoid "-0.0000".
        if s.starts_with('-') && s[1..].chars().all(|c| c == '0' || c == '.') {
            s[1..].to_string()
        } else {
            s
        }
    } else {
        "n/a".to_string()
    }
}

/// Share as a percentage with one decimal, half-up on integer tenths.
pub fn fmt_pct_1dp(part: usize, total: usize) -> String {
    if total == 0 {
        return "0.0".to_string();
    }
    let tenths = (part as u128 * 1000 + total as u128 / 2) / total as u128;
    format!("{}.{}", tenths / 10, tenths % 10)
}
