//! Report JSON renderer.
//!
//! Section order is fixed: cover → cohort → ranking → distribution → ideal →
//! warnings → fixes → integrity. Key order inside each object follows
//! insertion order (`serde_json/preserve_order`).

use serde_json::{Map as JsonMap, Value};

use crate::{CohortBlock, Cover, IdealRow, Integrity, LevelCount, NoteRow, RankRow, ReportModel};

pub fn render_json(m: &ReportModel) -> Value {
    let mut root = obj();
    root.insert("cover".into(), cover_json(&m.cover));
    root.insert("cohort".into(), cohort_json(&m.cohort));
    root.insert("ranking".into(), Value::Array(m.ranking.iter().map(rank_json).collect()));
    root.insert(
        "distribution".into(),
        Value::Array(m.distribution.iter().map(level_count_json).collect()),
    );
    root.insert("ideal".into(), Value::Array(m.ideal.iter().map(ideal_json).collect()));
    root.insert("warnings".into(), notes_json(&m.warnings));
    root.insert("fixes".into(), notes_json(&m.fixes));
    root.insert("integrity".into(), integrity_json(&m.integrity));
    Value::Object(root)
}

/// Pretty text with a trailing newline.
pub fn render_json_string(m: &ReportModel) -> Result<String, serde_json::Error> {
    let mut s = serde_json::to_string_pretty(&render_json(m))?;
    s.push('\n');
    Ok(s)
}

/* ----------------------- sections ----------------------- */

fn cover_json(c: &Cover) -> Value {
    let mut o = obj();
    o.insert("strategy".into(), Value::String(c.strategy.clone()));
    o.insert("scheme".into(), Value::String(c.scheme.clone()));
    o.insert("region_count".into(), Value::from(c.region_count));
    o.insert(
        "indicators".into(),
        Value::Array(c.indicators.iter().cloned().map(Value::String).collect()),
    );
    // Only present when the baseline was used.
    if c.theoretical_baseline {
        o.insert("theoretical_baseline".into(), Value::Bool(true));
    }
    Value::Object(o)
}

fn cohort_json(c: &CohortBlock) -> Value {
    let mut o = obj();
    o.insert("count".into(), Value::from(c.count));
    o.insert("mean".into(), Value::String(c.mean.clone()));
    o.insert("stdev".into(), Value::String(c.stdev.clone()));
    Value::Object(o)
}

fn rank_json(r: &RankRow) -> Value {
    let mut o = obj();
    o.insert("rank".into(), Value::from(r.rank));
    o.insert("region".into(), Value::String(r.region.clone()));
    o.insert("score".into(), Value::String(r.score.clone()));
    o.insert("level".into(), Value::String(r.level.as_str().into()));
    o.insert("label".into(), Value::String(r.label.clone()));
    o.insert("positive_distance".into(), Value::String(r.positive_distance.clone()));
    o.insert("negative_distance".into(), Value::String(r.negative_distance.clone()));
    if r.defaulted {
        o.insert("defaulted".into(), Value::Bool(true));
    }
    Value::Object(o)
}

fn level_count_json(c: &LevelCount) -> Value {
    let mut o = obj();
    o.insert("level".into(), Value::String(c.level.as_str().into()));
    o.insert("label".into(), Value::String(c.label.clone()));
    o.insert("count".into(), Value::from(c.count));
    o.insert("share_pct".into(), Value::String(c.share_pct_1dp.clone()));
    Value::Object(o)
}

fn ideal_json(r: &IdealRow) -> Value {
    let mut o = obj();
    o.insert("indicator".into(), Value::String(r.indicator.clone()));
    o.insert("positive".into(), Value::String(r.positive.clone()));
    o.insert("negative".into(), Value::String(r.negative.clone()));
    o.insert("spread".into(), Value::String(r.spread.clone()));
    Value::Object(o)
}

fn notes_json(notes: &[NoteRow]) -> Value {
    Value::Array(
        notes
            .iter()
            .map(|n| {
                let mut o = obj();
                o.insert("code".into(), Value::String(n.code.clone()));
                o.insert("location".into(), Value::String(n.location.clone()));
                o.insert("message".into(), Value::String(n.message.clone()));
                Value::Object(o)
            })
            .collect(),
    )
}

fn integrity_json(i: &Integrity) -> Value {
    let mut o = obj();
    o.insert("evaluation_id".into(), Value::String(i.evaluation_id.clone()));
    for (key, digest) in [
        ("matrix_sha256", &i.matrix_sha256),
        ("weights_sha256", &i.weights_sha256),
        ("params_sha256", &i.params_sha256),
    ] {
        if let Some(d) = digest {
            o.insert(key.into(), Value::String(d.clone()));
        }
    }
    Value::Object(o)
}

#[inline]
fn obj() -> JsonMap<String, Value> {
    JsonMap::new()
}
