//! End-to-end scenarios through the public pipeline surface.

use std::collections::BTreeMap;
use std::fs;

use dr_algo::{grade, scheme_for};
use dr_core::{
    EvalParams, IndicatorCode, IndicatorMatrix, Level, LevelScheme, RegionId, Strategy, WeightSpec,
};
use dr_io::canonical_json::to_canonical_bytes;
use dr_io::loader::load_inputs;
use dr_pipeline::{
    build_evaluation_doc, diagnose, evaluate, evaluate_with_repair, repair, validate,
    IssueCategory, PipelineError,
};

fn r(s: &str) -> RegionId {
    s.parse().unwrap()
}

fn k(s: &str) -> IndicatorCode {
    s.parse().unwrap()
}

fn unit_weights(codes: &[&str]) -> WeightSpec {
    let mut w = WeightSpec::default();
    w.primary.insert("support".parse().unwrap(), 1.0);
    for c in codes {
        w.category_of.insert(k(c), "support".parse().unwrap());
        w.secondary.insert(k(c), 1.0);
    }
    w
}

fn single_column(code: &str, values: &[f64]) -> IndicatorMatrix {
    let mut m = IndicatorMatrix::new();
    for (i, v) in values.iter().enumerate() {
        m.insert(r(&format!("r{i:02}")), k(code), *v);
    }
    m
}

// ---------- Scenario A: medical-support normalization ----------

#[test]
fn scenario_a_medical_support_constants() {
    let values = [
        98.65304408130,
        34.72770323599,
        0.022003691542529666,
        0.027725570423269917,
        43.75835663060,
        1573.553483737,
        0.9970134001247958,
        20.31045988684,
        0.012868835332992337,
        25.14235007025,
        0.015930351392393648,
        30.96294767261,
        0.019618318700953107,
    ];
    let m = single_column("medical", &values);
    let e = evaluate(&m, &unit_weights(&["medical"]), &EvalParams::default()).unwrap();
    let normalized = |i: usize| e.regions[&r(&format!("r{i:02}"))].normalized[&k("medical")];
    assert!((normalized(0) - 0.06250719).abs() < 1e-6);
    assert!((normalized(5) - 0.99701340).abs() < 1e-6);
    // Spread of the raw data is reported, not refused.
    assert!(e.warnings.iter().any(|w| w.code == "Indicator.WideRange"));
}

// ---------- Scenario B: identical risk indicator ----------

#[test]
fn scenario_b_identical_values_normalize_to_inverse_sqrt_n() {
    let mut m = single_column("risk", &[1.0; 7]);
    for i in 0..7 {
        m.insert(r(&format!("r{i:02}")), k("staff"), i as f64 + 1.0);
    }
    let e = evaluate(&m, &unit_weights(&["risk", "staff"]), &EvalParams::default()).unwrap();
    for region in e.regions.values() {
        assert!((region.normalized[&k("risk")] - 0.377964473).abs() < 1e-9);
    }
    assert!(e.warnings.iter().any(|w| w.code == "Indicator.ZeroVariance"));
    assert!(e.warnings.iter().any(|w| w.code == "Ideal.NoDiscrimination"));
    assert_eq!(e.ideal.spread(&k("risk")), Some(0.0));
}

// ---------- Scenario C: grading ----------

#[test]
fn scenario_c_four_level_cohort_top_grade() {
    let (mean, stdev) = (0.261566249, 0.275550796);
    assert_eq!(scheme_for(mean, stdev), LevelScheme::Four);
    assert_eq!(grade(0.765739184, mean, stdev), Level::Strong);
    assert_eq!(Level::Strong.label_zh(), "强");
}

// ---------- Scenario D: single region ----------

#[test]
fn scenario_d_single_region_gets_neutral_score() {
    let mut m = IndicatorMatrix::new();
    m.insert(r("only"), k("staff"), 12.0);
    m.insert(r("only"), k("funds"), 3.5);
    let w = unit_weights(&["staff", "funds"]);

    for strategy in [Strategy::Legacy, Strategy::Unified] {
        let params = EvalParams { strategy, ..Default::default() };
        let e = evaluate(&m, &w, &params).unwrap();
        let only = &e.regions[&r("only")];
        let s = only.distance.comprehensive_score;
        assert!(s.is_finite(), "{strategy}: NaN score");
        assert!((s - 0.5).abs() < 1e-9, "{strategy}: {s}");
        assert_eq!(e.scheme, LevelScheme::Absolute);
        assert_eq!(only.grade.level, Level::Average);
    }

    let legacy = evaluate(&m, &w, &EvalParams { strategy: Strategy::Legacy, ..Default::default() }).unwrap();
    assert!(legacy.regions[&r("only")].distance.defaulted);
    let unified = evaluate(&m, &w, &EvalParams::default()).unwrap();
    assert!(unified.theoretical_baseline);
}

// ---------- validation → repair → evaluate ----------

fn dirty() -> IndicatorMatrix {
    let mut m = IndicatorMatrix::new();
    let rows = [
        ("青竹", 12.0, 3.5),
        ("白马", 4.0, f64::INFINITY),
        ("石桥", 7.0, 1.0),
        ("河口", 9.0, 2.0),
    ];
    for (name, staff, funds) in rows {
        m.insert(r(name), k("staff"), staff);
        m.insert(r(name), k("funds"), funds);
    }
    m.insert(r("新村"), k("staff"), 5.0);
    m
}

#[test]
fn dirty_input_is_rejected_then_repaired() {
    let m = dirty();
    let w = unit_weights(&["staff", "funds"]);
    let params = EvalParams::default();

    let report = validate(&m);
    assert!(!report.pass);
    match evaluate(&m, &w, &params) {
        Err(PipelineError::Rejected(rep)) => assert_eq!(rep.errors().count(), report.errors().count()),
        other => panic!("expected rejection, got {other:?}"),
    }

    let diag = diagnose(&m, &w, &params);
    assert!(!diag.healthy);
    assert!(diag.by_category(IssueCategory::InvalidValue).any(|i| i.repairable));
    assert!(diag.by_category(IssueCategory::MissingValue).any(|i| i.repairable));

    let fixed = repair(&diag);
    assert!(fixed.is_complete(), "{:?}", fixed.unresolved);
    assert_eq!(fixed.matrix.get(&r("白马"), &k("funds")), Some(0.0));
    assert_eq!(fixed.matrix.get(&r("新村"), &k("funds")), Some(0.0));

    let direct = evaluate(&fixed.matrix, &w, &params).unwrap();
    let repaired = evaluate_with_repair(&m, &w, &params).unwrap();
    assert_eq!(direct.scores(), repaired.scores());
    assert_eq!(repaired.fixes.len(), fixed.applied.len());
}

#[test]
fn unreconcilable_gaps_are_configuration_errors() {
    let mut m = IndicatorMatrix::new();
    for (i, name) in ["a", "b", "c", "d"].iter().enumerate() {
        m.insert(r(name), k("staff"), 1.0 + i as f64);
    }
    m.insert(r("a"), k("funds"), 2.0);
    let err = evaluate_with_repair(&m, &unit_weights(&["staff", "funds"]), &EvalParams::default())
        .unwrap_err();
    assert!(matches!(err, PipelineError::Configuration(_)), "{err}");
}

// ---------- determinism ----------

#[test]
fn identical_runs_produce_identical_documents() {
    let mut m = IndicatorMatrix::new();
    let mut seed: u64 = 0x5eed;
    for i in 0..9 {
        for j in 0..4 {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            m.insert(r(&format!("r{i}")), k(&format!("k{j}")), (seed >> 40) as f64 / 1000.0);
        }
    }
    let w = unit_weights(&["k0", "k1", "k2", "k3"]);
    let a = build_evaluation_doc(&evaluate(&m, &w, &EvalParams::default()).unwrap(), None).unwrap();
    let b = build_evaluation_doc(&evaluate(&m, &w, &EvalParams::default()).unwrap(), None).unwrap();
    assert_eq!(to_canonical_bytes(&a).unwrap(), to_canonical_bytes(&b).unwrap());

    let levels: BTreeMap<&RegionId, Level> = a.regions.iter().map(|(r, d)| (r, d.level)).collect();
    assert_eq!(levels.len(), 9);
}

#[test]
fn files_on_disk_evaluate_with_digests() {
    let dir = tempfile::tempdir().unwrap();
    let matrix = dir.path().join("matrix.json");
    let weights = dir.path().join("weights.json");
    fs::write(
        &matrix,
        r#"{"regions":{"a":{"staff":3,"funds":1},"b":{"staff":1,"funds":2},"c":{"staff":2,"funds":3}}}"#,
    )
    .unwrap();
    fs::write(
        &weights,
        r#"{"primary":{"team":0.6},"secondary":{"staff":0.5,"funds":0.5},"category_of":{"staff":"team","funds":"team"}}"#,
    )
    .unwrap();

    let loaded = load_inputs(&matrix, &weights, None).unwrap();
    let e = evaluate(&loaded.matrix, &loaded.weights, &loaded.params).unwrap();
    let doc = build_evaluation_doc(&e, Some(&loaded.digests)).unwrap();
    assert!(doc.id.starts_with("EVAL:"));
    assert_eq!(doc.inputs.as_ref().unwrap().matrix_sha256, loaded.digests.matrix_sha256);
    assert_eq!(doc.regions.len(), 3);
}
