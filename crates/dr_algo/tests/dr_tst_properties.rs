//! Property tests over the numerical stages.

use std::collections::BTreeMap;

use dr_algo::{
    apply_weights, calculate_distances_with_default, calculate_ideal_solutions, calculator_for,
    grade, grade_all, normalize, normalize_all,
};
use dr_core::entities::Column;
use dr_core::{EvalParams, IndicatorCode, IndicatorMatrix, RegionId, Strategy as CalcStrategy, WeightSpec};
use proptest::prelude::*;
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

fn region(i: usize) -> RegionId {
    RegionId::new(format!("R{i:03}")).unwrap()
}

fn code(i: usize) -> IndicatorCode {
    IndicatorCode::new(format!("ind{i}")).unwrap()
}

fn column_of(values: &[f64]) -> Column {
    values.iter().enumerate().map(|(i, v)| (region(i), *v)).collect()
}

/// Uniform weights on a single category covering `n` indicators.
fn flat_weights(n: usize) -> WeightSpec {
    let mut w = WeightSpec::default();
    w.primary.insert("all".parse().unwrap(), 1.0);
    for i in 0..n {
        w.secondary.insert(code(i), 1.0 / n as f64);
        w.category_of.insert(code(i), "all".parse().unwrap());
    }
    w
}

fn matrix_strategy() -> impl Strategy<Value = Vec<Vec<f64>>> {
    (2usize..12, 1usize..6).prop_flat_map(|(regions, indicators)| {
        prop::collection::vec(prop::collection::vec(0.0f64..1000.0, indicators), regions)
    })
}

fn build_matrix(rows: &[Vec<f64>]) -> IndicatorMatrix {
    let mut m = IndicatorMatrix::new();
    for (i, row) in rows.iter().enumerate() {
        for (j, v) in row.iter().enumerate() {
            m.insert(region(i), code(j), *v);
        }
    }
    m
}

fn weighted_of(m: &IndicatorMatrix) -> IndicatorMatrix {
    let n = m.indicators().len();
    apply_weights(&normalize_all(&m.columns()), &flat_weights(n)).unwrap()
}

proptest! {
    #[test]
    fn normalized_column_has_unit_norm_and_keeps_sign(values in prop::collection::vec(-500.0f64..500.0, 1..20)) {
        let out = normalize(&code(0), &column_of(&values));
        let all_zero = values.iter().all(|v| *v == 0.0);
        if !all_zero {
            let norm: f64 = out.values().map(|v| v * v).sum();
            prop_assert!((norm - 1.0).abs() < 1e-9);
        }
        for (i, v) in values.iter().enumerate() {
            let n = out[&region(i)];
            prop_assert_eq!(v.signum() == n.signum() || *v == 0.0, true);
        }
    }

    #[test]
    fn zero_columns_keep_raw_zero(n in 1usize..15) {
        let zeros = vec![0.0; n];
        let out = normalize(&code(0), &column_of(&zeros));
        prop_assert!(out.values().all(|v| *v == 0.0));
    }

    #[test]
    fn positive_ideal_dominates_negative(rows in matrix_strategy()) {
        let ideal = calculate_ideal_solutions(&weighted_of(&build_matrix(&rows)));
        for (k, best) in &ideal.positive {
            prop_assert!(*best >= ideal.negative[k]);
        }
    }

    #[test]
    fn scores_stay_in_unit_interval(rows in matrix_strategy()) {
        let w = weighted_of(&build_matrix(&rows));
        let ideal = calculate_ideal_solutions(&w);
        let d = calculate_distances_with_default(&w, &ideal, 0.5).unwrap();
        for r in d.values() {
            prop_assert!(r.positive_distance >= 0.0 && r.negative_distance >= 0.0);
            prop_assert!((0.0..=1.0).contains(&r.comprehensive_score));
            if r.defaulted {
                prop_assert_eq!(r.comprehensive_score, 0.5);
            }
        }
    }

    #[test]
    fn grading_is_monotone(a in 0.0f64..1.0, b in 0.0f64..1.0, mean in 0.0f64..1.0, stdev in 0.0f64..0.6) {
        let (hi, lo) = if a >= b { (a, b) } else { (b, a) };
        prop_assert!(grade(hi, mean, stdev) >= grade(lo, mean, stdev));
    }
}

#[test]
fn seeded_cohorts_evaluate_identically_twice() {
    let mut rng = ChaCha20Rng::seed_from_u64(0x5eed_d15a);
    let rows: Vec<Vec<f64>> = (0..9)
        .map(|_| (0..4).map(|_| (rng.next_u64() >> 11) as f64 / (1u64 << 53) as f64 * 100.0).collect())
        .collect();
    let m = build_matrix(&rows);
    let params = EvalParams::default();
    let run = || {
        let out = calculator_for(CalcStrategy::Unified).calculate(&weighted_of(&m), &params).unwrap();
        let scores: BTreeMap<RegionId, f64> = out
            .distances
            .iter()
            .map(|(r, d)| (r.clone(), d.comprehensive_score))
            .collect();
        (scores.clone(), grade_all(&scores))
    };
    let (s1, g1) = run();
    let (s2, g2) = run();
    for (r, s) in &s1 {
        assert_eq!(s.to_bits(), s2[r].to_bits());
    }
    assert_eq!(g1, g2);
}

#[test]
fn medical_support_cohort_normalizes_to_recorded_constants() {
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
    let out = normalize(&code(0), &column_of(&values));
    assert!((out[&region(0)] - 0.06250719).abs() < 1e-6);
    assert!((out[&region(5)] - 0.99701340).abs() < 1e-6);
}
