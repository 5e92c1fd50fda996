//! Cohort-relative grading.
//!
//! The number of bands depends on how the cohort mean μ compares with its
//! sample standard deviation σ:
//!
//! | condition      | thresholds (strongest first)          | levels |
//! |----------------|---------------------------------------|--------|
//! | μ ≤ 0.5σ       | μ+1.5σ, μ+0.5σ                        | 3      |
//! | μ ≤ 1.5σ       | μ+1.5σ, μ+0.5σ, μ−0.5σ                | 4      |
//! | otherwise      | μ+1.5σ, μ+0.5σ, μ−0.5σ, μ−1.5σ        | 5      |
//!
//! Scores are clamped at 0, compared with `>=` from the top; ties go to the
//! stronger level. A one-region cohort has no σ and uses fixed bands.

use std::collections::BTreeMap;

use dr_core::{CohortStats, GradeResult, Level, LevelScheme, RegionId};

use crate::stats;

/// Fixed bands used when the cohort has a single region.
pub const ABSOLUTE_BANDS: [(f64, Level); 4] = [
    (0.8, Level::Strong),
    (0.6, Level::AboveAverage),
    (0.4, Level::Average),
    (0.2, Level::BelowAverage),
];

pub fn scheme_for(mean: f64, stdev: f64) -> LevelScheme {
    if mean <= 0.5 * stdev {
        LevelScheme::Three
    } else if mean <= 1.5 * stdev {
        LevelScheme::Four
    } else {
        LevelScheme::Five
    }
}

/// Threshold ladder for one cohort plus the level below the last rung.
fn ladder(mean: f64, stdev: f64) -> (Vec<(f64, Level)>, Level) {
    let mut rungs = vec![
        (mean + 1.5 * stdev, Level::Strong),
        (mean + 0.5 * stdev, Level::AboveAverage),
    ];
    match scheme_for(mean, stdev) {
        LevelScheme::Three => (rungs, Level::Average),
        LevelScheme::Four => {
            rungs.push((mean - 0.5 * stdev, Level::Average));
            (rungs, Level::Weak)
        }
        LevelScheme::Five | LevelScheme::Absolute => {
            rungs.push((mean - 0.5 * stdev, Level::Average));
            rungs.push((mean - 1.5 * stdev, Level::BelowAverage));
            (rungs, Level::Weak)
        }
    }
}

pub fn grade(score: f64, mean: f64, stdev: f64) -> Level {
    let s = score.max(0.0);
    let (rungs, floor) = ladder(mean, stdev);
    rungs
        .into_iter()
        .find(|(threshold, _)| s >= *threshold)
        .map_or(floor, |(_, level)| level)
}

pub fn grade_absolute(score: f64) -> Level {
    let s = score.max(0.0);
    ABSOLUTE_BANDS
        .iter()
        .find(|(threshold, _)| s >= *threshold)
        .map_or(Level::Weak, |(_, level)| *level)
}

/// μ and sample σ over all scores (σ = 0 below two regions).
pub fn cohort_stats(scores: &BTreeMap<RegionId, f64>) -> CohortStats {
    let values: Vec<f64> = scores.values().copied().collect();
    CohortStats {
        count: values.len(),
        mean: stats::mean(&values).unwrap_or(0.0),
        stdev: stats::sample_stdev(&values).unwrap_or(0.0),
    }
}

/// Grade every region against the same cohort μ and σ, computed once.
pub fn grade_all(scores: &BTreeMap<RegionId, f64>) -> BTreeMap<RegionId, GradeResult> {
    let cohort = cohort_stats(scores);
    if cohort.count <= 1 {
        return scores
            .iter()
            .map(|(r, s)| {
                let g = GradeResult { score: *s, level: grade_absolute(*s), scheme: LevelScheme::Absolute };
                (r.clone(), g)
            })
            .collect();
    }
    let scheme = scheme_for(cohort.mean, cohort.stdev);
    tracing::debug!(mean = cohort.mean, stdev = cohort.stdev, scheme = %scheme, "grading cohort");
    scores
        .iter()
        .map(|(r, s)| {
            let level = grade(*s, cohort.mean, cohort.stdev);
            (r.clone(), GradeResult { score: *s, level, scheme })
        })
        .collect()
}
