// crates/dr_algo/src/lib.rs
#![forbid(unsafe_code)]

//! Numerical stages of the evaluation chain:
//! normalize → weight → ideal solution → distance/score → grade.
//!
//! Every function here is pure and takes its inputs by reference; each stage
//! returns a freshly built value. Stages assume validated input (no NaN,
//! Infinite, or missing cells) unless stated otherwise.

use dr_core::{CategoryCode, IndicatorCode, RegionId};
use thiserror::Error;

pub mod normalize;
pub mod weight;
pub mod topsis;
pub mod grading;
pub mod stats;

pub use normalize::{normalize, normalize_all, zero_denominator_indicators};
pub use weight::{apply_weight, apply_weights};
pub use topsis::{
    calculate_distances, calculate_distances_with_default, calculate_ideal_solutions,
    calculator_for, LegacyCalculator, TopsisCalculator, TopsisOutcome, UnifiedCalculator,
};
pub use grading::{cohort_stats, grade, grade_absolute, grade_all, scheme_for};

/// Errors raised by the calculation stages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlgoError {
    #[error("indicator {indicator} has no owning primary category")]
    MissingCategory { indicator: IndicatorCode },

    #[error("category {category} (owner of {indicator}) has no primary weight")]
    MissingPrimaryWeight {
        indicator: IndicatorCode,
        category: CategoryCode,
    },

    #[error("indicator {indicator} has no secondary weight")]
    MissingSecondaryWeight { indicator: IndicatorCode },

    #[error("cohort is empty")]
    EmptyCohort,

    #[error("region {region} has no value for indicator {indicator}")]
    MissingCell {
        region: RegionId,
        indicator: IndicatorCode,
    },
}

impl AlgoError {
    /// Weight lookups failing is a configuration problem rather than a data one.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            AlgoError::MissingCategory { .. }
                | AlgoError::MissingPrimaryWeight { .. }
                | AlgoError::MissingSecondaryWeight { .. }
        )
    }
}
