//! TOPSIS: ideal solutions, Euclidean distances, closeness score, and the
//! interchangeable calculator strategies built on them.

pub mod ideal;
pub mod distance;
pub mod strategy;

pub use ideal::calculate_ideal_solutions;
pub use distance::{calculate_distances, calculate_distances_with_default};
pub use strategy::{
    calculator_for, LegacyCalculator, TopsisCalculator, TopsisOutcome, UnifiedCalculator,
};
