//! Positive ideal = column max, negative ideal = column min.
//!
//! max == min is a legal degenerate state: that indicator then adds zero to
//! both distance sums for every region.

use dr_core::{IdealSolution, IndicatorMatrix};

pub fn calculate_ideal_solutions(weighted: &IndicatorMatrix) -> IdealSolution {
    let mut ideal = IdealSolution::default();
    for code in weighted.indicators() {
        let column = weighted.column(&code);
        let mut values = column.values().copied();
        let Some(first) = values.next() else { continue };
        let (min, max) = values.fold((first, first), |(lo, hi), v| {
            (if v < lo { v } else { lo }, if v > hi { v } else { hi })
        });
        if min == max {
            tracing::debug!(indicator = %code, value = max, "ideal solutions coincide");
        }
        ideal.positive.insert(code.clone(), max);
        ideal.negative.insert(code, min);
    }
    ideal
}
