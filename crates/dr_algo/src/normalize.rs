//! Vector normalization of one indicator column: v / sqrt(Σ v²).
//!
//! A column whose values are all zero has a zero denominator; every region
//! then keeps its raw value. Returning a uniform constant there would erase
//! all later discrimination for the indicator.

use std::collections::BTreeMap;

use dr_core::entities::Column;
use dr_core::IndicatorCode;

/// Normalize one indicator across the cohort.
pub fn normalize(indicator: &IndicatorCode, values: &Column) -> Column {
    let denominator = values.values().map(|v| v * v).sum::<f64>().sqrt();
    if denominator == 0.0 {
        tracing::debug!(%indicator, "zero denominator, keeping raw values");
        return values.clone();
    }
    values
        .iter()
        .map(|(region, v)| (region.clone(), v / denominator))
        .collect()
}

/// Normalize every column independently.
pub fn normalize_all(columns: &BTreeMap<IndicatorCode, Column>) -> BTreeMap<IndicatorCode, Column> {
    columns
        .iter()
        .map(|(code, col)| (code.clone(), normalize(code, col)))
        .collect()
}

/// Columns that take the raw-value branch of [`normalize`].
pub fn zero_denominator_indicators(columns: &BTreeMap<IndicatorCode, Column>) -> Vec<IndicatorCode> {
    columns
        .iter()
        .filter(|(_, col)| col.values().all(|v| *v == 0.0))
        .map(|(code, _)| code.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dr_core::RegionId;

    fn column(values: &[f64]) -> Column {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (RegionId::new(format!("r{i:02}")).unwrap(), *v))
            .collect()
    }

    fn code() -> IndicatorCode {
        "x".parse().unwrap()
    }

    #[test]
    fn unit_norm() {
        let out = normalize(&code(), &column(&[3.0, 4.0]));
        let v: Vec<f64> = out.values().copied().collect();
        assert!((v[0] - 0.6).abs() < 1e-12);
        assert!((v[1] - 0.8).abs() < 1e-12);
    }

    #[test]
    fn zero_denominator_returns_raw_values() {
        let input = column(&[0.0, 0.0, 0.0]);
        let out = normalize(&code(), &input);
        assert_eq!(out, input);
        let mut cols = BTreeMap::new();
        cols.insert(code(), input);
        assert_eq!(zero_denominator_indicators(&cols), vec![code()]);
    }

    #[test]
    fn seven_ones_give_inverse_sqrt_seven() {
        let out = normalize(&code(), &column(&[1.0; 7]));
        for v in out.values() {
            assert!((v - 0.377964473).abs() < 1e-9, "{v}");
            assert!((v - 1.0 / 7f64.sqrt()).abs() < 1e-15);
        }
    }

    #[test]
    fn sign_is_preserved() {
        let out = normalize(&code(), &column(&[-2.0, 1.0]));
        let v: Vec<f64> = out.values().copied().collect();
        assert!(v[0] < 0.0 && v[1] > 0.0);
    }

    #[test]
    fn empty_column_stays_empty() {
        assert!(normalize(&code(), &Column::new()).is_empty());
    }
}
