//! crates/dr_core/src/variables.rs
//! Evaluation run parameters: defaults, wire names, and domain checks.
//!
//! Parameters are read once at run start and passed down explicitly; no
//! stage consults global state to pick a strategy.

use alloc::vec::Vec;

use crate::errors::CoreError;
use crate::ids::IndicatorCode;

token_enum!(
    /// TOPSIS calculator implementation.
    Strategy => {
        /// Plain TOPSIS over the cohort.
        Legacy = "legacy",
        /// Filters non-finite cells and builds a theoretical baseline for
        /// one-region cohorts.
        Unified = "unified",
    }
);

impl Default for Strategy {
    fn default() -> Self {
        Strategy::Unified
    }
}

pub const DEFAULT_SCORE: f64 = 0.5;
pub const DEFAULT_BASELINE_RATIO: f64 = 0.2;
pub const DEFAULT_MISSING_RATE_LIMIT: f64 = 0.5;
pub const DEFAULT_IQR_K: f64 = 1.5;
pub const DEFAULT_DISCRIMINATION_FLOOR: f64 = 0.01;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct EvalParams {
    pub strategy: Strategy,
    /// Score assigned when both ideal distances are zero.
    pub default_score: f64,
    pub single_region_handling: bool,
    /// Theoretical ideals for a one-region cohort are value·(1 ± ratio).
    pub baseline_ratio: f64,
    /// Neutral value written by repair into missing or non-finite cells.
    pub missing_fill: f64,
    /// Share of regions an indicator may be missing from and still be filled.
    pub missing_rate_limit: f64,
    pub outlier_iqr_k: f64,
    pub clamp_outliers: bool,
    pub discrimination_floor: f64,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub indicators: Option<Vec<IndicatorCode>>,
}

impl Default for EvalParams {
    fn default() -> Self {
        Self {
            strategy: Strategy::Unified,
            default_score: DEFAULT_SCORE,
            single_region_handling: true,
            baseline_ratio: DEFAULT_BASELINE_RATIO,
            missing_fill: 0.0,
            missing_rate_limit: DEFAULT_MISSING_RATE_LIMIT,
            outlier_iqr_k: DEFAULT_IQR_K,
            clamp_outliers: false,
            discrimination_floor: DEFAULT_DISCRIMINATION_FLOOR,
            indicators: None,
        }
    }
}

impl EvalParams {
    /// Reject values outside each field's domain.
    pub fn validate_domains(&self) -> Result<(), CoreError> {
        if !(0.0..=1.0).contains(&self.default_score) {
            return Err(CoreError::DomainOutOfRange("default_score"));
        }
        if !(self.baseline_ratio > 0.0 && self.baseline_ratio < 1.0) {
            return Err(CoreError::DomainOutOfRange("baseline_ratio"));
        }
        if !self.missing_fill.is_finite() || self.missing_fill < 0.0 {
            return Err(CoreError::DomainOutOfRange("missing_fill"));
        }
        if !(self.missing_rate_limit > 0.0 && self.missing_rate_limit <= 1.0) {
            return Err(CoreError::DomainOutOfRange("missing_rate_limit"));
        }
        if !(self.outlier_iqr_k.is_finite() && self.outlier_iqr_k > 0.0) {
            return Err(CoreError::DomainOutOfRange("outlier_iqr_k"));
        }
        if !(0.0..1.0).contains(&self.discrimination_floor) {
            return Err(CoreError::DomainOutOfRange("discrimination_floor"));
        }
        if let Some(list) = &self.indicators {
            if list.is_empty() {
                return Err(CoreError::DomainOutOfRange("indicators"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_domain_checks() {
        let p = EvalParams::default();
        assert_eq!(p.validate_domains(), Ok(()));
        assert_eq!(p.default_score, 0.5);
        assert_eq!(p.strategy, Strategy::Unified);
    }

    #[test]
    fn out_of_range_fields_are_named() {
        let p = EvalParams { default_score: 1.5, ..EvalParams::default() };
        assert_eq!(p.validate_domains(), Err(CoreError::DomainOutOfRange("default_score")));
        let p = EvalParams { baseline_ratio: 0.0, ..EvalParams::default() };
        assert_eq!(p.validate_domains(), Err(CoreError::DomainOutOfRange("baseline_ratio")));
        let p = EvalParams { indicators: Some(Vec::new()), ..EvalParams::default() };
        assert_eq!(p.validate_domains(), Err(CoreError::DomainOutOfRange("indicators")));
    }

    #[test]
    fn strategy_tokens() {
        assert_eq!("legacy".parse::<Strategy>().unwrap(), Strategy::Legacy);
        assert!("fast".parse::<Strategy>().is_err());
        assert_eq!(Strategy::Unified.as_str(), "unified");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn partial_json_fills_defaults() {
        let p: EvalParams = serde_json::from_str(r#"{"strategy":"legacy","default_score":0.4}"#).unwrap();
        assert_eq!(p.strategy, Strategy::Legacy);
        assert_eq!(p.default_score, 0.4);
        assert_eq!(p.baseline_ratio, DEFAULT_BASELINE_RATIO);
        assert!(serde_json::from_str::<EvalParams>(r#"{"bogus":1}"#).is_err());
    }
}
