//! crates/dr_core/src/directive.rs
//! TOPSIS step directive: `@TOPSIS_POSITIVE:a,b,c` / `@TOPSIS_NEGATIVE:a,b,c`.
//!
//! A model step names the indicator columns it ranks on and which distance it
//! publishes as its output. This is a fixed two-keyword form, not an
//! expression language.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::str::FromStr;

use crate::errors::CoreError;
use crate::ids::IndicatorCode;

token_enum!(
    /// Distance a TOPSIS step publishes.
    DistanceOutput => {
        Positive = "positive",
        Negative = "negative",
    }
);

const POSITIVE_KEYWORD: &str = "TOPSIS_POSITIVE";
const NEGATIVE_KEYWORD: &str = "TOPSIS_NEGATIVE";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TopsisDirective {
    pub output: DistanceOutput,
    pub indicators: Vec<IndicatorCode>,
}

impl FromStr for TopsisDirective {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .trim()
            .strip_prefix('@')
            .ok_or(CoreError::BadDirective("missing '@'"))?;
        let (keyword, list) = body
            .split_once(':')
            .ok_or(CoreError::BadDirective("missing ':'"))?;
        let output = match keyword.trim() {
            POSITIVE_KEYWORD => DistanceOutput::Positive,
            NEGATIVE_KEYWORD => DistanceOutput::Negative,
            _ => return Err(CoreError::BadDirective("unknown keyword")),
        };
        let indicators = list
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| t.parse::<IndicatorCode>())
            .collect::<Result<Vec<_>, _>>()?;
        if indicators.is_empty() {
            return Err(CoreError::BadDirective("empty indicator list"));
        }
        Ok(Self { output, indicators })
    }
}

impl fmt::Display for TopsisDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = match self.output {
            DistanceOutput::Positive => POSITIVE_KEYWORD,
            DistanceOutput::Negative => NEGATIVE_KEYWORD,
        };
        let list: Vec<&str> = self.indicators.iter().map(IndicatorCode::as_str).collect();
        write!(f, "@{keyword}:{}", list.join(","))
    }
}

impl TopsisDirective {
    pub fn to_expression(&self) -> String {
        alloc::format!("{self}")
    }
}
