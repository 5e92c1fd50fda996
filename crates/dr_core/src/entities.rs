//! crates/dr_core/src/entities.rs
//! Data carried between pipeline stages. Every stage builds a new value;
//! nothing here is mutated in place by the engine.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;

use crate::ids::{CategoryCode, IndicatorCode, RegionId};

/// One region's indicator values.
pub type Row = BTreeMap<IndicatorCode, f64>;

/// Indicator values of one column, keyed by region.
pub type Column = BTreeMap<RegionId, f64>;

// ---------- IndicatorMatrix ----------

/// region → indicator → value. Ordered maps keep every traversal deterministic.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct IndicatorMatrix {
    rows: BTreeMap<RegionId, Row>,
}

impl IndicatorMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: BTreeMap<RegionId, Row>) -> Self {
        Self { rows }
    }

    /// Transpose indicator-major columns into a region-major matrix.
    pub fn from_columns(columns: &BTreeMap<IndicatorCode, Column>) -> Self {
        let mut rows: BTreeMap<RegionId, Row> = BTreeMap::new();
        for (code, column) in columns {
            for (region, v) in column {
                rows.entry(region.clone()).or_default().insert(code.clone(), *v);
            }
        }
        Self { rows }
    }

    pub fn insert(&mut self, region: RegionId, indicator: IndicatorCode, value: f64) {
        self.rows.entry(region).or_default().insert(indicator, value);
    }

    /// Register a region with no cells yet.
    pub fn insert_region(&mut self, region: RegionId) {
        self.rows.entry(region).or_default();
    }

    #[inline]
    pub fn rows(&self) -> &BTreeMap<RegionId, Row> {
        &self.rows
    }

    #[inline]
    pub fn row(&self, region: &RegionId) -> Option<&Row> {
        self.rows.get(region)
    }

    #[inline]
    pub fn get(&self, region: &RegionId, indicator: &IndicatorCode) -> Option<f64> {
        self.rows.get(region).and_then(|r| r.get(indicator)).copied()
    }

    #[inline]
    pub fn region_count(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn regions(&self) -> impl Iterator<Item = &RegionId> {
        self.rows.keys()
    }

    /// Union of indicator codes over all regions.
    pub fn indicators(&self) -> BTreeSet<IndicatorCode> {
        self.rows.values().flat_map(|r| r.keys().cloned()).collect()
    }

    /// Present cells of one indicator (regions lacking the cell are skipped).
    pub fn column(&self, indicator: &IndicatorCode) -> Column {
        self.rows
            .iter()
            .filter_map(|(region, row)| row.get(indicator).map(|v| (region.clone(), *v)))
            .collect()
    }

    /// Indicator-major view over the indicator union.
    pub fn columns(&self) -> BTreeMap<IndicatorCode, Column> {
        self.indicators()
            .into_iter()
            .map(|k| {
                let col = self.column(&k);
                (k, col)
            })
            .collect()
    }

    /// Keep only the listed indicators (codes absent from the matrix stay absent).
    pub fn select(&self, indicators: &[IndicatorCode]) -> Self {
        let keep: BTreeSet<&IndicatorCode> = indicators.iter().collect();
        let rows = self
            .rows
            .iter()
            .map(|(region, row)| {
                let r: Row = row
                    .iter()
                    .filter(|(k, _)| keep.contains(k))
                    .map(|(k, v)| (k.clone(), *v))
                    .collect();
                (region.clone(), r)
            })
            .collect();
        Self { rows }
    }

    pub fn cell_count(&self) -> usize {
        self.rows.values().map(|r| r.len()).sum()
    }
}

// ---------- WeightSpec ----------

/// Two-level weights. Sibling weights need not sum to 1.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
pub struct WeightSpec {
    pub primary: BTreeMap<CategoryCode, f64>,
    pub secondary: BTreeMap<IndicatorCode, f64>,
    pub category_of: BTreeMap<IndicatorCode, CategoryCode>,
}

impl WeightSpec {
    #[inline]
    pub fn category(&self, indicator: &IndicatorCode) -> Option<&CategoryCode> {
        self.category_of.get(indicator)
    }

    pub fn primary_for(&self, indicator: &IndicatorCode) -> Option<f64> {
        self.category(indicator).and_then(|c| self.primary.get(c)).copied()
    }

    #[inline]
    pub fn secondary_for(&self, indicator: &IndicatorCode) -> Option<f64> {
        self.secondary.get(indicator).copied()
    }
}

// ---------- IdealSolution ----------

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IdealSolution {
    pub positive: BTreeMap<IndicatorCode, f64>,
    pub negative: BTreeMap<IndicatorCode, f64>,
}

impl IdealSolution {
    /// positive − negative for one indicator.
    pub fn spread(&self, indicator: &IndicatorCode) -> Option<f64> {
        Some(self.positive.get(indicator)? - self.negative.get(indicator)?)
    }

    /// Indicators whose ideals coincide (no discrimination across the cohort).
    pub fn zero_spread(&self) -> Vec<IndicatorCode> {
        self.positive
            .keys()
            .filter(|k| self.spread(k) == Some(0.0))
            .cloned()
            .collect()
    }
}

// ---------- DistanceResult ----------

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DistanceResult {
    pub positive_distance: f64,
    pub negative_distance: f64,
    pub comprehensive_score: f64,
    /// True when the score came from the default-score policy (0/0 ratio).
    #[cfg_attr(feature = "serde", serde(default))]
    pub defaulted: bool,
}

impl DistanceResult {
    /// Score = d⁻ / (d⁺ + d⁻). Both distances zero yields `default_score`
    /// when a policy is given, otherwise 0.
    pub fn from_distances(positive: f64, negative: f64, default_score: Option<f64>) -> Self {
        let total = positive + negative;
        let (comprehensive_score, defaulted) = if total == 0.0 {
            match default_score {
                Some(d) => (d, true),
                None => (0.0, false),
            }
        } else {
            (negative / total, false)
        };
        Self {
            positive_distance: positive,
            negative_distance: negative,
            comprehensive_score,
            defaulted,
        }
    }
}

// ---------- Grading vocabulary ----------

token_enum!(
    /// Capability level, ordered weak → strong.
    Level => {
        Weak = "weak",
        BelowAverage = "below_average",
        Average = "average",
        AboveAverage = "above_average",
        Strong = "strong",
    }
);

impl Level {
    /// Display label used by the regional reports.
    pub const fn label_zh(self) -> &'static str {
        match self {
            Level::Weak => "弱",
            Level::BelowAverage => "较弱",
            Level::Average => "中等",
            Level::AboveAverage => "较强",
            Level::Strong => "强",
        }
    }
}

token_enum!(
    /// Which label set a cohort was graded with.
    LevelScheme => {
        Three = "three_level",
        Four = "four_level",
        Five = "five_level",
        /// Fixed bands for a cohort too small for μ/σ.
        Absolute = "absolute",
    }
);

impl LevelScheme {
    /// Levels reachable under this scheme, strongest first.
    pub fn levels(self) -> &'static [Level] {
        use Level::*;
        match self {
            LevelScheme::Three => &[Strong, AboveAverage, Average],
            LevelScheme::Four => &[Strong, AboveAverage, Average, Weak],
            LevelScheme::Five | LevelScheme::Absolute => {
                &[Strong, AboveAverage, Average, BelowAverage, Weak]
            }
        }
    }
}

/// Mean and sample standard deviation of the cohort's scores.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CohortStats {
    pub count: usize,
    pub mean: f64,
    pub stdev: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GradeResult {
    pub score: f64,
    pub level: Level,
    pub scheme: LevelScheme,
}
