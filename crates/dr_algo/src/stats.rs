//! Descriptive statistics shared by grading, validation, and diagnostics.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Σ(v − μ)² / n
pub fn population_variance(values: &[f64]) -> Option<f64> {
    let mu = mean(values)?;
    Some(values.iter().map(|v| (v - mu) * (v - mu)).sum::<f64>() / values.len() as f64)
}

/// sqrt(Σ(v − μ)² / (n − 1)); needs at least two values.
pub fn sample_stdev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mu = mean(values)?;
    let ss = values.iter().map(|v| (v - mu) * (v - mu)).sum::<f64>();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Summary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub sum: f64,
    pub range: f64,
    /// Population standard deviation.
    pub stdev: f64,
}

impl Summary {
    /// stdev / |mean|; None when the mean is zero.
    pub fn coefficient_of_variation(&self) -> Option<f64> {
        if self.mean == 0.0 {
            None
        } else {
            Some(self.stdev / self.mean.abs())
        }
    }
}

pub fn summarize(values: &[f64]) -> Option<Summary> {
    let mean = mean(values)?;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let stdev = population_variance(values)?.sqrt();
    Some(Summary {
        count: values.len(),
        min,
        max,
        mean,
        sum: values.iter().sum(),
        range: max - min,
        stdev,
    })
}

/// Quartiles by direct index into the sorted values: q1 = v[n/4], q3 = v[3n/4].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quartiles {
    pub q1: f64,
    pub q3: f64,
}

impl Quartiles {
    #[inline]
    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }

    /// (q1 − k·IQR, q3 + k·IQR)
    pub fn fences(&self, k: f64) -> (f64, f64) {
        (self.q1 - k * self.iqr(), self.q3 + k * self.iqr())
    }
}

/// Needs at least three values.
pub fn quartiles(values: &[f64]) -> Option<Quartiles> {
    let n = values.len();
    if n < 3 {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Some(Quartiles { q1: sorted[n / 4], q3: sorted[3 * n / 4] })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_vs_population() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(population_variance(&v), Some(4.0));
        let s = sample_stdev(&v).unwrap();
        assert!((s - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
        assert_eq!(sample_stdev(&[1.0]), None);
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn summary_fields() {
        let s = summarize(&[1.0, 3.0]).unwrap();
        assert_eq!((s.min, s.max, s.mean, s.sum, s.range, s.count), (1.0, 3.0, 2.0, 4.0, 2.0, 2));
        assert_eq!(s.stdev, 1.0);
        assert_eq!(s.coefficient_of_variation(), Some(0.5));
    }

    #[test]
    fn quartile_indexing() {
        let q = quartiles(&[5.0, 1.0, 3.0, 2.0, 4.0, 100.0, 6.0, 7.0]).unwrap();
        // sorted: 1 2 3 4 5 6 7 100 → v[2]=3, v[6]=7
        assert_eq!((q.q1, q.q3), (3.0, 7.0));
        assert_eq!(q.fences(1.5), (-3.0, 13.0));
        assert!(quartiles(&[1.0, 2.0]).is_none());
    }
}
