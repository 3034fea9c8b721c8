//! Binned accuracy report.
//!
//! `N` ascending thresholds give `N + 1` buckets: bucket `0` holds values
//! `<= t[0]`, bucket `i` holds `(t[i-1], t[i]]`, and bucket `N` holds values
//! above the last threshold.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Percent of the total drawn as one bar character.
const PERCENT_PER_CHAR: f64 = 5.0;
const GROUP: usize = 5;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum HistogramError {
    #[error("histogram needs at least one threshold")]
    NoThresholds,

    #[error("thresholds must be finite and strictly increasing (index {index})")]
    NotIncreasing { index: usize },

    #[error("cannot merge histograms with different thresholds")]
    ThresholdMismatch,
}

/// Bucket of `value` by binary search over `thresholds`.
///
/// `thresholds` must be strictly increasing and non-empty.
#[must_use]
pub fn classify(value: f64, thresholds: &[f64]) -> usize {
    let Some(last) = thresholds.len().checked_sub(1) else {
        return 0;
    };
    if value.is_nan() || value <= thresholds[0] {
        return 0;
    }
    if value > thresholds[last] {
        return last + 1;
    }

    let (mut ileft, mut irite) = (0, last);
    while irite - ileft > 1 {
        let mid = (ileft + irite) / 2;
        if value > thresholds[mid] {
            ileft = mid;
        } else {
            irite = mid;
        }
    }
    ileft + 1
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    thresholds: Vec<f64>,
    counts: Vec<u64>,
}

impl Histogram {
    /// N thresholds split the line into N + 1 ranges, so `counts` holds one
    /// bucket more than `thresholds`; values above the last threshold land in
    /// the final bucket.
    pub fn new(thresholds: Vec<f64>) -> Result<Self, HistogramError> {
        if thresholds.is_empty() {
            return Err(HistogramError::NoThresholds);
        }
        if let Some(index) = thresholds.iter().position(|t| !t.is_finite()) {
            return Err(HistogramError::NotIncreasing { index });
        }
        if let Some(index) = thresholds.windows(2).position(|w| w[0] >= w[1]) {
            return Err(HistogramError::NotIncreasing { index: index + 1 });
        }
        let counts = vec![0; thresholds.len() + 1];
        Ok(Self { thresholds, counts })
    }

    /// Classifies `value` and returns its bucket.
    pub fn add(&mut self, value: f64) -> usize {
        let bucket = classify(value, &self.thresholds);
        self.counts[bucket] += 1;
        bucket
    }

    pub fn extend(&mut self, values: impl IntoIterator<Item = f64>) {
        for value in values {
            self.add(value);
        }
    }

    pub fn merge(&mut self, other: &Self) -> Result<(), HistogramError> {
        if self.thresholds != other.thresholds {
            return Err(HistogramError::ThresholdMismatch);
        }
        for (mine, theirs) in self.counts.iter_mut().zip(&other.counts) {
            *mine += theirs;
        }
        Ok(())
    }

    #[must_use]
    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    #[must_use]
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    fn range_label(&self, bucket: usize) -> String {
        let n = self.thresholds.len();
        if bucket == 0 {
            format!("x <= {:e}", self.thresholds[0])
        } else if bucket == n {
            format!("x > {:e}", self.thresholds[n - 1])
        } else {
            format!(
                "{:e} < x <= {:e}",
                self.thresholds[bucket - 1],
                self.thresholds[bucket]
            )
        }
    }

    /// One line per bucket: count, percentage of the total, range and bar.
    #[must_use]
    pub fn render(&self) -> String {
        let total = self.total();
        let mut out = String::new();
        for (bucket, &count) in self.counts.iter().enumerate() {
            let percent = 100.0 * count as f64 / total as f64;
            out.push_str(&format!(
                "{count:>10} {percent:>7.2}%  {:<28} |{}\n",
                self.range_label(bucket),
                bar(percent)
            ));
        }
        out
    }
}

impl fmt::Display for Histogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// One character per 5 percent, every fifth one a `+`.
fn bar(percent: f64) -> String {
    let len = if percent.is_finite() && percent > 0.0 {
        (percent / PERCENT_PER_CHAR).floor() as usize
    } else {
        0
    };
    (1..=len)
        .map(|i| if i % GROUP == 0 { '+' } else { '*' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_marks_every_fifth_character() {
        assert_eq!(bar(25.0), "****+");
        assert_eq!(bar(54.9), "****+****+");
        assert_eq!(bar(4.9), "");
        assert_eq!(bar(100.0).len(), 20);
    }

    #[test]
    fn classify_without_thresholds_is_bucket_zero() {
        assert_eq!(classify(3.0, &[]), 0);
    }
}
