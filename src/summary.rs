//! Summary statistics over a matched [`FeatureTable`].
use std::fmt;

use num_traits::{Float, ToPrimitive};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::feature::FeatureTable;

/// Linearly interpolated percentile of `values`, which must already be sorted.
///
/// `percent` is a fraction between 0 and 1.
pub fn percentile<T: Float + ToPrimitive>(values: &[T], percent: f64) -> Option<T> {
    if values.is_empty() {
        return None;
    }
    let k = (values.len() - 1) as f64 * percent;
    let f = k.floor();
    let c = k.ceil();
    if f == c {
        return Some(values[k as usize]);
    }
    let d0 = values[f as usize] * T::from(c - k)?;
    let d1 = values[c as usize] * T::from(k - f)?;
    Some(d0 + d1)
}

/// The mean and median of a set of values
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Center {
    pub mean: f64,
    pub median: f64,
}

impl Center {
    pub fn from_values(mut values: Vec<f64>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        values.sort_by(|a, b| a.total_cmp(b));
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let median = percentile(&values, 0.5)?;
        Some(Self { mean, median })
    }
}

/// How many features matched, and the distribution of their errors and widths
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MatchSummary {
    pub total: usize,
    pub matched: usize,
    pub ppm_error: Option<Center>,
    pub peak_width_ppm: Option<Center>,
    pub peak_width_da: Option<Center>,
}

impl MatchSummary {
    pub fn from_table(table: &FeatureTable) -> Self {
        let peaks: Vec<_> = table.iter().filter_map(|r| r.peak).collect();
        Self {
            total: table.len(),
            matched: peaks.len(),
            ppm_error: Center::from_values(peaks.iter().map(|p| p.ppm_error).collect()),
            peak_width_ppm: Center::from_values(peaks.iter().map(|p| p.peak_width_ppm).collect()),
            peak_width_da: Center::from_values(peaks.iter().map(|p| p.peak_width_da).collect()),
        }
    }

    /// The percentage of features that matched, or 0 if there are no features
    pub fn match_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.matched as f64 / self.total as f64 * 100.0
        }
    }
}

impl fmt::Display for MatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== RESULTS SUMMARY ===")?;
        writeln!(f, "Total features processed: {}", self.total)?;
        writeln!(f, "Successfully matched: {}", self.matched)?;
        writeln!(f, "Match rate: {:.1}%", self.match_rate())?;
        if let (Some(err), Some(wppm), Some(wda)) =
            (self.ppm_error, self.peak_width_ppm, self.peak_width_da)
        {
            writeln!(f, "=== MATCHING STATISTICS ===")?;
            writeln!(f, "PPM Error - Mean: {:.1}, Median: {:.1}", err.mean, err.median)?;
            writeln!(
                f,
                "Peak Width (PPM) - Mean: {:.1}, Median: {:.1}",
                wppm.mean, wppm.median
            )?;
            writeln!(
                f,
                "Peak Width (Da) - Mean: {:.4}, Median: {:.4}",
                wda.mean, wda.median
            )?;
        }
        Ok(())
    }
}
