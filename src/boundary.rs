//! Find the edges of the signal region around a matched sample.
//!
//! Starting at a peak's sample, walk outwards in each direction and stop at the first
//! sample which satisfies any of these rules, checked in this order:
//!
//! 1. The sample's m/z is outside of the ppm window around the peak's m/z.
//! 2. The sample's intensity is below a fraction of the peak's intensity.
//! 3. The sample is a strict local minimum, a valley between two peaks. Only
//!    tested for samples with a neighbor on both sides.
//!
//! If no rule is triggered before the end of the array, the edge of the array is
//! the boundary. The sample that triggers a rule is included in the boundary.
use num_traits::Float;

use crate::ppm::ppm_window;

/// The direction to walk from the peak
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Parameters controlling how far a [`BoundaryScanner`] may walk from a peak
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundaryScanner {
    /// The largest distance below the peak's m/z the left boundary may reach, in ppm
    pub left_ppm: f64,
    /// The largest distance above the peak's m/z the right boundary may reach, in ppm
    pub right_ppm: f64,
    /// The fraction of the peak's intensity a sample must reach to extend the peak
    pub min_intensity_ratio: f32,
}

impl Default for BoundaryScanner {
    fn default() -> Self {
        Self {
            left_ppm: 50.0,
            right_ppm: 50.0,
            min_intensity_ratio: 0.01,
        }
    }
}

#[inline]
fn is_local_minimum<Y: Float>(intensity_array: &[Y], i: usize) -> bool {
    if i == 0 || i + 1 >= intensity_array.len() {
        return false;
    }
    let y = intensity_array[i];
    y < intensity_array[i - 1] && y < intensity_array[i + 1]
}

impl BoundaryScanner {
    pub fn new(left_ppm: f64, right_ppm: f64, min_intensity_ratio: f32) -> Self {
        Self {
            left_ppm,
            right_ppm,
            min_intensity_ratio,
        }
    }

    /// Find the left and right boundary indices of the peak at `peak_index`.
    ///
    /// The returned pair always satisfies `left <= peak_index <= right`.
    ///
    /// # Panics
    /// If `peak_index` is not a valid index into both arrays.
    pub fn scan<Y: Float>(
        &self,
        peak_index: usize,
        mz_array: &[f64],
        intensity_array: &[Y],
    ) -> (usize, usize) {
        (
            self.scan_side(Side::Left, peak_index, mz_array, intensity_array),
            self.scan_side(Side::Right, peak_index, mz_array, intensity_array),
        )
    }

    /// Walk from `peak_index` towards one end of the arrays, returning the first index
    /// which stops the walk, or the last index visited.
    pub fn scan_side<Y: Float>(
        &self,
        side: Side,
        peak_index: usize,
        mz_array: &[f64],
        intensity_array: &[Y],
    ) -> usize {
        let n = mz_array.len().min(intensity_array.len());
        assert!(
            peak_index < n,
            "peak index {peak_index} is out of bounds for arrays of length {n}"
        );

        let (left_limit, right_limit) =
            ppm_window(mz_array[peak_index], self.left_ppm, self.right_ppm);
        let ratio = Y::from(self.min_intensity_ratio).unwrap_or_else(Y::zero);
        let threshold = intensity_array[peak_index] * ratio;

        let stops = |i: &usize| -> bool {
            let i = *i;
            let beyond_limit = match side {
                Side::Left => mz_array[i] < left_limit,
                Side::Right => mz_array[i] > right_limit,
            };
            beyond_limit
                || intensity_array[i] < threshold
                || is_local_minimum(&intensity_array[..n], i)
        };

        match side {
            Side::Left => (0..=peak_index).rev().find(stops).unwrap_or(0),
            Side::Right => (peak_index..n).find(stops).unwrap_or(n - 1),
        }
    }
}

/// Find the boundaries of the peak at `peak_index` with the given limits.
///
/// This is a convenience wrapper around [`BoundaryScanner::scan`].
pub fn find_peak_boundaries<Y: Float>(
    peak_index: usize,
    mz_array: &[f64],
    intensity_array: &[Y],
    left_ppm: f64,
    right_ppm: f64,
    min_intensity_ratio: f32,
) -> (usize, usize) {
    BoundaryScanner::new(left_ppm, right_ppm, min_intensity_ratio).scan(
        peak_index,
        mz_array,
        intensity_array,
    )
}
