//! Target features, their matches against a spectrum, and the table holding them.
use std::cmp::Ordering;
use std::fmt;
use std::ops::Index;
use std::slice;

use mzpeaks::{CoordinateLike, IntensityMeasurement, MZ};
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::ppm::PPM;

/// A named target m/z to search for, along with whatever other attributes
/// the source table carried for it.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Feature {
    pub name: String,
    pub mz: f64,
    /// Additional named values carried along unchanged, in their original order
    pub attributes: Vec<(String, String)>,
}

impl Feature {
    pub fn new(name: impl Into<String>, mz: f64) -> Self {
        Self {
            name: name.into(),
            mz,
            attributes: Vec::new(),
        }
    }

    pub fn with_attributes(
        name: impl Into<String>,
        mz: f64,
        attributes: Vec<(String, String)>,
    ) -> Self {
        Self {
            name: name.into(),
            mz,
            attributes,
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// The spectrum sample a [`Feature`] matched, and the boundaries of the signal around it.
///
/// The boundary values are read from spectrum samples, except after a repair or a
/// manual edit, when only the m/z values and widths are updated.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PeakMatch {
    pub matched_index: usize,
    pub matched_mz: f64,
    pub matched_intensity: f32,
    pub ppm_error: f64,

    pub left_index: usize,
    pub right_index: usize,
    pub left_boundary_mz: f64,
    pub right_boundary_mz: f64,
    pub left_boundary_intensity: f32,
    pub right_boundary_intensity: f32,

    /// `right_boundary_mz - left_boundary_mz`
    pub peak_width_da: f64,
    /// `peak_width_da` relative to `matched_mz`, in ppm
    pub peak_width_ppm: f64,
}

impl PeakMatch {
    /// Build a match from the matched sample and its boundary samples
    pub fn from_samples(
        mz_array: &[f64],
        intensity_array: &[f32],
        matched_index: usize,
        ppm_error: f64,
        left_index: usize,
        right_index: usize,
    ) -> Self {
        let mut peak = Self {
            matched_index,
            matched_mz: mz_array[matched_index],
            matched_intensity: intensity_array[matched_index],
            ppm_error,
            left_index,
            right_index,
            left_boundary_mz: mz_array[left_index],
            right_boundary_mz: mz_array[right_index],
            left_boundary_intensity: intensity_array[left_index],
            right_boundary_intensity: intensity_array[right_index],
            peak_width_da: 0.0,
            peak_width_ppm: 0.0,
        };
        peak.update_widths();
        peak
    }

    /// Recompute the width fields from the current boundaries
    pub fn update_widths(&mut self) {
        self.peak_width_da = self.right_boundary_mz - self.left_boundary_mz;
        self.peak_width_ppm = self.peak_width_da / self.matched_mz * PPM;
    }

    /// Move the boundaries to `left_mz` and `right_mz`, keeping the widths consistent
    pub fn set_boundaries(&mut self, left_mz: f64, right_mz: f64) {
        self.left_boundary_mz = left_mz;
        self.right_boundary_mz = right_mz;
        self.update_widths();
    }

    pub fn is_degenerate(&self) -> bool {
        self.left_boundary_mz == self.right_boundary_mz
    }

    pub fn contains_mz(&self, mz: f64) -> bool {
        self.left_boundary_mz <= mz && mz <= self.right_boundary_mz
    }
}

impl PartialOrd for PeakMatch {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.matched_mz.partial_cmp(&other.matched_mz)
    }
}

impl CoordinateLike<MZ> for PeakMatch {
    fn coordinate(&self) -> f64 {
        self.matched_mz
    }
}

impl IntensityMeasurement for PeakMatch {
    fn intensity(&self) -> f32 {
        self.matched_intensity
    }
}

/// A [`Feature`] and, if it matched within tolerance, the [`PeakMatch`] it matched.
///
/// When `peak` is `None`, every match-derived value is absent.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MatchResult {
    pub feature: Feature,
    pub peak: Option<PeakMatch>,
    /// Excluded from export by a reviewer, but kept in the table so it can be restored
    pub deleted: bool,
}

impl MatchResult {
    pub fn new(feature: Feature, peak: Option<PeakMatch>) -> Self {
        Self {
            feature,
            peak,
            deleted: false,
        }
    }

    pub fn unmatched(feature: Feature) -> Self {
        Self::new(feature, None)
    }

    pub fn name(&self) -> &str {
        &self.feature.name
    }

    pub fn target_mz(&self) -> f64 {
        self.feature.mz
    }

    pub fn is_matched(&self) -> bool {
        self.peak.is_some()
    }

    pub fn matched_mz(&self) -> Option<f64> {
        self.peak.map(|p| p.matched_mz)
    }

    pub fn matched_intensity(&self) -> Option<f32> {
        self.peak.map(|p| p.matched_intensity)
    }

    pub fn ppm_error(&self) -> Option<f64> {
        self.peak.map(|p| p.ppm_error)
    }

    pub fn left_boundary_mz(&self) -> Option<f64> {
        self.peak.map(|p| p.left_boundary_mz)
    }

    pub fn right_boundary_mz(&self) -> Option<f64> {
        self.peak.map(|p| p.right_boundary_mz)
    }

    pub fn left_boundary_intensity(&self) -> Option<f32> {
        self.peak.map(|p| p.left_boundary_intensity)
    }

    pub fn right_boundary_intensity(&self) -> Option<f32> {
        self.peak.map(|p| p.right_boundary_intensity)
    }

    pub fn peak_width_da(&self) -> Option<f64> {
        self.peak.map(|p| p.peak_width_da)
    }

    pub fn peak_width_ppm(&self) -> Option<f64> {
        self.peak.map(|p| p.peak_width_ppm)
    }
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.peak {
            Some(p) => write!(
                f,
                "MatchResult({}, {}, matched={}, ppm={:0.2}, [{}, {}])",
                self.feature.name,
                self.feature.mz,
                p.matched_mz,
                p.ppm_error,
                p.left_boundary_mz,
                p.right_boundary_mz
            ),
            None => write!(
                f,
                "MatchResult({}, {}, unmatched)",
                self.feature.name, self.feature.mz
            ),
        }
    }
}

/// The ways editing a [`FeatureTable`] can fail
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureTableError {
    #[error("Row {0} is out of bounds for a table with {1} rows")]
    IndexOutOfBounds(usize, usize),
    #[error("Row {0} did not match the spectrum and has no boundaries to edit")]
    Unmatched(usize),
    #[error("Invalid boundaries [{0}, {1}]: both must be finite and left <= right")]
    InvalidBoundaries(f64, f64),
    #[error("Boundaries [{0}, {1}] do not contain the matched m/z {2}")]
    ExcludesMatch(f64, f64, f64),
}

/// An ordered table of [`MatchResult`], one row per input [`Feature`].
///
/// Rows are never added or removed after construction, so a row's position is a stable
/// identity for edits.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FeatureTable {
    rows: Vec<MatchResult>,
}

impl FeatureTable {
    pub fn new(rows: Vec<MatchResult>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&MatchResult> {
        self.rows.get(index)
    }

    pub fn iter(&self) -> slice::Iter<'_, MatchResult> {
        self.rows.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> slice::IterMut<'_, MatchResult> {
        self.rows.iter_mut()
    }

    pub fn as_slice(&self) -> &[MatchResult] {
        &self.rows
    }

    pub fn into_inner(self) -> Vec<MatchResult> {
        self.rows
    }

    /// Iterate over the rows that have not been deleted
    pub fn active(&self) -> impl Iterator<Item = &MatchResult> + '_ {
        self.rows.iter().filter(|r| !r.deleted)
    }

    pub fn active_count(&self) -> usize {
        self.active().count()
    }

    pub fn deleted_count(&self) -> usize {
        self.rows.len() - self.active_count()
    }

    pub fn matched_count(&self) -> usize {
        self.rows.iter().filter(|r| r.is_matched()).count()
    }

    fn row_mut(&mut self, index: usize) -> Result<&mut MatchResult, FeatureTableError> {
        let n = self.rows.len();
        self.rows
            .get_mut(index)
            .ok_or(FeatureTableError::IndexOutOfBounds(index, n))
    }

    pub fn rename(&mut self, index: usize, name: impl Into<String>) -> Result<(), FeatureTableError> {
        self.row_mut(index)?.feature.name = name.into();
        Ok(())
    }

    /// Replace the boundaries of the matched row at `index`, recomputing its widths.
    ///
    /// The new boundaries must still contain the matched m/z. The boundary intensities
    /// are left unchanged.
    pub fn set_boundaries(
        &mut self,
        index: usize,
        left_mz: f64,
        right_mz: f64,
    ) -> Result<(), FeatureTableError> {
        if !(left_mz.is_finite() && right_mz.is_finite() && left_mz <= right_mz) {
            return Err(FeatureTableError::InvalidBoundaries(left_mz, right_mz));
        }
        let row = self.row_mut(index)?;
        match row.peak.as_mut() {
            Some(peak) if !(left_mz <= peak.matched_mz && peak.matched_mz <= right_mz) => Err(
                FeatureTableError::ExcludesMatch(left_mz, right_mz, peak.matched_mz),
            ),
            Some(peak) => {
                peak.set_boundaries(left_mz, right_mz);
                log::debug!("Set boundaries of {} to [{left_mz}, {right_mz}]", row.feature.name);
                Ok(())
            }
            None => Err(FeatureTableError::Unmatched(index)),
        }
    }

    pub fn set_deleted(&mut self, index: usize, deleted: bool) -> Result<(), FeatureTableError> {
        self.row_mut(index)?.deleted = deleted;
        Ok(())
    }

    /// Flip the deletion flag of the row at `index`, returning the new state
    pub fn toggle_deleted(&mut self, index: usize) -> Result<bool, FeatureTableError> {
        let row = self.row_mut(index)?;
        row.deleted = !row.deleted;
        Ok(row.deleted)
    }
}

impl Index<usize> for FeatureTable {
    type Output = MatchResult;

    fn index(&self, index: usize) -> &Self::Output {
        &self.rows[index]
    }
}

impl FromIterator<MatchResult> for FeatureTable {
    fn from_iter<T: IntoIterator<Item = MatchResult>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl IntoIterator for FeatureTable {
    type Item = MatchResult;
    type IntoIter = std::vec::IntoIter<MatchResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a FeatureTable {
    type Item = &'a MatchResult;
    type IntoIter = slice::Iter<'a, MatchResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
