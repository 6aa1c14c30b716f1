//! Match a table of target m/z values against a spectrum.
//!
//! Each [`Feature`] is matched to the spectrum sample closest to its m/z. If that
//! sample is within [`FeatureMatcher::max_ppm_error`] of the target, the peak
//! boundaries around the sample are found with a [`BoundaryScanner`] and
//! the row is populated with a [`PeakMatch`]. Otherwise the row is kept unmatched.
//!
//! Rows are independent of one another, so when the `parallelism` feature is
//! enabled they are processed in parallel. The output order always matches the
//! input order.
use cfg_if::cfg_if;
use thiserror::Error;

#[cfg(feature = "parallelism")]
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::boundary::BoundaryScanner;
use crate::feature::{Feature, FeatureTable, MatchResult, PeakMatch};
use crate::ppm::ppm_error;
use crate::search::closest_sample;
use crate::spectrum::{Spectrum, SpectrumError};

pub const DEFAULT_MAX_PPM_ERROR: f64 = 200.0;
pub const DEFAULT_BOUNDARY_PPM: f64 = 50.0;
pub const DEFAULT_MIN_INTENSITY_RATIO: f32 = 0.01;

/// All the ways matching can be refused. No partial results are produced when
/// any of these occur.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatchError {
    #[error("Invalid spectrum: {0}")]
    InvalidSpectrum(
        #[from]
        #[source]
        SpectrumError,
    ),
    #[error("Feature {index} has an invalid target m/z {mz}, it must be finite and greater than zero")]
    InvalidTargetMZ { index: usize, mz: f64 },
    #[error("Parameter {name} has an invalid value {value}")]
    InvalidParameter { name: &'static str, value: f64 },
}

/// Match features against a spectrum and find the boundaries of the matched peaks
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FeatureMatcher {
    /// The largest ppm error between a feature's m/z and its closest sample to accept
    pub max_ppm_error: f64,
    /// How to find the boundaries of a matched peak
    pub scanner: BoundaryScanner,
}

impl Default for FeatureMatcher {
    fn default() -> Self {
        Self {
            max_ppm_error: DEFAULT_MAX_PPM_ERROR,
            scanner: BoundaryScanner::new(
                DEFAULT_BOUNDARY_PPM,
                DEFAULT_BOUNDARY_PPM,
                DEFAULT_MIN_INTENSITY_RATIO,
            ),
        }
    }
}

/// A builder for configuring [`FeatureMatcher`]
#[derive(Debug, Clone, Default)]
pub struct FeatureMatcherBuilder {
    matcher: FeatureMatcher,
}

impl FeatureMatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_ppm_error(&mut self, max_ppm_error: f64) -> &mut Self {
        self.matcher.max_ppm_error = max_ppm_error;
        self
    }

    pub fn left_ppm(&mut self, left_ppm: f64) -> &mut Self {
        self.matcher.scanner.left_ppm = left_ppm;
        self
    }

    pub fn right_ppm(&mut self, right_ppm: f64) -> &mut Self {
        self.matcher.scanner.right_ppm = right_ppm;
        self
    }

    pub fn min_intensity_ratio(&mut self, min_intensity_ratio: f32) -> &mut Self {
        self.matcher.scanner.min_intensity_ratio = min_intensity_ratio;
        self
    }

    /// Build the [`FeatureMatcher`], checking its parameters with [`FeatureMatcher::validate`]
    pub fn build(&self) -> Result<FeatureMatcher, MatchError> {
        self.matcher.validate()?;
        Ok(self.matcher)
    }
}

fn check_non_negative(name: &'static str, value: f64) -> Result<(), MatchError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(MatchError::InvalidParameter { name, value })
    }
}

impl FeatureMatcher {
    pub fn new(
        max_ppm_error: f64,
        left_ppm: f64,
        right_ppm: f64,
        min_intensity_ratio: f32,
    ) -> Self {
        Self {
            max_ppm_error,
            scanner: BoundaryScanner::new(left_ppm, right_ppm, min_intensity_ratio),
        }
    }

    pub fn builder() -> FeatureMatcherBuilder {
        FeatureMatcherBuilder::new()
    }

    /// Check that the tolerances are finite and non-negative, and that the intensity
    /// ratio is between 0 and 1.
    pub fn validate(&self) -> Result<(), MatchError> {
        check_non_negative("max_ppm_error", self.max_ppm_error)?;
        check_non_negative("left_ppm", self.scanner.left_ppm)?;
        check_non_negative("right_ppm", self.scanner.right_ppm)?;
        let ratio = self.scanner.min_intensity_ratio as f64;
        check_non_negative("min_intensity_ratio", ratio)?;
        if ratio > 1.0 {
            return Err(MatchError::InvalidParameter {
                name: "min_intensity_ratio",
                value: ratio,
            });
        }
        Ok(())
    }

    /// Match a single feature against `spectrum`, returning `None` if the closest
    /// sample is not within [`FeatureMatcher::max_ppm_error`].
    ///
    /// A feature whose m/z is not finite and greater than zero never matches.
    pub fn match_feature(&self, feature: &Feature, spectrum: &Spectrum) -> Option<PeakMatch> {
        if !(feature.mz.is_finite() && feature.mz > 0.0) {
            return None;
        }
        let mz_array: &[f64] = &spectrum.mz_array;
        let intensity_array: &[f32] = &spectrum.intensity_array;

        let index = closest_sample(mz_array, feature.mz)?;
        let error = ppm_error(feature.mz, mz_array[index]);
        if error.is_nan() || error > self.max_ppm_error {
            if log::log_enabled!(log::Level::Trace) {
                log::trace!(
                    "{} @ {} closest sample {} is {error:0.2} ppm away",
                    feature.name,
                    feature.mz,
                    mz_array[index]
                );
            }
            return None;
        }
        let (left_index, right_index) = self.scanner.scan(index, mz_array, intensity_array);
        Some(PeakMatch::from_samples(
            mz_array,
            intensity_array,
            index,
            error,
            left_index,
            right_index,
        ))
    }

    fn match_row(&self, feature: &Feature, spectrum: &Spectrum) -> MatchResult {
        MatchResult::new(feature.clone(), self.match_feature(feature, spectrum))
    }

    fn validate_targets(features: &[Feature]) -> Result<(), MatchError> {
        match features
            .iter()
            .enumerate()
            .find(|(_, f)| !(f.mz.is_finite() && f.mz > 0.0))
        {
            Some((index, f)) => Err(MatchError::InvalidTargetMZ { index, mz: f.mz }),
            None => Ok(()),
        }
    }

    fn match_rows(&self, features: &[Feature], spectrum: &Spectrum) -> Vec<MatchResult> {
        cfg_if! {
            if #[cfg(feature = "parallelism")] {
                return features
                    .par_iter()
                    .map(|f| self.match_row(f, spectrum))
                    .collect();
            } else {
                return features
                    .iter()
                    .map(|f| self.match_row(f, spectrum))
                    .collect();
            }
        }
    }

    /// Match every feature in `features` against `spectrum`, producing one row per
    /// feature in the same order.
    ///
    /// Fails without producing any rows if the parameters are invalid, the spectrum is
    /// empty, or any feature's m/z is not a positive number.
    pub fn match_features(
        &self,
        features: &[Feature],
        spectrum: &Spectrum,
    ) -> Result<FeatureTable, MatchError> {
        self.validate()?;
        if spectrum.is_empty() {
            return Err(SpectrumError::Empty.into());
        }
        if spectrum.mz_array.len() != spectrum.intensity_array.len() {
            return Err(SpectrumError::MZIntensityMismatch(
                spectrum.mz_array.len(),
                spectrum.intensity_array.len(),
            )
            .into());
        }
        Self::validate_targets(features)?;

        let table = FeatureTable::new(self.match_rows(features, spectrum));
        log::info!(
            "Matched {} of {} features against {} data points",
            table.matched_count(),
            table.len(),
            spectrum.len()
        );
        Ok(table)
    }
}

/// A convenience function that matches `features` against paired m/z and intensity
/// arrays with the given tolerances.
///
/// See [`FeatureMatcher::match_features`].
pub fn match_all(
    features: &[Feature],
    mz_array: &[f64],
    intensity_array: &[f32],
    max_ppm_error: f64,
    left_ppm: f64,
    right_ppm: f64,
    min_intensity_ratio: f32,
) -> Result<FeatureTable, MatchError> {
    let spectrum = Spectrum::wrap(mz_array, intensity_array)?;
    FeatureMatcher::new(max_ppm_error, left_ppm, right_ppm, min_intensity_ratio)
        .match_features(features, &spectrum)
}
