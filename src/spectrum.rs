//! Paired m/z and intensity arrays describing a single spectrum.
use std::borrow::Cow;

use mzpeaks::peak::MZPoint;
use thiserror::Error;

use crate::search;

/// The ways a pair of arrays can fail to describe a spectrum
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpectrumError {
    #[error("The spectrum has no data points")]
    Empty,
    #[error("The m/z and intensity arrays do not match in length ({0} != {1})")]
    MZIntensityMismatch(usize, usize),
    #[error("The m/z array is not sorted at index {0}")]
    MZNotSorted(usize),
}

/// Check if the values in `it` are monotonically ascending or flat, returning the
/// index of the first value which breaks the ordering, if any.
pub fn find_unsorted(it: &[f64]) -> Option<usize> {
    it.windows(2)
        .position(|w| !(w[0] <= w[1]))
        .map(|i| i + 1)
}

/// A spectrum's m/z and intensity arrays, which may be owned or borrowed.
///
/// A [`Spectrum`] built through [`Spectrum::new`] or [`Spectrum::wrap`] is guaranteed to
/// be non-empty, have arrays of equal length, and have an ascending m/z array.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum<'lifespan> {
    pub mz_array: Cow<'lifespan, [f64]>,
    pub intensity_array: Cow<'lifespan, [f32]>,
    pub min_mz: f64,
    pub max_mz: f64,
}

impl<'lifespan> Spectrum<'lifespan> {
    /// Validate and take ownership of an m/z and intensity array
    pub fn new(
        mz_array: Vec<f64>,
        intensity_array: Vec<f32>,
    ) -> Result<Spectrum<'static>, SpectrumError> {
        Spectrum::from_cows(Cow::Owned(mz_array), Cow::Owned(intensity_array))
    }

    /// Validate and borrow an m/z and intensity array
    pub fn wrap(
        mz_array: &'lifespan [f64],
        intensity_array: &'lifespan [f32],
    ) -> Result<Self, SpectrumError> {
        Self::from_cows(Cow::Borrowed(mz_array), Cow::Borrowed(intensity_array))
    }

    fn from_cows(
        mz_array: Cow<'lifespan, [f64]>,
        intensity_array: Cow<'lifespan, [f32]>,
    ) -> Result<Self, SpectrumError> {
        if mz_array.len() != intensity_array.len() {
            return Err(SpectrumError::MZIntensityMismatch(
                mz_array.len(),
                intensity_array.len(),
            ));
        }
        let (min_mz, max_mz) = match (mz_array.first(), mz_array.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Err(SpectrumError::Empty),
        };
        if let Some(i) = find_unsorted(&mz_array) {
            return Err(SpectrumError::MZNotSorted(i));
        }
        Ok(Self {
            mz_array,
            intensity_array,
            min_mz,
            max_mz,
        })
    }

    /// Create a borrowed view of this spectrum
    pub fn borrow(&'lifespan self) -> Spectrum<'lifespan> {
        Spectrum {
            mz_array: Cow::Borrowed(&self.mz_array),
            intensity_array: Cow::Borrowed(&self.intensity_array),
            min_mz: self.min_mz,
            max_mz: self.max_mz,
        }
    }

    pub fn into_owned(self) -> Spectrum<'static> {
        Spectrum {
            mz_array: Cow::Owned(self.mz_array.into_owned()),
            intensity_array: Cow::Owned(self.intensity_array.into_owned()),
            min_mz: self.min_mz,
            max_mz: self.max_mz,
        }
    }

    pub fn len(&self) -> usize {
        self.mz_array.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mz_array.is_empty()
    }

    /// Get the point at `i` as an m/z-intensity pair
    pub fn get(&self, i: usize) -> Option<MZPoint> {
        match (self.mz_array.get(i), self.intensity_array.get(i)) {
            (Some(mz), Some(intensity)) => Some(MZPoint::new(*mz, *intensity)),
            _ => None,
        }
    }

    /// Find the index of the point closest to `mz`
    pub fn find(&self, mz: f64) -> usize {
        search::closest_sample(&self.mz_array, mz).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, f32)> + '_ {
        self.mz_array
            .iter()
            .copied()
            .zip(self.intensity_array.iter().copied())
    }
}

impl TryFrom<(Vec<f64>, Vec<f32>)> for Spectrum<'static> {
    type Error = SpectrumError;

    fn try_from(value: (Vec<f64>, Vec<f32>)) -> Result<Self, Self::Error> {
        Spectrum::new(value.0, value.1)
    }
}
