//! Relative mass error in parts-per-million.

/// One part-per-million
pub const PPM: f64 = 1e6;

/// Compute the absolute mass error between a `theoretical` and an `observed` m/z
/// in parts-per-million, relative to `theoretical`.
///
/// `theoretical` must not be zero; the result is not finite if it is.
#[inline]
pub fn ppm_error(theoretical: f64, observed: f64) -> f64 {
    (theoretical - observed).abs() / theoretical * PPM
}

/// Convert a ppm tolerance at `mz` into an absolute width in Daltons.
#[inline]
pub fn ppm_to_da(mz: f64, ppm: f64) -> f64 {
    mz * ppm / PPM
}

/// The m/z interval `[mz * (1 - left_ppm / 1e6), mz * (1 + right_ppm / 1e6)]`
#[inline]
pub fn ppm_window(mz: f64, left_ppm: f64, right_ppm: f64) -> (f64, f64) {
    (mz * (1.0 - left_ppm / PPM), mz * (1.0 + right_ppm / PPM))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_ppm_error() {
        assert_eq!(ppm_error(500.0, 500.0), 0.0);
        assert!((ppm_error(500.0, 500.005) - 10.0).abs() < 1e-6);
        // symmetric in sign, relative to the theoretical value
        assert!((ppm_error(500.0, 499.995) - 10.0).abs() < 1e-6);
        assert!(ppm_error(0.0, 1.0).is_infinite());
    }

    #[test]
    fn test_ppm_window() {
        let (lo, hi) = ppm_window(500.0, 30.0, 30.0);
        assert!((lo - 499.985).abs() < 1e-9);
        assert!((hi - 500.015).abs() < 1e-9);
        assert!((ppm_to_da(500.0, 30.0) - 0.015).abs() < 1e-12);
    }
}
