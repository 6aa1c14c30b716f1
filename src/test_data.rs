use crate::spectrum::Spectrum;

/// Peak centers and heights used to build [`gaussian_spectrum`]
pub const BASE_PEAKS: [(f64, f32); 4] = [
    (180.0634, 1000.0),
    (181.0668, 250.0),
    (350.1512, 600.0),
    (350.1640, 400.0),
];

const FWHM: f64 = 0.004;
const DX: f64 = 0.0005;

/// A profile spectrum of gaussian peaks from [`BASE_PEAKS`] with a small constant
/// baseline, sampled every 0.5 mDa around each peak.
pub fn gaussian_spectrum() -> Spectrum<'static> {
    let sigma = FWHM / 2.355;
    let mut mz_array = Vec::new();
    let mut intensity_array = Vec::new();

    let mut windows: Vec<(f64, f64)> = Vec::new();
    for (mz, _) in BASE_PEAKS.iter() {
        let (lo, hi) = (mz - 0.02, mz + 0.02);
        match windows.last_mut() {
            Some(last) if last.1 >= lo => last.1 = hi,
            _ => windows.push((lo, hi)),
        }
    }

    for (lo, hi) in windows {
        let steps = ((hi - lo) / DX) as usize;
        for i in 0..=steps {
            let x = lo + i as f64 * DX;
            let y: f64 = BASE_PEAKS
                .iter()
                .map(|(mu, h)| {
                    let z = (x - mu) / sigma;
                    *h as f64 * (-0.5 * z * z).exp()
                })
                .sum();
            mz_array.push(x);
            intensity_array.push((y + 1.0) as f32);
        }
    }
    Spectrum::new(mz_array, intensity_array).unwrap()
}
