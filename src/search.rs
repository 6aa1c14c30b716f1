//! Locate the spectrum sample nearest to a query m/z.
//!
//! This is a nearest *sample* search over the raw signal, not a search over
//! local maxima: whatever point lies closest to the query in linear m/z
//! distance is returned.
use num_traits::Float;

/// Find the first index `i` where `array[i] >= q`, or `array.len()` if every
/// value is less than `q`. `array` must be sorted ascending.
pub fn binsearch<T: Float>(array: &[T], q: T) -> usize {
    array.partition_point(|x| *x < q)
}

/// Find the index of the value in `mz_array` closest to `target_mz`, using a binary search.
///
/// `mz_array` must be sorted ascending. When two samples are equally distant the lower
/// index is returned. Returns `None` only if `mz_array` is empty.
pub fn closest_sample<T: Float>(mz_array: &[T], target_mz: T) -> Option<usize> {
    let n = mz_array.len();
    if n == 0 {
        return None;
    }
    let i = binsearch(mz_array, target_mz);
    if i == 0 {
        return Some(0);
    }
    if i == n {
        return Some(n - 1);
    }
    let below = target_mz - mz_array[i - 1];
    let above = mz_array[i] - target_mz;
    if below <= above {
        Some(i - 1)
    } else {
        Some(i)
    }
}

/// Perform a linear scan over all of `mz_array` for the value closest to `target_mz`.
///
/// Does not require `mz_array` to be sorted. Ties resolve to the lower index.
pub fn closest_sample_linear<T: Float>(mz_array: &[T], target_mz: T) -> Option<usize> {
    mz_array
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, T)>, (i, x)| {
            let dist = (*x - target_mz).abs();
            match best {
                Some((_, best_dist)) if best_dist <= dist => best,
                _ => Some((i, dist)),
            }
        })
        .map(|(i, _)| i)
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    const MZS: [f64; 5] = [100.0, 100.001, 100.002, 100.01, 100.02];

    #[rstest]
    #[case(100.001, 1)]
    #[case(99.0, 0)]
    #[case(250.0, 4)]
    #[case(100.0061, 3)]
    #[case(100.0059, 2)]
    #[case(100.0152, 4)]
    fn test_closest_sample(#[case] target: f64, #[case] expected: usize) {
        assert_eq!(closest_sample(&MZS, target), Some(expected));
        assert_eq!(closest_sample_linear(&MZS, target), Some(expected));
    }

    #[test]
    fn test_empty() {
        let empty: [f64; 0] = [];
        assert_eq!(closest_sample(&empty, 100.0), None);
        assert_eq!(closest_sample_linear(&empty, 100.0), None);
    }

    #[test]
    fn test_tie_prefers_lower() {
        let mzs = [1.0, 2.0, 3.0];
        assert_eq!(closest_sample(&mzs, 2.5), Some(1));
        assert_eq!(closest_sample_linear(&mzs, 2.5), Some(1));
    }

    #[test]
    fn test_agrees_with_linear_scan() {
        let mzs: Vec<f64> = (0..2000).map(|i| 150.0 + (i as f64) * 0.0137).collect();
        let mut q = 140.0;
        while q < 190.0 {
            assert_eq!(
                closest_sample(&mzs, q),
                closest_sample_linear(&mzs, q),
                "disagreement at {q}"
            );
            q += 0.00731;
        }
    }

    #[test]
    fn test_binsearch() {
        assert_eq!(binsearch(&MZS, 100.0), 0);
        assert_eq!(binsearch(&MZS, 100.0015), 2);
        assert_eq!(binsearch(&MZS, 101.0), 5);
    }
}
