//! Pixel-intensity normalization for image arrays.

use ndarray::{Array, Dimension};

/// Default trim fraction for [`trim_upper`].
pub const DEFAULT_ALPHA: f64 = 0.005;

/// Trim extreme bright values and rescale to the unit interval.
///
/// Computes the `1 - alpha` quantile of `x`, clips every element to
/// `[0, threshold]`, and divides by `max(1e-3, max(clipped))`. The
/// floor keeps all-zero and near-zero arrays stable. Useful for
/// DICOM/X-ray style images with a few extreme bright pixels.
///
/// Empty or non-numeric-range input is not validated.
pub fn trim_upper<D: Dimension>(x: &Array<f64, D>, alpha: f64) -> Array<f64, D> {
    let threshold = quantile(x.iter().copied(), 1.0 - alpha);
    // upper bound applied last so a threshold below zero wins, and no
    // ordering requirement between the bounds (f64::clamp panics when
    // min > max)
    let clipped = x.mapv(|v| v.max(0.0).min(threshold));
    let denom = clipped
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max)
        .max(1e-3);
    clipped / denom
}

/// Quantile with linear interpolation between the two nearest order
/// statistics.
fn quantile(values: impl Iterator<Item = f64>, q: f64) -> f64 {
    let mut sorted: Vec<f64> = values.collect();
    if sorted.is_empty() {
        return f64::NAN;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2, array};

    #[test]
    fn test_quantile_interpolation() {
        let values = [0.0, 1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(values.iter().copied(), 0.0), 0.0);
        assert_eq!(quantile(values.iter().copied(), 1.0), 4.0);
        assert_eq!(quantile(values.iter().copied(), 0.5), 2.0);
        assert!((quantile(values.iter().copied(), 0.875) - 3.5).abs() < 1e-12);
    }

    #[test]
    fn test_output_in_unit_interval() {
        let x: Array1<f64> = Array1::from_iter((0..100).map(|v| v as f64));
        let y = trim_upper(&x, 0.01);
        assert!(y.iter().all(|&v| (0.0..=1.0).contains(&v)));
        let max = y.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        assert!((max - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_extreme_pixel_is_trimmed() {
        // one hot pixel should not dominate the rescale
        let mut x: Array1<f64> = Array1::from_elem(1000, 1.0);
        x[999] = 1e6;
        let y = trim_upper(&x, 0.005);
        // ordinary pixels end up at full intensity, not crushed to ~1e-6
        assert!((y[0] - 1.0).abs() < 1e-12);
        assert_eq!(y[999], 1.0);
    }

    #[test]
    fn test_all_zero_array_stays_zero() {
        let x: Array2<f64> = Array2::zeros((4, 4));
        let y = trim_upper(&x, DEFAULT_ALPHA);
        assert!(y.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_all_negative_array_clips_to_threshold() {
        // threshold lands below zero; the upper bound wins for every
        // element instead of panicking on an inverted clip range
        let x = array![-3.0, -2.0, -1.0];
        let y = trim_upper(&x, DEFAULT_ALPHA);
        assert!(y.iter().all(|v| v.is_finite()));
        assert!(y[0] < 0.0);
        assert_eq!(y[0], y[1]);
        assert_eq!(y[1], y[2]);
    }

    #[test]
    fn test_negative_values_clip_to_zero() {
        let x = array![-5.0, 1.0, 2.0];
        let y = trim_upper(&x, 0.0);
        assert_eq!(y, array![0.0, 0.5, 1.0]);
    }
}
