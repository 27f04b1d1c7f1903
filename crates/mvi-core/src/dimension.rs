//! Rényi information dimension proxy from entropy scaling.
//!
//! Samples of a window are points in channel space. For each quantization
//! width ε the points are binned on an ε-grid, the Shannon entropy (nats) of
//! the occupied cells is taken, and the OLS slope of entropy against
//! `ln(1/ε)` is the dimension estimate.
//!
//! Scales are linearly spaced over `[0.1, 2.0] × σ`, σ being the standard
//! deviation of every value in the window.

use ndarray::{ArrayView2, s};
use serde::Serialize;
use statrs::statistics::{Data, Median};
use std::collections::HashMap;

/// Finest and coarsest scale, as multiples of the window's standard deviation.
pub const SCALE_RANGE: (f64, f64) = (0.1, 2.0);

/// Entropy spread below which no scaling law is measurable.
const FLAT_ENTROPY_TOL: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionEstimate {
    /// Dimension used downstream: `max(slope, 1)`, or 1 when unreliable.
    pub value: f64,
    /// Fitted slope before flooring, when one was fitted.
    pub slope: Option<f64>,
    /// Set when no scaling law could be measured.
    pub unreliable_reason: Option<String>,
}

impl DimensionEstimate {
    fn from_slope(slope: f64) -> Self {
        Self {
            value: slope.max(1.0),
            slope: Some(slope),
            unreliable_reason: None,
        }
    }

    fn unreliable(reason: impl Into<String>) -> Self {
        Self {
            value: 1.0,
            slope: None,
            unreliable_reason: Some(reason.into()),
        }
    }

    pub fn is_reliable(&self) -> bool {
        self.unreliable_reason.is_none()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DimensionEstimator {
    num_scales: usize,
}

impl DimensionEstimator {
    pub fn new(num_scales: usize) -> Self {
        Self {
            num_scales: num_scales.max(2),
        }
    }

    /// Quantization widths for a window with standard deviation `sigma`.
    pub fn scales(&self, sigma: f64) -> Vec<f64> {
        let (lo, hi) = SCALE_RANGE;
        let step = (hi - lo) / (self.num_scales - 1) as f64;
        (0..self.num_scales)
            .map(|i| (lo + step * i as f64) * sigma)
            .collect()
    }

    /// Estimate for one channels × samples block.
    pub fn estimate(&self, window: ArrayView2<'_, f64>) -> DimensionEstimate {
        if window.is_empty() {
            return DimensionEstimate::unreliable("empty window");
        }
        let sigma = window.std(0.0);
        if !sigma.is_finite() || sigma <= 0.0 {
            return DimensionEstimate::unreliable("window has zero variance");
        }

        let scales = self.scales(sigma);
        let log_inv: Vec<f64> = scales.iter().map(|eps| (1.0 / eps).ln()).collect();
        let entropies: Vec<f64> = scales
            .iter()
            .map(|&eps| quantized_entropy(window, eps))
            .collect();

        let (lo, hi) = entropies
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &h| {
                (lo.min(h), hi.max(h))
            });
        if hi - lo < FLAT_ENTROPY_TOL {
            return DimensionEstimate::unreliable(format!(
                "entropy constant ({lo:.6} nats) across {} scales",
                scales.len()
            ));
        }

        match ols_slope(&log_inv, &entropies) {
            Some(slope) => DimensionEstimate::from_slope(slope),
            None => DimensionEstimate::unreliable("degenerate scale grid"),
        }
    }

    /// Whole-recording estimate: median slope over consecutive, non-overlapping
    /// segments of `segment_samples` (one segment when the recording is shorter).
    pub fn estimate_global(
        &self,
        data: ArrayView2<'_, f64>,
        segment_samples: usize,
    ) -> DimensionEstimate {
        let total = data.ncols();
        let segment = segment_samples.clamp(1, total.max(1));
        let count = (total / segment).max(1);

        let slopes: Vec<f64> = (0..count)
            .filter_map(|i| {
                let start = i * segment;
                let end = if count == 1 { total } else { start + segment };
                self.estimate(data.slice(s![.., start..end])).slope
            })
            .collect();

        if slopes.is_empty() {
            return DimensionEstimate::unreliable(format!(
                "no measurable scaling law in any of {count} segments"
            ));
        }
        DimensionEstimate::from_slope(Data::new(slopes).median())
    }
}

/// Shannon entropy (nats) of the occupied cells of an `eps`-grid.
pub fn quantized_entropy(window: ArrayView2<'_, f64>, eps: f64) -> f64 {
    let n = window.ncols();
    if n == 0 {
        return 0.0;
    }
    let mut cells: HashMap<Vec<i64>, usize> = HashMap::new();
    for point in window.columns() {
        let key: Vec<i64> = point.iter().map(|&v| (v / eps).floor() as i64).collect();
        *cells.entry(key).or_insert(0) += 1;
    }
    // Sum in a fixed order so repeated runs are bit-identical.
    let mut counts: Vec<usize> = cells.into_values().collect();
    counts.sort_unstable();
    let n = n as f64;
    -counts
        .iter()
        .map(|&c| {
            let p = c as f64 / n;
            p * p.ln()
        })
        .sum::<f64>()
}

/// Ordinary least squares slope of `y` on `x`.
fn ols_slope(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let mx = x[..n].iter().sum::<f64>() / n as f64;
    let my = y[..n].iter().sum::<f64>() / n as f64;
    let (sxy, sxx) = x[..n]
        .iter()
        .zip(&y[..n])
        .fold((0.0, 0.0), |(sxy, sxx), (&xi, &yi)| {
            (sxy + (xi - mx) * (yi - my), sxx + (xi - mx) * (xi - mx))
        });
    (sxx > 0.0).then(|| sxy / sxx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use std::f64::consts::PI;

    fn lcg_noise(channels: usize, n: usize, seed: u64) -> Array2<f64> {
        let mut state = seed;
        Array2::from_shape_fn((channels, n), |_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 11) as f64 / (1u64 << 53) as f64 - 0.5
        })
    }

    #[test]
    fn scales_are_linear_over_range() {
        let scales = DimensionEstimator::new(5).scales(2.0);
        assert_eq!(scales.len(), 5);
        assert!((scales[0] - 0.2).abs() < 1e-12);
        assert!((scales[4] - 4.0).abs() < 1e-12);
        assert!((scales[2] - 2.1).abs() < 1e-12);
    }

    #[test]
    fn entropy_of_known_partition() {
        // Four points, two cells of two: ln 2.
        let w = ndarray::array![[0.1, 0.2, 1.1, 1.2]];
        let h = quantized_entropy(w.view(), 1.0);
        assert!((h - 2f64.ln()).abs() < 1e-12);
        // One cell: zero entropy.
        assert_eq!(quantized_entropy(w.view(), 10.0), 0.0);
    }

    #[test]
    fn ols_recovers_line() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [1.0, 3.0, 5.0, 7.0];
        assert!((ols_slope(&x, &y).unwrap() - 2.0).abs() < 1e-12);
        assert!(ols_slope(&[1.0, 1.0], &[0.0, 1.0]).is_none());
    }

    #[test]
    fn flat_window_is_unreliable() {
        let est = DimensionEstimator::new(8).estimate(Array2::zeros((4, 200)).view());
        assert!(!est.is_reliable());
        assert_eq!(est.value, 1.0);
    }

    #[test]
    fn two_level_signal_has_constant_entropy() {
        // -1 and +1 fall on opposite sides of the grid origin at every scale.
        let w = Array2::from_shape_fn((2, 100), |(_, t)| if t % 2 == 0 { -1.0 } else { 1.0 });
        let est = DimensionEstimator::new(8).estimate(w.view());
        assert!(!est.is_reliable(), "estimate {est:?}");
        assert_eq!(est.value, 1.0);
    }

    #[test]
    fn estimates_are_floored_at_one() {
        let line = Array2::from_shape_fn((3, 500), |(c, t)| {
            (c as f64 + 1.0) * (2.0 * PI * 3.1 * t as f64 / 250.0).sin()
        });
        let est = DimensionEstimator::new(8).estimate(line.view());
        assert!(est.value >= 1.0);
        assert!(est.is_reliable());
    }

    #[test]
    fn noise_looks_higher_dimensional_than_a_line() {
        let estimator = DimensionEstimator::new(8);
        let noise = estimator.estimate(lcg_noise(4, 1000, 11).view());
        let line = Array2::from_shape_fn((4, 1000), |(c, t)| {
            (c as f64 + 1.0) * (2.0 * PI * 7.3 * t as f64 / 250.0).sin()
        });
        let line = estimator.estimate(line.view());
        assert!(noise.slope.unwrap() > line.slope.unwrap());
        assert!(noise.value > 1.0);
    }

    #[test]
    fn global_estimate_takes_median_over_segments() {
        let estimator = DimensionEstimator::new(8);
        let data = lcg_noise(3, 1200, 5);
        let global = estimator.estimate_global(data.view(), 400);

        let mut slopes: Vec<f64> = (0..3)
            .map(|i| {
                estimator
                    .estimate(data.slice(s![.., i * 400..(i + 1) * 400]))
                    .slope
                    .unwrap()
            })
            .collect();
        slopes.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert!((global.slope.unwrap() - slopes[1]).abs() < 1e-12);
    }

    #[test]
    fn global_estimate_short_recording_uses_whole_signal() {
        let estimator = DimensionEstimator::new(8);
        let data = lcg_noise(3, 300, 9);
        let global = estimator.estimate_global(data.view(), 1000);
        let whole = estimator.estimate(data.view());
        assert_eq!(global, whole);
    }

    #[test]
    fn global_estimate_all_flat_is_unreliable() {
        let est = DimensionEstimator::new(8).estimate_global(Array2::zeros((2, 900)).view(), 300);
        assert!(!est.is_reliable());
        assert_eq!(est.value, 1.0);
    }
}
