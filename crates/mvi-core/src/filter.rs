//! Zero-phase band-pass filtering.
//!
//! The spectral stage only needs "give me this window restricted to a band";
//! that contract is the [`BandFilter`] trait. The default implementation,
//! [`ZeroPhaseBandPass`], picks one strategy per (band, window length) by a
//! capability check before touching any data:
//!
//! 1. **Butterworth**: digital band-pass (bilinear transform of the analog
//!    low-pass prototype, pre-warped edges) as second-order sections, run
//!    forward and backward with odd-reflection padding. The order is capped
//!    so the padding fits inside the window.
//! 2. **WindowedSinc**: Hamming-windowed sinc FIR, run forward and backward
//!    through FFT convolution. Chosen when the Butterworth design is not
//!    available (edge at 0 Hz or at/above Nyquist, window too short for the
//!    IIR padding, or an unstable section).
//! 3. **Passthrough**: the window is too short for any filter; the raw
//!    window is reused.
//! 4. **Empty**: the band starts at or above Nyquist and carries no
//!    representable power.

use ndarray::{Array2, ArrayView1, ArrayView2};
use rustfft::{FftPlanner, num_complex::Complex};
use serde::Serialize;
use std::f64::consts::PI;

use crate::config::{FilterConfig, FrequencyBand};

/// Which filter actually produced a band-limited window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterStrategy {
    Butterworth { order: usize },
    WindowedSinc { taps: usize },
    Passthrough,
    Empty,
}

impl FilterStrategy {
    /// True when the preferred design could not be used.
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::WindowedSinc { .. } | Self::Passthrough)
    }
}

impl std::fmt::Display for FilterStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Butterworth { order } => write!(f, "butterworth(order={order})"),
            Self::WindowedSinc { taps } => write!(f, "fir(taps={taps})"),
            Self::Passthrough => write!(f, "passthrough"),
            Self::Empty => write!(f, "empty"),
        }
    }
}

/// A band-limited copy of a window plus how it was obtained.
#[derive(Debug, Clone)]
pub struct FilteredBand {
    pub data: Array2<f64>,
    pub strategy: FilterStrategy,
    /// Why the preferred design was skipped, when it was.
    pub fallback_reason: Option<String>,
}

/// Band-pass primitive used by the spectral stage.
///
/// Implementations must be zero-phase and deterministic, and must return a
/// matrix of the same shape as `data` (channels × samples).
pub trait BandFilter: Send + Sync {
    fn filter(
        &self,
        data: ArrayView2<'_, f64>,
        band: &FrequencyBand,
        sfreq: f64,
    ) -> FilteredBand;
}

/// Default [`BandFilter`]: Butterworth preferred, windowed-sinc fallback.
#[derive(Debug, Clone, Default)]
pub struct ZeroPhaseBandPass {
    config: FilterConfig,
}

enum FilterPlan {
    Iir { sections: Vec<Biquad>, order: usize },
    Fir { taps: Vec<f64>, reason: String },
    Passthrough { reason: String },
    Empty,
}

impl ZeroPhaseBandPass {
    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }

    /// Largest even prototype order whose forward-backward padding fits `n`.
    fn iir_order_for(&self, n: usize) -> Option<usize> {
        let mut order = self.config.iir_order - self.config.iir_order % 2;
        while order >= 2 {
            if iir_pad(order) < n {
                return Some(order);
            }
            order -= 2;
        }
        None
    }

    /// Largest odd tap count (<= the configured cap) with `3 * taps < n`.
    fn fir_taps_for(&self, n: usize) -> Option<usize> {
        let cap = if self.config.fir_max_taps % 2 == 0 {
            self.config.fir_max_taps - 1
        } else {
            self.config.fir_max_taps
        };
        let fit = n.saturating_sub(1) / 3;
        let fit = if fit % 2 == 0 { fit.saturating_sub(1) } else { fit };
        let taps = cap.min(fit);
        (taps >= 3).then_some(taps)
    }

    fn plan(&self, band: &FrequencyBand, sfreq: f64, n: usize) -> FilterPlan {
        let nyquist = sfreq / 2.0;
        if band.low_hz >= nyquist {
            return FilterPlan::Empty;
        }

        let reason = if band.low_hz <= 0.0 || band.high_hz >= nyquist {
            format!(
                "band edges [{}, {}] Hz are not inside (0, {nyquist}) Hz",
                band.low_hz, band.high_hz
            )
        } else {
            match self.iir_order_for(n) {
                Some(order) => {
                    let sections = butterworth_bandpass(band.low_hz, band.high_hz, sfreq, order);
                    if sections.iter().all(Biquad::is_stable) {
                        return FilterPlan::Iir { sections, order };
                    }
                    format!("Butterworth order {order} has unstable sections for {band}")
                }
                None => format!("{n} samples are too short for Butterworth padding"),
            }
        };

        match self.fir_taps_for(n) {
            Some(taps) => FilterPlan::Fir {
                taps: windowed_sinc_bandpass(band.low_hz, band.high_hz, sfreq, taps),
                reason,
            },
            None => FilterPlan::Passthrough {
                reason: format!("{n} samples are too short for any stable filter ({reason})"),
            },
        }
    }
}

impl BandFilter for ZeroPhaseBandPass {
    fn filter(
        &self,
        data: ArrayView2<'_, f64>,
        band: &FrequencyBand,
        sfreq: f64,
    ) -> FilteredBand {
        let n = data.ncols();
        match self.plan(band, sfreq, n) {
            FilterPlan::Empty => FilteredBand {
                data: Array2::zeros(data.raw_dim()),
                strategy: FilterStrategy::Empty,
                fallback_reason: None,
            },
            FilterPlan::Passthrough { reason } => FilteredBand {
                data: data.to_owned(),
                strategy: FilterStrategy::Passthrough,
                fallback_reason: Some(reason),
            },
            FilterPlan::Iir { sections, order } => {
                let mut out = Array2::zeros(data.raw_dim());
                for (src, mut dst) in data.rows().into_iter().zip(out.rows_mut()) {
                    let y = sos_filtfilt(&sections, src, iir_pad(order));
                    dst.assign(&ArrayView1::from(&y[..]));
                }
                FilteredBand {
                    data: out,
                    strategy: FilterStrategy::Butterworth { order },
                    fallback_reason: None,
                }
            }
            FilterPlan::Fir { taps, reason } => {
                let fir = FftFir::new(&taps, n + 2 * fir_pad(taps.len()));
                let mut out = Array2::zeros(data.raw_dim());
                for (src, mut dst) in data.rows().into_iter().zip(out.rows_mut()) {
                    let y = fir.filtfilt(src, fir_pad(taps.len()));
                    dst.assign(&ArrayView1::from(&y[..]));
                }
                FilteredBand {
                    data: out,
                    strategy: FilterStrategy::WindowedSinc { taps: taps.len() },
                    fallback_reason: Some(reason),
                }
            }
        }
    }
}

fn iir_pad(order: usize) -> usize {
    6 * order
}

fn fir_pad(taps: usize) -> usize {
    3 * (taps - 1)
}

// ---------------------------------------------------------------------------
// IIR: Butterworth band-pass as second-order sections
// ---------------------------------------------------------------------------

/// One normalized (a0 = 1) second-order section.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl Biquad {
    /// Poles strictly inside the unit circle (stability triangle).
    fn is_stable(&self) -> bool {
        [self.b0, self.b1, self.b2, self.a1, self.a2]
            .iter()
            .all(|c| c.is_finite())
            && self.a2.abs() < 1.0
            && self.a1.abs() < 1.0 + self.a2
    }

    fn response(&self, omega: f64) -> Complex<f64> {
        let z1 = Complex::from_polar(1.0, -omega);
        let z2 = z1 * z1;
        (z1 * self.b1 + z2 * self.b2 + self.b0) / (z1 * self.a1 + z2 * self.a2 + 1.0)
    }

    fn dc_gain(&self) -> f64 {
        let den = 1.0 + self.a1 + self.a2;
        if den.abs() < 1e-15 {
            0.0
        } else {
            (self.b0 + self.b1 + self.b2) / den
        }
    }

    /// Transposed direct form II, state initialized to the step response
    /// steady state for `x[0]` so the edge does not ring.
    fn run(&self, x: &mut [f64]) {
        let Some(&x0) = x.first() else { return };
        let y0 = self.dc_gain() * x0;
        let mut s1 = y0 - self.b0 * x0;
        let mut s2 = self.b2 * x0 - self.a2 * y0;
        for v in x.iter_mut() {
            let xin = *v;
            let y = self.b0 * xin + s1;
            s1 = self.b1 * xin - self.a1 * y + s2;
            s2 = self.b2 * xin - self.a2 * y;
            *v = y;
        }
    }
}

/// Butterworth band-pass with `order` prototype poles (`order` sections),
/// unit gain at the geometric band center.
fn butterworth_bandpass(low_hz: f64, high_hz: f64, sfreq: f64, order: usize) -> Vec<Biquad> {
    let fs2 = 2.0 * sfreq;
    let w1 = fs2 * (PI * low_hz / sfreq).tan();
    let w2 = fs2 * (PI * high_hz / sfreq).tan();
    let bw = w2 - w1;
    let w0_sq = w1 * w2;
    let center = 2.0 * (w0_sq.sqrt() / fs2).atan();

    let mut sections = Vec::with_capacity(order);
    for k in 0..order / 2 {
        // Upper-half-plane prototype pole; its conjugate yields the conjugate sections.
        let theta = PI * (2 * k + order + 1) as f64 / (2 * order) as f64;
        let p = Complex::from_polar(1.0, theta) * (bw / 2.0);
        let root = (p * p - w0_sq).sqrt();
        for s in [p + root, p - root] {
            let z = (s + fs2) / (-s + fs2);
            let mut section = Biquad {
                b0: 1.0,
                b1: 0.0,
                b2: -1.0,
                a1: -2.0 * z.re,
                a2: z.norm_sqr(),
            };
            let gain = section.response(center).norm();
            if gain > 0.0 && gain.is_finite() {
                section.b0 /= gain;
                section.b2 /= gain;
            }
            sections.push(section);
        }
    }
    sections
}

fn sos_filtfilt(sections: &[Biquad], x: ArrayView1<'_, f64>, pad: usize) -> Vec<f64> {
    let n = x.len();
    let mut y = odd_extend(x, pad);
    for section in sections {
        section.run(&mut y);
    }
    y.reverse();
    for section in sections {
        section.run(&mut y);
    }
    y.reverse();
    y[pad..pad + n].to_vec()
}

// ---------------------------------------------------------------------------
// FIR fallback: windowed sinc, FFT convolution
// ---------------------------------------------------------------------------

fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-12 {
        1.0
    } else {
        (PI * x).sin() / (PI * x)
    }
}

/// Hamming-windowed sinc band-pass (low-pass when `low_hz <= 0`), odd `taps`,
/// scaled to unit gain at the band center. The high edge is clamped below Nyquist.
fn windowed_sinc_bandpass(low_hz: f64, high_hz: f64, sfreq: f64, taps: usize) -> Vec<f64> {
    let fh = high_hz.min(0.99 * sfreq / 2.0) / sfreq;
    let fl = low_hz.max(0.0) / sfreq;
    let m = (taps - 1) as f64 / 2.0;

    let mut h: Vec<f64> = (0..taps)
        .map(|i| {
            let k = i as f64 - m;
            let ideal = 2.0 * fh * sinc(2.0 * fh * k) - 2.0 * fl * sinc(2.0 * fl * k);
            let window = 0.54 - 0.46 * (2.0 * PI * i as f64 / (taps - 1) as f64).cos();
            ideal * window
        })
        .collect();

    let fc = if fl > 0.0 { (fl + fh) / 2.0 } else { 0.0 };
    let gain: f64 = h
        .iter()
        .enumerate()
        .map(|(i, &c)| c * (2.0 * PI * fc * (i as f64 - m)).cos())
        .sum::<f64>()
        .abs();
    if gain > 1e-12 {
        for c in &mut h {
            *c /= gain;
        }
    }
    h
}

/// Causal FIR applied by FFT convolution, sized once for a fixed input length.
struct FftFir {
    kernel: Vec<Complex<f64>>,
    forward: std::sync::Arc<dyn rustfft::Fft<f64>>,
    inverse: std::sync::Arc<dyn rustfft::Fft<f64>>,
    size: usize,
}

impl FftFir {
    fn new(taps: &[f64], input_len: usize) -> Self {
        let size = input_len + taps.len() - 1;
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(size);
        let inverse = planner.plan_fft_inverse(size);
        let mut kernel: Vec<Complex<f64>> = taps
            .iter()
            .map(|&re| Complex { re, im: 0.0 })
            .chain(std::iter::repeat(Complex { re: 0.0, im: 0.0 }))
            .take(size)
            .collect();
        forward.process(&mut kernel);
        Self {
            kernel,
            forward,
            inverse,
            size,
        }
    }

    /// First `x.len()` samples of the full linear convolution.
    fn convolve(&self, x: &[f64]) -> Vec<f64> {
        let mut buffer: Vec<Complex<f64>> = x
            .iter()
            .map(|&re| Complex { re, im: 0.0 })
            .chain(std::iter::repeat(Complex { re: 0.0, im: 0.0 }))
            .take(self.size)
            .collect();
        self.forward.process(&mut buffer);
        for (b, k) in buffer.iter_mut().zip(&self.kernel) {
            *b *= *k;
        }
        self.inverse.process(&mut buffer);
        let scale = 1.0 / self.size as f64;
        buffer[..x.len()].iter().map(|c| c.re * scale).collect()
    }

    fn filtfilt(&self, x: ArrayView1<'_, f64>, pad: usize) -> Vec<f64> {
        let n = x.len();
        let mut y = self.convolve(&odd_extend(x, pad));
        y.reverse();
        let mut y = self.convolve(&y);
        y.reverse();
        y[pad..pad + n].to_vec()
    }
}

/// Odd reflection about both end points: `2*x[0] - x[i]` on the left,
/// `2*x[n-1] - x[n-1-i]` on the right. Requires `pad < x.len()`.
fn odd_extend(x: ArrayView1<'_, f64>, pad: usize) -> Vec<f64> {
    let n = x.len();
    let pad = pad.min(n.saturating_sub(1));
    let mut out = Vec::with_capacity(n + 2 * pad);
    if n == 0 {
        return out;
    }
    let first = x[0];
    let last = x[n - 1];
    out.extend((1..=pad).rev().map(|i| 2.0 * first - x[i]));
    out.extend(x.iter().copied());
    out.extend((1..=pad).map(|i| 2.0 * last - x[n - 1 - i]));
    out
}
