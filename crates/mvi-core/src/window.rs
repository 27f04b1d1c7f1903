//! Sliding analysis windows over a centered recording.
//!
//! `count = floor((T - W) / S) + 1`; the trailing partial window is dropped.

use ndarray::{Array2, ArrayView2, s};
use serde::Serialize;

use crate::config::Centering;
use crate::error::{MviError, Result};
use crate::signal::Signal;

/// Window length and stride in samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowSpec {
    pub window_samples: usize,
    pub step_samples: usize,
}

impl WindowSpec {
    pub fn new(window_samples: usize, step_samples: usize) -> Result<Self> {
        if window_samples == 0 || step_samples == 0 {
            return Err(MviError::InvalidConfig(format!(
                "window ({window_samples}) and step ({step_samples}) must be at least one sample"
            )));
        }
        Ok(Self {
            window_samples,
            step_samples,
        })
    }

    /// Convert seconds to samples (rounded, at least one sample each).
    pub fn from_secs(window_secs: f64, step_secs: f64, sfreq: f64) -> Result<Self> {
        let to_samples = |secs: f64| ((secs * sfreq).round() as usize).max(1);
        Self::new(to_samples(window_secs), to_samples(step_secs))
    }

    /// Number of full windows in `total_samples`, or `InsufficientLength`.
    pub fn count(&self, total_samples: usize) -> Result<usize> {
        window_count(total_samples, self.window_samples, self.step_samples).ok_or(
            MviError::InsufficientLength {
                samples: total_samples,
                window: self.window_samples,
            },
        )
    }
}

/// Closed-form window count. `None` when not even one window fits.
pub fn window_count(total_samples: usize, window_samples: usize, step_samples: usize) -> Option<usize> {
    if window_samples == 0 || step_samples == 0 || total_samples < window_samples {
        return None;
    }
    Some((total_samples - window_samples) / step_samples + 1)
}

/// One analysis window: `[start, start + len)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnalysisWindow {
    pub index: usize,
    pub start: usize,
    pub len: usize,
    pub start_secs: f64,
}

/// Owns the centered recording and hands out windows over it.
#[derive(Debug, Clone)]
pub struct Windower {
    centered: Array2<f64>,
    spec: WindowSpec,
    count: usize,
    sfreq: f64,
}

impl Windower {
    /// Center `signal` once and prepare `spec`-sized windows over it.
    pub fn new(signal: &Signal, spec: WindowSpec, centering: Centering) -> Result<Self> {
        let count = spec.count(signal.samples())?;
        Ok(Self {
            centered: signal.centered(centering),
            spec,
            count,
            sfreq: signal.sfreq(),
        })
    }

    pub fn spec(&self) -> WindowSpec {
        self.spec
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The whole centered recording.
    pub fn centered(&self) -> ArrayView2<'_, f64> {
        self.centered.view()
    }

    /// A fresh pass over all windows, in order.
    pub fn windows(&self) -> Windows {
        Windows {
            spec: self.spec,
            sfreq: self.sfreq,
            next: 0,
            count: self.count,
        }
    }

    /// Channels × window samples view for `window`.
    pub fn view(&self, window: &AnalysisWindow) -> ArrayView2<'_, f64> {
        self.centered
            .slice(s![.., window.start..window.start + window.len])
    }
}

/// Ordered, finite iterator over [`AnalysisWindow`]s.
#[derive(Debug, Clone)]
pub struct Windows {
    spec: WindowSpec,
    sfreq: f64,
    next: usize,
    count: usize,
}

impl Iterator for Windows {
    type Item = AnalysisWindow;

    fn next(&mut self) -> Option<AnalysisWindow> {
        if self.next >= self.count {
            return None;
        }
        let index = self.next;
        self.next += 1;
        let start = index * self.spec.step_samples;
        Some(AnalysisWindow {
            index,
            start,
            len: self.spec.window_samples,
            start_secs: start as f64 / self.sfreq,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.count - self.next;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Windows {}
