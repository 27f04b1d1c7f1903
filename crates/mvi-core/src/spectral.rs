//! Channel-covariance eigenspectra and band variance attribution.
//!
//! Per window: broadband spectrum of the unit-variance channels (FE1 and
//! effective rank), plus one band-limited covariance per configured band
//! whose trace, relative to the broadband trace, is the band's variance
//! fraction φ_b.

use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{Array2, ArrayView2, Axis};
use serde::Serialize;
use std::cmp::Ordering;

use crate::config::FrequencyBand;
use crate::filter::{BandFilter, FilterStrategy};
use crate::record::Diagnostic;

/// Added to per-channel standard deviations before dividing.
pub const NORMALIZATION_EPS: f64 = 1e-12;

/// Sorted-descending, non-negative eigenvalues of a channel covariance.
#[derive(Debug, Clone, PartialEq)]
pub struct CovarianceSpectrum {
    eigenvalues: Vec<f64>,
}

impl CovarianceSpectrum {
    pub fn from_covariance(cov: &Array2<f64>) -> Self {
        let c = cov.nrows();
        // Symmetrize so round-off cannot leak into the eigen solver.
        let matrix = DMatrix::from_fn(c, c, |i, j| 0.5 * (cov[[i, j]] + cov[[j, i]]));
        let eigen = SymmetricEigen::new(matrix);
        let mut eigenvalues: Vec<f64> = eigen
            .eigenvalues
            .iter()
            .map(|&v| if v.is_finite() { v.max(0.0) } else { 0.0 })
            .collect();
        eigenvalues.sort_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));
        Self { eigenvalues }
    }

    pub fn eigenvalues(&self) -> &[f64] {
        &self.eigenvalues
    }

    pub fn total(&self) -> f64 {
        self.eigenvalues.iter().sum()
    }

    /// FE1: share of variance in the first eigenmode.
    pub fn top_fraction(&self) -> f64 {
        top_eigen_fraction(&self.eigenvalues)
    }

    pub fn effective_rank(&self) -> f64 {
        effective_rank(&self.eigenvalues)
    }
}

/// λ₁ / Σλ for descending eigenvalues. A spectrum with no variance has no
/// dominant mode and reports `1 / C`.
pub fn top_eigen_fraction(eigenvalues: &[f64]) -> f64 {
    let c = eigenvalues.len().max(1) as f64;
    let total: f64 = eigenvalues.iter().sum();
    match eigenvalues.first() {
        Some(&top) if total > 0.0 => (top / total).clamp(1.0 / c, 1.0),
        _ => 1.0 / c,
    }
}

/// (Σλ)² / Σλ², clamped to `[1, C]`. A spectrum with no variance reports `C`.
pub fn effective_rank(eigenvalues: &[f64]) -> f64 {
    let c = eigenvalues.len().max(1) as f64;
    let total: f64 = eigenvalues.iter().sum();
    let sum_sq: f64 = eigenvalues.iter().map(|v| v * v).sum();
    if total > 0.0 && sum_sq > 0.0 {
        (total * total / sum_sq).clamp(1.0, c)
    } else {
        c
    }
}

/// Sample covariance (1 / (n - 1)) of the rows of `data`, each row
/// centered on its own mean first.
pub fn covariance(data: ArrayView2<'_, f64>) -> Array2<f64> {
    let n = data.ncols();
    let means = data
        .mean_axis(Axis(1))
        .unwrap_or_else(|| ndarray::Array1::zeros(data.nrows()));
    let centered = &data - &means.insert_axis(Axis(1));
    let denom = n.saturating_sub(1).max(1) as f64;
    centered.dot(&centered.t()) / denom
}

pub fn trace(cov: &Array2<f64>) -> f64 {
    cov.diag().sum()
}

/// Scale each channel to unit standard deviation within the window.
pub fn normalize_channels(data: ArrayView2<'_, f64>) -> Array2<f64> {
    let mut out = data.to_owned();
    for mut row in out.rows_mut() {
        let mean = row.mean().unwrap_or(0.0);
        let sd = row.std(0.0);
        row.mapv_inplace(|v| (v - mean) / (sd + NORMALIZATION_EPS));
    }
    out
}

/// Variance attribution for one band in one window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandFeatures {
    pub name: String,
    /// φ_b = trace(C_band) / trace(C_broadband).
    pub fraction: f64,
    /// Effective rank of the band-limited covariance.
    pub effective_rank: f64,
    pub filter: FilterStrategy,
}

/// Spectral descriptors of one window (or of the whole recording).
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralFeatures {
    pub fe1: f64,
    pub effective_rank: f64,
    pub bands: Vec<BandFeatures>,
    /// Largest φ_b; 0 with no bands configured.
    pub phi_max: f64,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct SpectralDecomposer<'a> {
    bands: &'a [FrequencyBand],
    filter: &'a dyn BandFilter,
    sfreq: f64,
}

impl<'a> SpectralDecomposer<'a> {
    pub fn new(bands: &'a [FrequencyBand], filter: &'a dyn BandFilter, sfreq: f64) -> Self {
        Self {
            bands,
            filter,
            sfreq,
        }
    }

    /// Decompose a centered channels × samples block.
    pub fn decompose(&self, window: ArrayView2<'_, f64>) -> SpectralFeatures {
        let normalized = normalize_channels(window);
        let broadband = CovarianceSpectrum::from_covariance(&covariance(normalized.view()));
        let broadband_trace = trace(&covariance(window));

        let mut diagnostics = Vec::new();
        let bands: Vec<BandFeatures> = self
            .bands
            .iter()
            .map(|band| {
                let filtered = self.filter.filter(window, band, self.sfreq);
                if let Some(reason) = &filtered.fallback_reason {
                    log::debug!("band {}: {} ({reason})", band.name, filtered.strategy);
                    diagnostics.push(Diagnostic::filter_design_failure(
                        &band.name,
                        format!("{} used instead of Butterworth: {reason}", filtered.strategy),
                    ));
                }
                let band_cov = covariance(filtered.data.view());
                let fraction = if broadband_trace > 0.0 {
                    (trace(&band_cov) / broadband_trace).max(0.0)
                } else {
                    0.0
                };
                BandFeatures {
                    name: band.name.clone(),
                    fraction,
                    effective_rank: CovarianceSpectrum::from_covariance(&band_cov)
                        .effective_rank(),
                    filter: filtered.strategy,
                }
            })
            .collect();

        let phi_max = bands.iter().map(|b| b.fraction).fold(0.0, f64::max);

        SpectralFeatures {
            fe1: broadband.top_fraction(),
            effective_rank: broadband.effective_rank(),
            bands,
            phi_max,
            diagnostics,
        }
    }
}
