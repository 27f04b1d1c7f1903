//! Immutable result records and non-fatal diagnostics.

use serde::Serialize;

use crate::dimension::DimensionEstimate;
use crate::score::composite_mvi;
use crate::spectral::{BandFeatures, SpectralFeatures};

/// Non-fatal condition that degraded a value to its documented default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Entropy did not vary across scales; the dimension was set to 1.
    UnreliableDimensionEstimate,
    /// The preferred band-pass design was unavailable; a fallback was used.
    FilterDesignFailure,
    /// A band's φ series had no usable variance against MVI; correlation set to 0.
    DegenerateCorrelation,
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnreliableDimensionEstimate => write!(f, "unreliable_dimension_estimate"),
            Self::FilterDesignFailure => write!(f, "filter_design_failure"),
            Self::DegenerateCorrelation => write!(f, "degenerate_correlation"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Band the condition applies to, if any.
    pub band: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn unreliable_dimension(message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::UnreliableDimensionEstimate,
            band: None,
            message: message.into(),
        }
    }

    pub fn filter_design_failure(band: &str, message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::FilterDesignFailure,
            band: Some(band.to_string()),
            message: message.into(),
        }
    }

    pub fn degenerate_correlation(band: &str, message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::DegenerateCorrelation,
            band: Some(band.to_string()),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.band {
            Some(band) => write!(f, "[{}] {band}: {}", self.kind, self.message),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}

/// Validity descriptors for one window, or for the whole recording.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidityRecord {
    /// Share of variance in the first eigenmode, in (0, 1].
    pub fe1: f64,
    /// (Σλ)² / Σλ², in [1, channels].
    pub effective_rank: f64,
    /// Information-dimension proxy, >= 1.
    pub dimension: f64,
    pub dimension_reliable: bool,
    pub bands: Vec<BandFeatures>,
    pub phi_max: f64,
    pub mvi: f64,
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidityRecord {
    pub fn new(spectral: SpectralFeatures, dimension: DimensionEstimate) -> Self {
        let mut diagnostics = spectral.diagnostics;
        if let Some(reason) = &dimension.unreliable_reason {
            diagnostics.push(Diagnostic::unreliable_dimension(reason.clone()));
        }
        let mvi = composite_mvi(
            spectral.fe1,
            spectral.effective_rank,
            dimension.value,
            spectral.phi_max,
        );
        Self {
            fe1: spectral.fe1,
            effective_rank: spectral.effective_rank,
            dimension: dimension.value,
            dimension_reliable: dimension.is_reliable(),
            bands: spectral.bands,
            phi_max: spectral.phi_max,
            mvi,
            diagnostics,
        }
    }

    /// φ_b in configured band order.
    pub fn band_fractions(&self) -> Vec<f64> {
        self.bands.iter().map(|b| b.fraction).collect()
    }

    pub fn has_diagnostic(&self, kind: DiagnosticKind) -> bool {
        self.diagnostics.iter().any(|d| d.kind == kind)
    }
}

/// A [`ValidityRecord`] placed on the recording's timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowRecord {
    pub index: usize,
    pub start_sample: usize,
    pub start_secs: f64,
    /// Variance of the global field power within the window.
    pub gfp_variance: f64,
    #[serde(flatten)]
    pub record: ValidityRecord,
}
