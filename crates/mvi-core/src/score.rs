//! Composite Microstate Validity Index and the validity decision.

use serde::Serialize;

/// `MVI = (FE1 / effective_rank) × (1 / D) × φ_max`.
///
/// Each factor shrinks as the data departs from a single dominant,
/// low-dimensional, band-concentrated mode, so the product lies in `[0, 1]`
/// whenever its inputs respect their own ranges.
pub fn composite_mvi(fe1: f64, effective_rank: f64, dimension: f64, phi_max: f64) -> f64 {
    let rank = effective_rank.max(1.0);
    let dim = dimension.max(1.0);
    let mvi = (fe1 / rank) * (1.0 / dim) * phi_max;
    if mvi.is_finite() { mvi.max(0.0) } else { 0.0 }
}

/// Whether a one-hot microstate model is supported by the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Valid,
    LikelyInvalid,
}

impl Decision {
    /// `Valid` iff `mvi` is strictly greater than `threshold`.
    pub fn from_mvi(mvi: f64, threshold: f64) -> Self {
        if mvi > threshold {
            Self::Valid
        } else {
            Self::LikelyInvalid
        }
    }

    pub fn is_valid(self) -> bool {
        self == Self::Valid
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Valid => write!(f, "one-hot microstate model valid"),
            Self::LikelyInvalid => write!(
                f,
                "one-hot model likely invalid; subspace-aware methods recommended"
            ),
        }
    }
}
