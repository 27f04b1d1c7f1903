//! # mvi-core
//!
//! **Does a one-hot microstate model fit this recording?**
//!
//! `mvi-core` scores how well a multichannel recording (EEG and alike) is
//! described by a sequence of single, mutually exclusive spatial prototypes.
//! It measures spatial concentration of the channel covariance, the intrinsic
//! dimensionality of the samples, and how much of the variance one frequency
//! band carries, and folds them into the Microstate Validity Index (MVI).
//!
//! ## Quick Start
//!
//! ```no_run
//! use mvi_core::{MviConfig, MviEngine, Signal};
//!
//! let data = ndarray::Array2::<f64>::zeros((8, 2500));
//! let signal = Signal::new(data, 250.0).unwrap();
//!
//! let engine = MviEngine::new(MviConfig::default()).unwrap();
//! let report = engine.analyze(&signal).unwrap();
//! println!("MVI {:.3}: {}", report.global.mvi, report.decision);
//! ```
//!
//! ## Architecture
//!
//! Signal → Windower → (Spectral Decomposer, Dimension Estimator) → Scorer → Ranking
//!
//! - **Windower**: centers the recording once and yields fixed-length,
//!   fixed-stride windows (trailing partial window dropped).
//! - **Spectral Decomposer**: eigenspectrum of the unit-variance channel
//!   covariance (FE1, effective rank) and per-band variance fractions from
//!   zero-phase band-pass filters.
//! - **Dimension Estimator**: Rényi information dimension proxy from the slope
//!   of quantized entropy against `ln(1/ε)`.
//! - **Scorer**: `MVI = FE1 / rank × 1 / D × φ_max`, thresholded for a decision.
//! - **Ranking**: which band tracks the MVI over time.
//!
//! Conditions that make a value meaningless but not the analysis (flat
//! entropy, a band the preferred filter cannot realize, a constant series)
//! are attached to the records as [`Diagnostic`]s; only malformed input,
//! bad configuration, a too-short recording or cancellation fail a run.

pub mod config;
pub mod dimension;
pub mod engine;
pub mod error;
pub mod filter;
pub mod ranking;
pub mod record;
pub mod score;
pub mod signal;
pub mod spectral;
pub mod window;

pub use config::{Centering, DEFAULT_THRESHOLD, FilterConfig, FrequencyBand, MviConfig, default_bands};
pub use dimension::{DimensionEstimate, DimensionEstimator};
pub use engine::{FullReport, MviEngine, MviReport, RankedReport};
pub use error::{MviError, Result};
pub use filter::{BandFilter, FilterStrategy, FilteredBand, ZeroPhaseBandPass};
pub use ranking::{BandRanking, BandRelevanceScore, RelevanceBasis, rank_bands};
pub use record::{Diagnostic, DiagnosticKind, ValidityRecord, WindowRecord};
pub use score::{Decision, composite_mvi};
pub use signal::{Signal, global_field_power};
pub use spectral::{BandFeatures, SpectralDecomposer, SpectralFeatures, effective_rank, top_eigen_fraction};
pub use window::{AnalysisWindow, WindowSpec, Windower, window_count};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
