//! Fatal error taxonomy for the MVI engine.
//!
//! Only conditions that make an analysis meaningless abort it. Per-window
//! degradations (unreliable dimension estimates, filter fallbacks, degenerate
//! correlations) are reported as [`Diagnostic`](crate::record::Diagnostic)s
//! on the records instead.

use thiserror::Error;

/// Common result type for engine operations.
pub type Result<T> = std::result::Result<T, MviError>;

/// Errors that abort an analysis. No partial results accompany them.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MviError {
    /// The signal matrix or sampling rate is malformed.
    #[error("Invalid signal: {0}")]
    InvalidSignal(String),

    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The recording is shorter than a single analysis window.
    #[error("Insufficient length: {samples} samples, one window needs {window}")]
    InsufficientLength { samples: usize, window: usize },

    /// The caller raised the cancellation flag between windows.
    #[error("Analysis cancelled before window {window}")]
    Cancelled { window: usize },
}
