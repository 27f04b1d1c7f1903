//! The analysis pipeline: window, decompose, estimate, score, rank.
//!
//! Every entry point runs the same pass ([`MviEngine::analyze_full`]); the
//! narrower reports are projections of it.

use std::sync::atomic::{AtomicBool, Ordering};

use ndarray::s;
use serde::Serialize;

use crate::config::MviConfig;
use crate::dimension::DimensionEstimator;
use crate::error::{MviError, Result};
use crate::filter::{BandFilter, ZeroPhaseBandPass};
use crate::ranking::{BandRanking, rank_bands};
use crate::record::{ValidityRecord, WindowRecord};
use crate::score::Decision;
use crate::signal::{Signal, global_field_power};
use crate::spectral::SpectralDecomposer;
use crate::window::{AnalysisWindow, WindowSpec, Windower};

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Global plus time-varying validity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MviReport {
    pub global: ValidityRecord,
    pub decision: Decision,
    pub threshold: f64,
    pub windows: Vec<WindowRecord>,
}

/// Time-varying validity with the band relevance ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedReport {
    pub windows: Vec<WindowRecord>,
    /// Global field power at every sample of the centered recording.
    pub gfp: Vec<f64>,
    pub ranking: BandRanking,
}

/// Everything one analysis pass produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullReport {
    pub channels: usize,
    pub samples: usize,
    pub sfreq: f64,
    pub window: WindowSpec,
    pub global: ValidityRecord,
    pub decision: Decision,
    pub threshold: f64,
    pub windows: Vec<WindowRecord>,
    pub gfp: Vec<f64>,
    pub ranking: BandRanking,
}

impl FullReport {
    pub fn into_report(self) -> MviReport {
        MviReport {
            global: self.global,
            decision: self.decision,
            threshold: self.threshold,
            windows: self.windows,
        }
    }

    pub fn into_ranked(self) -> RankedReport {
        RankedReport {
            windows: self.windows,
            gfp: self.gfp,
            ranking: self.ranking,
        }
    }

    /// MVI of every window, in order.
    pub fn mvi_series(&self) -> Vec<f64> {
        self.windows.iter().map(|w| w.record.mvi).collect()
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct MviEngine {
    config: MviConfig,
    filter: Box<dyn BandFilter>,
}

impl std::fmt::Debug for MviEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MviEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl MviEngine {
    /// Engine with the default zero-phase band-pass filters.
    pub fn new(config: MviConfig) -> Result<Self> {
        let filter = ZeroPhaseBandPass::new(config.filter);
        Self::with_filter(config, Box::new(filter))
    }

    /// Engine with a caller-supplied band filter.
    pub fn with_filter(config: MviConfig, filter: Box<dyn BandFilter>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, filter })
    }

    pub fn config(&self) -> &MviConfig {
        &self.config
    }

    pub fn analyze(&self, signal: &Signal) -> Result<MviReport> {
        self.analyze_full(signal, None).map(FullReport::into_report)
    }

    pub fn analyze_with_ranking(&self, signal: &Signal) -> Result<RankedReport> {
        self.analyze_full(signal, None).map(FullReport::into_ranked)
    }

    /// Run the whole pipeline. `cancel` is polled before every window; once
    /// it reads `true` the run stops with [`MviError::Cancelled`].
    pub fn analyze_full(&self, signal: &Signal, cancel: Option<&AtomicBool>) -> Result<FullReport> {
        let sfreq = signal.sfreq();
        let spec = WindowSpec::from_secs(self.config.window_secs, self.config.step_secs, sfreq)?;
        let windower = Windower::new(signal, spec, self.config.centering)?;

        let decomposer = SpectralDecomposer::new(&self.config.bands, self.filter.as_ref(), sfreq);
        let estimator = DimensionEstimator::new(self.config.num_scales);
        let gfp = global_field_power(windower.centered());

        let stage = WindowStage {
            windower: &windower,
            decomposer: &decomposer,
            estimator,
            gfp: &gfp,
            cancel,
        };
        let windows = stage.run(self.config.workers)?;

        let segment = ((self.config.global_segment_secs * sfreq).round() as usize).max(1);
        let global = ValidityRecord::new(
            decomposer.decompose(windower.centered()),
            estimator.estimate_global(windower.centered(), segment),
        );
        let decision = Decision::from_mvi(global.mvi, self.config.threshold);
        let ranking = rank_bands(&self.config.bands, &windows);

        log::debug!(
            "analyzed {} ch x {} samples: {} windows, global MVI {:.4} ({decision})",
            signal.channels(),
            signal.samples(),
            windows.len(),
            global.mvi,
        );

        Ok(FullReport {
            channels: signal.channels(),
            samples: signal.samples(),
            sfreq,
            window: spec,
            global,
            decision,
            threshold: self.config.threshold,
            windows,
            gfp,
            ranking,
        })
    }
}

// ---------------------------------------------------------------------------
// Per-window stage
// ---------------------------------------------------------------------------

struct WindowStage<'a> {
    windower: &'a Windower,
    decomposer: &'a SpectralDecomposer<'a>,
    estimator: DimensionEstimator,
    gfp: &'a [f64],
    cancel: Option<&'a AtomicBool>,
}

impl WindowStage<'_> {
    /// Records for every window, in window order.
    fn run(&self, workers: usize) -> Result<Vec<WindowRecord>> {
        let windows: Vec<AnalysisWindow> = self.windower.windows().collect();
        if workers <= 1 || windows.len() <= 1 {
            return self.run_chunk(&windows);
        }

        let chunk_len = windows.len().div_ceil(workers);
        let chunks: Vec<Result<Vec<WindowRecord>>> = std::thread::scope(|s| {
            let handles: Vec<_> = windows
                .chunks(chunk_len)
                .map(|chunk| s.spawn(move || self.run_chunk(chunk)))
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
                })
                .collect()
        });

        let mut records = Vec::with_capacity(windows.len());
        for chunk in chunks {
            records.extend(chunk?);
        }
        Ok(records)
    }

    fn run_chunk(&self, windows: &[AnalysisWindow]) -> Result<Vec<WindowRecord>> {
        windows
            .iter()
            .map(|window| {
                if self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                    log::warn!("analysis cancelled at window {}", window.index);
                    return Err(MviError::Cancelled {
                        window: window.index,
                    });
                }
                Ok(self.record(window))
            })
            .collect()
    }

    fn record(&self, window: &AnalysisWindow) -> WindowRecord {
        let data = self.windower.view(window);
        let dimension = self.estimator.estimate(data);
        if let Some(reason) = &dimension.unreliable_reason {
            log::warn!("window {}: unreliable dimension estimate ({reason})", window.index);
        }
        let record = ValidityRecord::new(self.decomposer.decompose(data), dimension);

        let gfp = ndarray::ArrayView1::from(self.gfp)
            .slice_move(s![window.start..window.start + window.len]);
        WindowRecord {
            index: window.index,
            start_sample: window.start,
            start_secs: window.start_secs,
            gfp_variance: gfp.var(0.0),
            record,
        }
    }
}
