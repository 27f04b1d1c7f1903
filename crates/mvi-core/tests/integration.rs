//! Integration tests for mvi-core.
//!
//! These tests run the full pipeline on synthetic recordings:
//! signal → windows → spectra and dimension → MVI → decision and ranking.

use std::f64::consts::PI;
use std::sync::atomic::AtomicBool;

use mvi_core::spectral::{CovarianceSpectrum, covariance, normalize_channels};
use mvi_core::{
    Centering, Decision, MviConfig, MviEngine, MviError, RelevanceBasis, Signal, composite_mvi,
    window_count,
};
use ndarray::Array2;
use proptest::prelude::*;

const SFREQ: f64 = 250.0;

fn lcg_noise(channels: usize, n: usize, seed: u64) -> Array2<f64> {
    let mut state = seed;
    Array2::from_shape_fn((channels, n), |_| {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (state >> 11) as f64 / (1u64 << 53) as f64 - 0.5
    })
}

/// Scaled copies of one 10 Hz waveform.
fn rank_one(channels: usize, seconds: f64) -> Signal {
    let n = (seconds * SFREQ) as usize;
    let data = Array2::from_shape_fn((channels, n), |(c, t)| {
        (1.0 + 0.3 * c as f64) * (2.0 * PI * 10.0 * t as f64 / SFREQ).sin()
    });
    Signal::new(data, SFREQ).unwrap()
}

fn white_noise(channels: usize, seconds: f64, seed: u64) -> Signal {
    let n = (seconds * SFREQ) as usize;
    Signal::new(lcg_noise(channels, n, seed), SFREQ).unwrap()
}

/// Alpha rank-1 component whose amplitude swells and fades every 10 s, over
/// independent channel noise.
fn waxing_alpha(channels: usize, seconds: f64) -> Signal {
    let n = (seconds * SFREQ) as usize;
    let noise = lcg_noise(channels, n, 99);
    let data = Array2::from_shape_fn((channels, n), |(c, t)| {
        let secs = t as f64 / SFREQ;
        let envelope = 0.5 * (1.0 + (2.0 * PI * 0.1 * secs).sin());
        let alpha = (1.0 + 0.2 * c as f64) * envelope * (2.0 * PI * 10.0 * secs).sin();
        alpha + noise[[c, t]]
    });
    Signal::new(data, SFREQ).unwrap()
}

fn engine() -> MviEngine {
    MviEngine::new(MviConfig::default()).unwrap()
}

#[test]
fn rank_one_signal_is_valid() {
    let report = engine().analyze(&rank_one(8, 10.0)).unwrap();

    assert!(report.global.fe1 > 0.999, "fe1 {}", report.global.fe1);
    assert!(report.global.effective_rank < 1.01);
    assert!(report.global.dimension >= 1.0);
    assert!(report.global.mvi > 0.5, "mvi {}", report.global.mvi);
    assert_eq!(report.decision, Decision::Valid);
    // (2500 - 500) / 125 + 1
    assert_eq!(report.windows.len(), 17);
}

#[test]
fn white_noise_is_not() {
    let report = engine().analyze(&white_noise(8, 10.0, 7)).unwrap();

    assert!(report.global.effective_rank > 7.0);
    assert!(report.global.fe1 < 0.2);
    assert!(report.global.mvi < 0.05, "mvi {}", report.global.mvi);
    assert_eq!(report.decision, Decision::LikelyInvalid);
    for w in &report.windows {
        assert!(w.record.fe1 > 0.0 && w.record.fe1 <= 1.0);
        assert!(w.record.effective_rank >= 1.0 && w.record.effective_rank <= 8.0);
        assert!(w.record.dimension >= 1.0);
        assert!(w.record.mvi >= 0.0);
    }
}

#[test]
fn rank_one_beats_noise_window_by_window() {
    let structured = engine().analyze(&rank_one(8, 6.0)).unwrap();
    let noise = engine().analyze(&white_noise(8, 6.0, 3)).unwrap();
    assert_eq!(structured.windows.len(), noise.windows.len());
    for (s, n) in structured.windows.iter().zip(&noise.windows) {
        assert!(s.record.mvi > n.record.mvi);
    }
}

#[test]
fn too_short_recording_fails_without_records() {
    let err = engine().analyze(&white_noise(8, 0.4, 1)).unwrap_err();
    assert_eq!(
        err,
        MviError::InsufficientLength {
            samples: 100,
            window: 500
        }
    );
}

#[test]
fn relevance_is_a_distribution() {
    for signal in [white_noise(6, 8.0, 11), waxing_alpha(6, 8.0), rank_one(6, 8.0)] {
        let ranked = engine().analyze_with_ranking(&signal).unwrap();
        let total: f64 = ranked.ranking.scores.iter().map(|s| s.relevance).sum();
        assert!((total - 1.0).abs() < 1e-9, "sum {total}");
        assert!(ranked.ranking.scores.iter().all(|s| s.relevance >= 0.0));
        assert!(ranked.ranking.most_relevant.is_some());
        assert_eq!(ranked.gfp.len(), signal.samples());
    }
}

#[test]
fn waxing_alpha_ranks_alpha_first() {
    let ranked = engine().analyze_with_ranking(&waxing_alpha(8, 20.0)).unwrap();

    assert_eq!(ranked.windows.len(), 37);
    assert_eq!(ranked.ranking.basis, RelevanceBasis::Correlated);
    assert_eq!(ranked.ranking.most_relevant.as_deref(), Some("alpha"));
    let alpha = &ranked.ranking.scores[1];
    assert!(alpha.correlation > 0.5, "corr {}", alpha.correlation);
}

#[test]
fn repeated_runs_are_identical() {
    let signal = waxing_alpha(6, 8.0);
    let first = engine().analyze_full(&signal, None).unwrap();
    let second = engine().analyze_full(&signal, None).unwrap();
    assert_eq!(first, second);

    let pooled = MviEngine::new(MviConfig {
        workers: 4,
        ..MviConfig::default()
    })
    .unwrap()
    .analyze_full(&signal, None)
    .unwrap();
    assert_eq!(first, pooled);
}

#[test]
fn cancellation_returns_no_report() {
    let flag = AtomicBool::new(true);
    let engine = MviEngine::new(MviConfig {
        workers: 4,
        ..MviConfig::default()
    })
    .unwrap();
    let err = engine
        .analyze_full(&white_noise(4, 8.0, 2), Some(&flag))
        .unwrap_err();
    assert_eq!(err, MviError::Cancelled { window: 0 });
}

#[test]
fn common_average_keeps_rank_one_structure() {
    let config = MviConfig {
        centering: Centering::CommonAverage,
        ..MviConfig::default()
    };
    let report = MviEngine::new(config)
        .unwrap()
        .analyze(&rank_one(8, 6.0))
        .unwrap();
    assert!(report.global.fe1 > 0.99);
    assert!(report.global.effective_rank < 1.05);
}

#[test]
fn global_dimension_flat_recording_is_reported() {
    let signal = Signal::new(Array2::zeros((4, 1000)), SFREQ).unwrap();
    let report = engine().analyze(&signal).unwrap();
    assert!(!report.global.dimension_reliable);
    assert_eq!(report.global.dimension, 1.0);
    assert_eq!(report.global.mvi, 0.0);
    assert!(report.windows.iter().all(|w| !w.record.dimension_reliable));
}

proptest! {
    #[test]
    fn prop_spectral_invariants(channels in 1usize..7, samples in 8usize..120, seed in any::<u64>()) {
        let data = lcg_noise(channels, samples, seed);
        let spectrum = CovarianceSpectrum::from_covariance(&covariance(normalize_channels(data.view()).view()));
        let c = channels as f64;
        let fe1 = spectrum.top_fraction();
        let rank = spectrum.effective_rank();
        prop_assert!(fe1 > 0.0 && fe1 <= 1.0);
        prop_assert!(fe1 >= 1.0 / c - 1e-12);
        prop_assert!((1.0..=c).contains(&rank));
        prop_assert!(spectrum.eigenvalues().windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn prop_window_count_formula(total in 1usize..5000, window in 1usize..600, step in 1usize..300) {
        match window_count(total, window, step) {
            Some(count) => {
                prop_assert!(count >= 1);
                let last_end = (count - 1) * step + window;
                prop_assert!(last_end <= total);
                prop_assert!(last_end + step > total);
            }
            None => prop_assert!(total < window),
        }
    }

    #[test]
    fn prop_mvi_in_unit_interval(
        fe1 in 0.01f64..=1.0,
        rank in 1.0f64..64.0,
        dim in 1.0f64..10.0,
        phi in 0.0f64..=1.0,
    ) {
        let mvi = composite_mvi(fe1, rank, dim, phi);
        prop_assert!((0.0..=1.0).contains(&mvi));
    }
}
