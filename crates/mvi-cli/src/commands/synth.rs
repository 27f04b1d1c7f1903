use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::SignalFile;

/// Fixed topographies cycled through by the mixture signal.
const MIXTURE_STATES: usize = 4;
/// Mean dwell time of one mixture state.
const MIXTURE_DWELL_SECS: f64 = 0.25;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SynthKind {
    RankOne,
    Noise,
    Mixture,
}

impl SynthKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "rank1" => Some(Self::RankOne),
            "noise" => Some(Self::Noise),
            "mixture" => Some(Self::Mixture),
            _ => None,
        }
    }
}

pub struct SynthCommandConfig<'a> {
    pub kind: &'a str,
    pub channels: usize,
    pub seconds: f64,
    pub sfreq: f64,
    pub seed: u64,
    pub output_path: &'a str,
}

pub fn run(cfg: SynthCommandConfig<'_>) {
    let Some(kind) = SynthKind::parse(cfg.kind) else {
        super::fail(format!("unknown signal kind '{}'", cfg.kind));
    };
    let samples = (cfg.seconds * cfg.sfreq).round();
    if cfg.channels == 0 || !samples.is_finite() || samples < 1.0 {
        super::fail("need at least one channel and one sample");
    }

    let file = synthesize(kind, cfg.channels, samples as usize, cfg.sfreq, cfg.seed);
    match super::write_json(cfg.output_path, &file) {
        Ok(()) => println!(
            "Wrote {} ({} channels x {} samples @ {} Hz, seed {})",
            cfg.output_path, cfg.channels, samples, cfg.sfreq, cfg.seed
        ),
        Err(e) => super::fail(e),
    }
}

/// Deterministic synthetic recording for `seed`.
pub fn synthesize(
    kind: SynthKind,
    channels: usize,
    samples: usize,
    sfreq: f64,
    seed: u64,
) -> SignalFile {
    let mut rng = StdRng::seed_from_u64(seed);
    let data = match kind {
        SynthKind::RankOne => rank_one(&mut rng, channels, samples, sfreq),
        SynthKind::Noise => (0..channels)
            .map(|_| (0..samples).map(|_| gaussian(&mut rng)).collect())
            .collect(),
        SynthKind::Mixture => mixture(&mut rng, channels, samples, sfreq),
    };
    SignalFile {
        sfreq,
        data,
        channel_names: Some((1..=channels).map(|i| format!("E{i}")).collect()),
    }
}

/// Standard normal draw (Box-Muller).
fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.random::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// Channel weights bounded away from zero, random sign.
fn topography(rng: &mut StdRng, channels: usize) -> Vec<f64> {
    (0..channels)
        .map(|_| {
            let w = rng.random_range(0.5..1.5);
            if rng.random_bool(0.5) { w } else { -w }
        })
        .collect()
}

fn alpha_wave(t: usize, sfreq: f64, phase: f64) -> f64 {
    let secs = t as f64 / sfreq;
    (2.0 * PI * 10.0 * secs + phase).sin() + 0.5 * (2.0 * PI * 9.5 * secs).sin()
}

fn rank_one(rng: &mut StdRng, channels: usize, samples: usize, sfreq: f64) -> Vec<Vec<f64>> {
    let weights = topography(rng, channels);
    let phase = rng.random_range(0.0..2.0 * PI);
    let source: Vec<f64> = (0..samples).map(|t| alpha_wave(t, sfreq, phase)).collect();
    weights
        .iter()
        .map(|&w| {
            source
                .iter()
                .map(|&s| w * s + 0.01 * gaussian(rng))
                .collect()
        })
        .collect()
}

fn mixture(rng: &mut StdRng, channels: usize, samples: usize, sfreq: f64) -> Vec<Vec<f64>> {
    let states: Vec<Vec<f64>> = (0..MIXTURE_STATES)
        .map(|_| topography(rng, channels))
        .collect();
    let dwell = ((MIXTURE_DWELL_SECS * sfreq).round() as usize).max(1);

    // One active state per sample, switching after a jittered dwell.
    let mut active = Vec::with_capacity(samples);
    let mut state = 0;
    while active.len() < samples {
        let len = rng.random_range(dwell / 2 + 1..=dwell * 3 / 2 + 1);
        active.extend(std::iter::repeat_n(state, len.min(samples - active.len())));
        state = (state + rng.random_range(1..MIXTURE_STATES)) % MIXTURE_STATES;
    }

    let mut data = vec![vec![0.0; samples]; channels];
    for (t, &k) in active.iter().enumerate() {
        let s = alpha_wave(t, sfreq, 0.0);
        for (c, row) in data.iter_mut().enumerate() {
            row[t] = states[k][c] * s + 0.1 * gaussian(rng);
        }
    }
    data
}
