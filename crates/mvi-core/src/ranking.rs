//! Band relevance ranking over a window series.
//!
//! A band is relevant when it carries a large share of variance, tracks the
//! MVI over time, and stays spatially concentrated:
//!
//! ```text
//! relevance_b ∝ mean(φ_b) × max(0, corr(φ_b, MVI)) × 1 / (1 + mean rank_b)
//! ```

use serde::Serialize;
use statrs::statistics::Statistics;

use crate::config::FrequencyBand;
use crate::record::{Diagnostic, WindowRecord};

/// Added to the relevance sum before normalizing.
pub const RELEVANCE_EPS: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandRelevanceScore {
    pub name: String,
    pub mean_phi: f64,
    /// Pearson correlation of φ_b with MVI, floored at 0.
    pub correlation: f64,
    /// 1 / (1 + mean band effective rank).
    pub rank_score: f64,
    /// Normalized relevance; the scores of one ranking sum to 1.
    pub relevance: f64,
}

/// Which product the normalized relevance was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelevanceBasis {
    /// mean φ × correlation × rank score.
    Correlated,
    /// No band correlated with MVI; mean φ × rank score.
    Uncorrelated,
    /// No band carried variance; every band weighs the same.
    Uniform,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandRanking {
    /// One score per band, in configured order.
    pub scores: Vec<BandRelevanceScore>,
    /// Highest relevance, first band on ties.
    pub most_relevant: Option<String>,
    pub basis: RelevanceBasis,
    pub diagnostics: Vec<Diagnostic>,
}

impl BandRanking {
    /// Scores sorted by relevance, highest first. Ties keep configured order.
    pub fn ordered(&self) -> Vec<&BandRelevanceScore> {
        let mut ordered: Vec<&BandRelevanceScore> = self.scores.iter().collect();
        ordered.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ordered
    }
}

/// Rank `bands` over an ordered window series.
pub fn rank_bands(bands: &[FrequencyBand], windows: &[WindowRecord]) -> BandRanking {
    let mvi: Vec<f64> = windows.iter().map(|w| w.record.mvi).collect();
    let mut diagnostics = Vec::new();

    let mut scores: Vec<BandRelevanceScore> = bands
        .iter()
        .enumerate()
        .map(|(b, band)| {
            let phi: Vec<f64> = windows
                .iter()
                .map(|w| w.record.bands.get(b).map_or(f64::NAN, |f| f.fraction))
                .collect();
            let ranks: Vec<f64> = windows
                .iter()
                .filter_map(|w| w.record.bands.get(b).map(|f| f.effective_rank))
                .collect();

            let correlation = match pearson_correlation(&phi, &mvi) {
                Ok(r) => r.max(0.0),
                Err(reason) => {
                    log::debug!("band {}: correlation undefined ({reason})", band.name);
                    diagnostics.push(Diagnostic::degenerate_correlation(&band.name, reason));
                    0.0
                }
            };

            BandRelevanceScore {
                name: band.name.clone(),
                mean_phi: finite_mean(&phi),
                correlation,
                rank_score: 1.0 / (1.0 + finite_mean(&ranks)),
                relevance: 0.0,
            }
        })
        .collect();

    let basis = normalize(&mut scores);
    let most_relevant = argmax_first(&scores).map(|i| scores[i].name.clone());

    BandRanking {
        scores,
        most_relevant,
        basis,
        diagnostics,
    }
}

/// Fill in normalized relevance, falling back when the correlated product
/// vanishes for every band.
fn normalize(scores: &mut [BandRelevanceScore]) -> RelevanceBasis {
    if scores.is_empty() {
        return RelevanceBasis::Uniform;
    }
    let correlated: Vec<f64> = scores
        .iter()
        .map(|s| s.mean_phi * s.correlation * s.rank_score)
        .collect();
    let uncorrelated: Vec<f64> = scores.iter().map(|s| s.mean_phi * s.rank_score).collect();

    let (raw, basis) = if correlated.iter().sum::<f64>() > RELEVANCE_EPS {
        (correlated, RelevanceBasis::Correlated)
    } else if uncorrelated.iter().sum::<f64>() > RELEVANCE_EPS {
        (uncorrelated, RelevanceBasis::Uncorrelated)
    } else {
        let uniform = 1.0 / scores.len() as f64;
        for s in scores.iter_mut() {
            s.relevance = uniform;
        }
        return RelevanceBasis::Uniform;
    };

    let total: f64 = raw.iter().sum::<f64>() + RELEVANCE_EPS;
    for (s, r) in scores.iter_mut().zip(raw) {
        s.relevance = r / total;
    }
    basis
}

fn argmax_first(scores: &[BandRelevanceScore]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, s) in scores.iter().enumerate() {
        match best {
            Some(j) if s.relevance <= scores[j].relevance => {}
            _ => best = Some(i),
        }
    }
    best
}

fn finite_mean(values: &[f64]) -> f64 {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        0.0
    } else {
        finite.mean()
    }
}

/// Pearson correlation over the pairs where both values are finite.
///
/// Returns why the coefficient is undefined instead of a number when fewer
/// than two pairs remain or either side has no variance.
pub fn pearson_correlation(a: &[f64], b: &[f64]) -> Result<f64, String> {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b)
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|(&x, &y)| (x, y))
        .collect();
    if pairs.len() < 2 {
        return Err(format!("{} usable window pairs", pairs.len()));
    }

    let n = pairs.len() as f64;
    let mean_a = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_b = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for &(x, y) in &pairs {
        let da = x - mean_a;
        let db = y - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }

    let denom = (var_a * var_b).sqrt();
    if !denom.is_finite() || denom < 1e-10 {
        return Err("zero variance".to_string());
    }
    let r = cov / denom;
    if r.is_finite() {
        Ok(r.clamp(-1.0, 1.0))
    } else {
        Err("correlation is not finite".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterStrategy;
    use crate::record::{DiagnosticKind, ValidityRecord};
    use crate::spectral::BandFeatures;

    fn bands() -> Vec<FrequencyBand> {
        vec![
            FrequencyBand::new("low", 1.0, 8.0),
            FrequencyBand::new("high", 8.0, 30.0),
        ]
    }

    fn window(index: usize, mvi: f64, phi: [f64; 2], ranks: [f64; 2]) -> WindowRecord {
        let features = ["low", "high"]
            .iter()
            .zip(phi.iter().zip(ranks))
            .map(|(name, (&fraction, effective_rank))| BandFeatures {
                name: name.to_string(),
                fraction,
                effective_rank,
                filter: FilterStrategy::Butterworth { order: 4 },
            })
            .collect();
        WindowRecord {
            index,
            start_sample: index * 10,
            start_secs: index as f64 * 0.1,
            gfp_variance: 1.0,
            record: ValidityRecord {
                fe1: 0.5,
                effective_rank: 2.0,
                dimension: 1.0,
                dimension_reliable: true,
                bands: features,
                phi_max: phi[0].max(phi[1]),
                mvi,
                diagnostics: Vec::new(),
            },
        }
    }

    #[test]
    fn pearson_basics() {
        let a = [1.0, 2.0, 3.0, 4.0];
        assert!((pearson_correlation(&a, &[2.0, 4.0, 6.0, 8.0]).unwrap() - 1.0).abs() < 1e-12);
        assert!((pearson_correlation(&a, &[4.0, 3.0, 2.0, 1.0]).unwrap() + 1.0).abs() < 1e-12);
        assert!(pearson_correlation(&a, &[1.0, 1.0, 1.0, 1.0]).is_err());
        assert!(pearson_correlation(&[1.0], &[2.0]).is_err());
    }

    #[test]
    fn pearson_skips_non_finite_pairs() {
        let a = [1.0, f64::NAN, 2.0, 3.0];
        let b = [2.0, 100.0, 4.0, f64::INFINITY];
        assert!((pearson_correlation(&a, &b).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn tracking_band_wins() {
        let windows: Vec<_> = (0..6)
            .map(|i| {
                let t = i as f64;
                let mvi = 0.1 + 0.05 * t;
                window(i, mvi, [0.2 + 0.1 * t, 0.3 - 0.02 * t], [1.5, 1.5])
            })
            .collect();
        let ranking = rank_bands(&bands(), &windows);

        assert_eq!(ranking.basis, RelevanceBasis::Correlated);
        assert_eq!(ranking.most_relevant.as_deref(), Some("low"));
        assert_eq!(ranking.scores[1].correlation, 0.0);
        assert_eq!(ranking.scores[1].relevance, 0.0);
        let total: f64 = ranking.scores.iter().map(|s| s.relevance).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(ranking.diagnostics.is_empty());
        assert_eq!(ranking.ordered()[0].name, "low");
    }

    #[test]
    fn rank_score_uses_mean_band_rank() {
        let windows: Vec<_> = (0..3)
            .map(|i| window(i, i as f64, [0.5, 0.5], [1.0, 3.0]))
            .collect();
        let ranking = rank_bands(&bands(), &windows);
        assert!((ranking.scores[0].rank_score - 0.5).abs() < 1e-12);
        assert!((ranking.scores[1].rank_score - 0.25).abs() < 1e-12);
    }

    #[test]
    fn constant_phi_falls_back_to_uncorrelated_basis() {
        let windows: Vec<_> = (0..4)
            .map(|i| window(i, 0.1 * i as f64, [0.6, 0.2], [1.0, 1.0]))
            .collect();
        let ranking = rank_bands(&bands(), &windows);

        assert_eq!(ranking.basis, RelevanceBasis::Uncorrelated);
        assert_eq!(ranking.diagnostics.len(), 2);
        assert!(
            ranking
                .diagnostics
                .iter()
                .all(|d| d.kind == DiagnosticKind::DegenerateCorrelation)
        );
        assert!((ranking.scores[0].relevance - 0.75).abs() < 1e-9);
        assert!((ranking.scores[1].relevance - 0.25).abs() < 1e-9);
        assert_eq!(ranking.most_relevant.as_deref(), Some("low"));
    }

    #[test]
    fn no_band_power_is_uniform_and_ties_pick_first() {
        let windows: Vec<_> = (0..3)
            .map(|i| window(i, 0.0, [0.0, 0.0], [2.0, 2.0]))
            .collect();
        let ranking = rank_bands(&bands(), &windows);
        assert_eq!(ranking.basis, RelevanceBasis::Uniform);
        assert!(ranking.scores.iter().all(|s| s.relevance == 0.5));
        assert_eq!(ranking.most_relevant.as_deref(), Some("low"));
    }

    #[test]
    fn single_window_is_degenerate() {
        let ranking = rank_bands(&bands(), &[window(0, 0.3, [0.4, 0.1], [1.0, 1.0])]);
        assert_eq!(ranking.diagnostics.len(), 2);
        assert!(ranking.scores.iter().all(|s| s.correlation == 0.0));
        assert!(ranking.scores.iter().all(|s| s.relevance >= 0.0));
    }
}
