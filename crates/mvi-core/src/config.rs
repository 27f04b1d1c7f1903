//! Analysis configuration: windowing, bands, dimension proxy, decision threshold.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::error::{MviError, Result};

/// Decision boundary for the global MVI. `MVI > 0.5` is valid, `<= 0.5` is not.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// A named frequency band, `[low_hz, high_hz]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyBand {
    pub name: String,
    pub low_hz: f64,
    pub high_hz: f64,
}

impl FrequencyBand {
    pub fn new(name: impl Into<String>, low_hz: f64, high_hz: f64) -> Self {
        Self {
            name: name.into(),
            low_hz,
            high_hz,
        }
    }

    /// Parse `name:low:high`, e.g. `alpha:8:12`.
    pub fn parse(spec: &str) -> Result<Self> {
        let parts: Vec<&str> = spec.split(':').map(|s| s.trim()).collect();
        if parts.len() != 3 {
            return Err(MviError::InvalidConfig(format!(
                "band '{spec}' must look like name:low:high"
            )));
        }
        let parse_hz = |s: &str| {
            s.parse::<f64>().map_err(|_| {
                MviError::InvalidConfig(format!("band '{spec}': '{s}' is not a frequency"))
            })
        };
        let band = Self::new(parts[0], parse_hz(parts[1])?, parse_hz(parts[2])?);
        band.validate()?;
        Ok(band)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(MviError::InvalidConfig("band name is empty".into()));
        }
        if !self.low_hz.is_finite() || !self.high_hz.is_finite() {
            return Err(MviError::InvalidConfig(format!(
                "band '{}' has non-finite edges",
                self.name
            )));
        }
        if self.low_hz < 0.0 || self.low_hz >= self.high_hz {
            return Err(MviError::InvalidConfig(format!(
                "band '{}' needs 0 <= low < high, got [{}, {}]",
                self.name, self.low_hz, self.high_hz
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for FrequencyBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}-{} Hz)", self.name, self.low_hz, self.high_hz)
    }
}

/// The canonical band set: theta, alpha, beta, gamma.
pub fn default_bands() -> Vec<FrequencyBand> {
    vec![
        FrequencyBand::new("theta", 4.0, 7.0),
        FrequencyBand::new("alpha", 8.0, 12.0),
        FrequencyBand::new("beta", 13.0, 30.0),
        FrequencyBand::new("gamma", 31.0, 45.0),
    ]
}

/// How the recording is centered before windowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Centering {
    /// Subtract each channel's mean over time.
    #[default]
    Channel,
    /// Subtract, at every sample, the mean across channels.
    CommonAverage,
}

impl std::fmt::Display for Centering {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Channel => write!(f, "channel"),
            Self::CommonAverage => write!(f, "common_average"),
        }
    }
}

impl std::str::FromStr for Centering {
    type Err = MviError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "channel" => Ok(Self::Channel),
            "common_average" | "average" => Ok(Self::CommonAverage),
            other => Err(MviError::InvalidConfig(format!(
                "unknown centering '{other}' (expected channel or common_average)"
            ))),
        }
    }
}

/// Band-pass filter design limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Butterworth order per band edge. Even; capped further on short windows.
    pub iir_order: usize,
    /// Upper bound on the fallback FIR length (made odd, capped on short windows).
    pub fir_max_taps: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            iir_order: 4,
            fir_max_taps: 129,
        }
    }
}

/// Full engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MviConfig {
    /// Analysis window length in seconds.
    pub window_secs: f64,
    /// Stride between window starts in seconds.
    pub step_secs: f64,
    /// Bands used for variance attribution and relevance ranking.
    pub bands: Vec<FrequencyBand>,
    /// Number of quantization scales for the dimension proxy.
    pub num_scales: usize,
    /// Global decision threshold (strictly greater is valid).
    pub threshold: f64,
    pub centering: Centering,
    /// Segment length for the global dimension estimate (median over segments).
    pub global_segment_secs: f64,
    pub filter: FilterConfig,
    /// Worker threads for the per-window stage. 1 runs inline.
    pub workers: usize,
}

impl Default for MviConfig {
    fn default() -> Self {
        Self {
            window_secs: 2.0,
            step_secs: 0.5,
            bands: default_bands(),
            num_scales: 8,
            threshold: DEFAULT_THRESHOLD,
            centering: Centering::Channel,
            global_segment_secs: 2.0,
            filter: FilterConfig::default(),
            workers: 1,
        }
    }
}

impl MviConfig {
    /// Load a JSON configuration. Missing fields take their defaults.
    pub fn from_json_path(path: &Path) -> std::io::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str::<Self>(&raw).map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("failed to parse config JSON: {e}"),
            )
        })
    }

    pub fn validate(&self) -> Result<()> {
        let positive = |name: &str, v: f64| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(MviError::InvalidConfig(format!(
                    "{name} must be a positive number, got {v}"
                )))
            }
        };
        positive("window_secs", self.window_secs)?;
        positive("step_secs", self.step_secs)?;
        positive("global_segment_secs", self.global_segment_secs)?;

        if self.num_scales < 2 {
            return Err(MviError::InvalidConfig(format!(
                "num_scales must be at least 2 for a slope fit, got {}",
                self.num_scales
            )));
        }
        if !self.threshold.is_finite() {
            return Err(MviError::InvalidConfig("threshold must be finite".into()));
        }
        if self.workers == 0 {
            return Err(MviError::InvalidConfig("workers must be at least 1".into()));
        }
        if self.filter.iir_order < 2 || self.filter.iir_order % 2 != 0 {
            return Err(MviError::InvalidConfig(format!(
                "filter.iir_order must be even and >= 2, got {}",
                self.filter.iir_order
            )));
        }
        if self.filter.fir_max_taps < 3 {
            return Err(MviError::InvalidConfig(format!(
                "filter.fir_max_taps must be >= 3, got {}",
                self.filter.fir_max_taps
            )));
        }

        let mut seen = HashSet::new();
        for band in &self.bands {
            band.validate()?;
            if !seen.insert(band.name.as_str()) {
                return Err(MviError::InvalidConfig(format!(
                    "duplicate band name '{}'",
                    band.name
                )));
            }
        }
        Ok(())
    }
}
