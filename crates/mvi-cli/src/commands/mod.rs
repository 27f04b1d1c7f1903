pub mod analyze;
pub mod config;
pub mod synth;

use std::path::Path;

use mvi_core::{Centering, FrequencyBand, MviConfig, Signal};
use serde::{Deserialize, Serialize};

/// On-disk recording: one row per channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalFile {
    pub sfreq: f64,
    pub data: Vec<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_names: Option<Vec<String>>,
}

impl SignalFile {
    pub fn read(path: &Path) -> Result<Self, String> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        serde_json::from_str(&raw).map_err(|e| format!("failed to parse {}: {e}", path.display()))
    }

    pub fn into_signal(self) -> Result<(Signal, Vec<String>), String> {
        let channels = self.data.len();
        let names = match self.channel_names {
            Some(names) if names.len() == channels => names,
            Some(names) => {
                return Err(format!(
                    "{} channel names for {channels} channels",
                    names.len()
                ));
            }
            None => (0..channels).map(|i| format!("ch{i}")).collect(),
        };
        let signal = Signal::from_rows(self.data, self.sfreq).map_err(|e| e.to_string())?;
        Ok((signal, names))
    }
}

/// Command-line adjustments applied over the base configuration.
#[derive(Default)]
pub struct ConfigOverrides<'a> {
    pub config_path: Option<&'a str>,
    pub window_secs: Option<f64>,
    pub step_secs: Option<f64>,
    pub num_scales: Option<usize>,
    pub threshold: Option<f64>,
    pub centering: Option<&'a str>,
    pub workers: Option<usize>,
    pub bands: &'a [String],
}

impl ConfigOverrides<'_> {
    pub fn build(&self) -> Result<MviConfig, String> {
        let mut config = match self.config_path {
            Some(path) => MviConfig::from_json_path(Path::new(path))
                .map_err(|e| format!("failed to load config {path}: {e}"))?,
            None => MviConfig::default(),
        };

        if let Some(v) = self.window_secs {
            config.window_secs = v;
        }
        if let Some(v) = self.step_secs {
            config.step_secs = v;
        }
        if let Some(v) = self.num_scales {
            config.num_scales = v;
        }
        if let Some(v) = self.threshold {
            config.threshold = v;
        }
        if let Some(v) = self.centering {
            config.centering = v.parse::<Centering>().map_err(|e| e.to_string())?;
        }
        if let Some(v) = self.workers {
            config.workers = v;
        }
        if !self.bands.is_empty() {
            config.bands = self
                .bands
                .iter()
                .map(|b| FrequencyBand::parse(b))
                .collect::<Result<_, _>>()
                .map_err(|e| e.to_string())?;
        }

        config.validate().map_err(|e| e.to_string())?;
        Ok(config)
    }
}

/// Pretty-print `value` as JSON to `path`.
pub fn write_json<T: Serialize>(path: &str, value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    std::fs::write(path, json).map_err(|e| format!("failed to write {path}: {e}"))
}

/// Print an error and exit with status 1.
pub fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {message}");
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signal.json");
        std::fs::write(
            &path,
            r#"{"sfreq": 100.0, "data": [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]}"#,
        )
        .unwrap();

        let (signal, names) = SignalFile::read(&path).unwrap().into_signal().unwrap();
        assert_eq!(signal.channels(), 2);
        assert_eq!(signal.samples(), 3);
        assert_eq!(names, vec!["ch0", "ch1"]);
    }

    #[test]
    fn ragged_or_mislabelled_signal_is_rejected() {
        let ragged = SignalFile {
            sfreq: 100.0,
            data: vec![vec![1.0, 2.0], vec![1.0]],
            channel_names: None,
        };
        assert!(ragged.into_signal().is_err());

        let mislabelled = SignalFile {
            sfreq: 100.0,
            data: vec![vec![1.0, 2.0]],
            channel_names: Some(vec!["a".into(), "b".into()]),
        };
        assert!(mislabelled.into_signal().is_err());
    }

    #[test]
    fn overrides_apply_over_defaults() {
        let bands = vec!["alpha:8:12".to_string(), "beta:13:30".to_string()];
        let config = ConfigOverrides {
            window_secs: Some(1.0),
            centering: Some("common_average"),
            workers: Some(2),
            bands: &bands,
            ..Default::default()
        }
        .build()
        .unwrap();
        assert_eq!(config.window_secs, 1.0);
        assert_eq!(config.step_secs, 0.5);
        assert_eq!(config.centering, Centering::CommonAverage);
        assert_eq!(config.workers, 2);
        assert_eq!(config.bands.len(), 2);
    }

    #[test]
    fn invalid_overrides_are_rejected() {
        let bad_band = vec!["alpha:12:8".to_string()];
        assert!(
            ConfigOverrides {
                bands: &bad_band,
                ..Default::default()
            }
            .build()
            .is_err()
        );
        assert!(
            ConfigOverrides {
                num_scales: Some(1),
                ..Default::default()
            }
            .build()
            .is_err()
        );
    }

    #[test]
    fn config_file_is_the_base() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"threshold": 0.3, "num_scales": 6}"#).unwrap();
        let path = path.to_string_lossy().into_owned();

        let config = ConfigOverrides {
            config_path: Some(&path),
            num_scales: Some(10),
            ..Default::default()
        }
        .build()
        .unwrap();
        assert_eq!(config.threshold, 0.3);
        assert_eq!(config.num_scales, 10);
    }
}
