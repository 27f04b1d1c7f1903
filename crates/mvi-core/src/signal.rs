//! Validated multichannel recordings and whole-signal helpers.

use ndarray::{Array2, ArrayView2, Axis};

use crate::config::Centering;
use crate::error::{MviError, Result};

/// A channels × samples recording with its sampling rate.
///
/// Immutable after construction; every analysis works on copies derived
/// from it.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    data: Array2<f64>,
    sfreq: f64,
}

impl Signal {
    /// Wrap a channels × samples matrix.
    pub fn new(data: Array2<f64>, sfreq: f64) -> Result<Self> {
        if !sfreq.is_finite() || sfreq <= 0.0 {
            return Err(MviError::InvalidSignal(format!(
                "sampling rate must be positive, got {sfreq}"
            )));
        }
        let (channels, samples) = data.dim();
        if channels == 0 || samples == 0 {
            return Err(MviError::InvalidSignal(format!(
                "empty signal: {channels} channels x {samples} samples"
            )));
        }
        if let Some(((ch, t), v)) = data.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(MviError::InvalidSignal(format!(
                "non-finite value {v} at channel {ch}, sample {t}"
            )));
        }
        Ok(Self { data, sfreq })
    }

    /// Build from one row per channel. Ragged rows are not a 2-D signal.
    pub fn from_rows(rows: Vec<Vec<f64>>, sfreq: f64) -> Result<Self> {
        let channels = rows.len();
        let samples = rows.first().map(|r| r.len()).unwrap_or(0);
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != samples) {
            return Err(MviError::InvalidSignal(format!(
                "channel {i} has {} samples, channel 0 has {samples}",
                row.len()
            )));
        }
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        let data = Array2::from_shape_vec((channels, samples), flat)
            .map_err(|e| MviError::InvalidSignal(e.to_string()))?;
        Self::new(data, sfreq)
    }

    pub fn data(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    pub fn sfreq(&self) -> f64 {
        self.sfreq
    }

    pub fn channels(&self) -> usize {
        self.data.nrows()
    }

    pub fn samples(&self) -> usize {
        self.data.ncols()
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples() as f64 / self.sfreq
    }

    /// A centered copy of the data.
    pub fn centered(&self, mode: Centering) -> Array2<f64> {
        center(self.data.view(), mode)
    }
}

/// Subtract per-channel means (over time) or per-sample means (over channels).
pub fn center(data: ArrayView2<'_, f64>, mode: Centering) -> Array2<f64> {
    let mut out = data.to_owned();
    match mode {
        Centering::Channel => {
            for mut row in out.rows_mut() {
                let mean = row.mean().unwrap_or(0.0);
                row.mapv_inplace(|v| v - mean);
            }
        }
        Centering::CommonAverage => {
            for mut col in out.columns_mut() {
                let mean = col.mean().unwrap_or(0.0);
                col.mapv_inplace(|v| v - mean);
            }
        }
    }
    out
}

/// Global field power: spatial standard deviation across channels at every sample.
pub fn global_field_power(data: ArrayView2<'_, f64>) -> Vec<f64> {
    if data.nrows() == 0 {
        return vec![0.0; data.ncols()];
    }
    data.std_axis(Axis(0), 0.0).to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn rejects_malformed() {
        assert!(matches!(
            Signal::new(Array2::zeros((2, 10)), 0.0),
            Err(MviError::InvalidSignal(_))
        ));
        assert!(Signal::new(Array2::zeros((2, 10)), f64::NAN).is_err());
        assert!(Signal::new(Array2::zeros((0, 10)), 100.0).is_err());
        assert!(Signal::new(Array2::zeros((2, 0)), 100.0).is_err());
        assert!(Signal::new(array![[1.0, f64::INFINITY]], 100.0).is_err());
        assert!(Signal::from_rows(vec![vec![1.0, 2.0], vec![1.0]], 100.0).is_err());
        assert!(Signal::from_rows(vec![], 100.0).is_err());
    }

    #[test]
    fn from_rows_shape() {
        let s = Signal::from_rows(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]], 3.0).unwrap();
        assert_eq!(s.channels(), 2);
        assert_eq!(s.samples(), 3);
        assert_eq!(s.data()[[1, 2]], 6.0);
        assert!((s.duration_secs() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn channel_centering_zeroes_row_means() {
        let c = center(array![[1.0, 2.0, 3.0], [10.0, 10.0, 40.0]].view(), Centering::Channel);
        for row in c.rows() {
            assert!(row.sum().abs() < 1e-12);
        }
        assert_eq!(c[[0, 0]], -1.0);
    }

    #[test]
    fn common_average_zeroes_column_means() {
        let c = center(
            array![[1.0, 2.0, 3.0], [3.0, 6.0, 3.0]].view(),
            Centering::CommonAverage,
        );
        for col in c.columns() {
            assert!(col.sum().abs() < 1e-12);
        }
        assert_eq!(c[[0, 1]], -2.0);
    }

    #[test]
    fn gfp_is_spatial_std() {
        let gfp = global_field_power(array![[1.0, 0.0], [-1.0, 0.0]].view());
        assert_eq!(gfp, vec![1.0, 0.0]);
    }
}
