//! Per-column standardization

use ndarray::{Array1, Array2, Axis};

use crate::error::{Result, RugDetectorError};

/// Zero-mean, unit-variance transform fit on the training split
///
/// Columns with zero variance get a scale of 1 so they pass through centred
/// but unscaled.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl StandardScaler {
    pub fn fit(x: &Array2<f64>) -> Result<Self> {
        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| RugDetectorError::training("cannot fit a scaler on zero rows"))?;
        let scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s < 10.0 * f64::EPSILON { 1.0 } else { s });

        Ok(Self { mean, scale })
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.mean.len() {
            return Err(RugDetectorError::FeatureCount {
                expected: self.mean.len(),
                actual: x.ncols(),
            });
        }
        Ok((x - &self.mean) / &self.scale)
    }

    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    pub fn scale(&self) -> &Array1<f64> {
        &self.scale
    }
}
