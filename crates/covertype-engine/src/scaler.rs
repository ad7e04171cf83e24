//! Per-feature standardization fitted alongside the forest.

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Centers each feature on its training mean and divides by its population
/// standard deviation. Constant features keep a scale of 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ScalerParts")]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

/// Unchecked on-disk form, validated through [`StandardScaler::from_parts`].
#[derive(Deserialize)]
struct ScalerParts {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl TryFrom<ScalerParts> for StandardScaler {
    type Error = EngineError;

    fn try_from(parts: ScalerParts) -> Result<Self, Self::Error> {
        Self::from_parts(parts.mean, parts.scale)
    }
}

impl StandardScaler {
    /// Fit means and scales on row-major data.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ScalerFit`] when `rows` is empty or ragged.
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self, EngineError> {
        let Some(first) = rows.first() else {
            return Err(EngineError::ScalerFit {
                reason: "no rows".to_string(),
            });
        };
        let width = first.len();
        if let Some(i) = rows.iter().position(|r| r.len() != width) {
            return Err(EngineError::ScalerFit {
                reason: format!("row {i} has {} values, expected {width}", rows[i].len()),
            });
        }

        let n = rows.len() as f64;
        let mut mean = vec![0.0; width];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut var = vec![0.0; width];
        for row in rows {
            for ((acc, v), m) in var.iter_mut().zip(row).zip(&mean) {
                *acc += (v - m).powi(2);
            }
        }
        let scale = var
            .into_iter()
            .map(|s| {
                let std = (s / n).sqrt();
                if std == 0.0 { 1.0 } else { std }
            })
            .collect();

        Ok(Self { mean, scale })
    }

    /// Build from stored parameters; the two vectors must be the same length.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ScalerFit`] on a length mismatch.
    pub fn from_parts(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self, EngineError> {
        if mean.len() != scale.len() {
            return Err(EngineError::ScalerFit {
                reason: format!("{} means but {} scales", mean.len(), scale.len()),
            });
        }
        Ok(Self { mean, scale })
    }

    /// Number of features the scaler was fitted on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Standardize one row. `row` must already be `n_features` long.
    #[must_use]
    pub fn transform(&self, row: &[f64]) -> Vec<f64> {
        debug_assert_eq!(row.len(), self.mean.len());
        row.iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }

    /// Standardize every row.
    #[must_use]
    pub fn transform_all(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter().map(|row| self.transform(row)).collect()
    }
}
