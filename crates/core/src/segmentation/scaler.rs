use serde::{Deserialize, Serialize};

use crate::errors::{InferenceError, TrainingError};

/// Per-feature zero-mean / unit-variance standardization, fit on the
/// training set only and reused verbatim at serving time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub means: Vec<f64>,
    pub scales: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self, TrainingError> {
        let Some(first) = rows.first() else {
            return Err(TrainingError::EmptyDataset);
        };
        let dims = first.len();
        let count = rows.len() as f64;

        let mut means = vec![0.0; dims];
        for row in rows {
            if row.len() != dims {
                return Err(InferenceError::DimensionMismatch {
                    expected: dims,
                    actual: row.len(),
                }
                .into());
            }
            for (mean, value) in means.iter_mut().zip(row) {
                *mean += value / count;
            }
        }

        let mut scales = vec![0.0; dims];
        for row in rows {
            for (index, value) in row.iter().enumerate() {
                let delta = value - means[index];
                scales[index] += delta * delta / count;
            }
        }
        for scale in &mut scales {
            *scale = scale.sqrt();
            // Constant features divide by one instead of zero.
            if *scale == 0.0 {
                *scale = 1.0;
            }
        }

        Ok(Self { means, scales })
    }

    pub fn transform(&self, row: &[f64]) -> Result<Vec<f64>, InferenceError> {
        if row.len() != self.means.len() {
            return Err(InferenceError::DimensionMismatch {
                expected: self.means.len(),
                actual: row.len(),
            });
        }
        Ok(row
            .iter()
            .enumerate()
            .map(|(index, value)| (value - self.means[index]) / self.scales[index])
            .collect())
    }
}
