use serde::{Deserialize, Serialize};

use super::FeatureAlignmentError;

/// Per-column standard scaler, fit on the training split only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f32>,
    stds: Vec<f32>,
}

impl StandardScaler {
    /// Identity scaler for the given width (means 0, deviations 1).
    #[must_use]
    pub fn identity(width: usize) -> Self {
        Self {
            means: vec![0.0; width],
            stds: vec![1.0; width],
        }
    }

    /// Fits column means and deviations over row-major samples.
    ///
    /// Deviations are clamped away from zero so constant columns stay finite.
    #[must_use]
    pub fn fit(samples: &[Vec<f32>]) -> Self {
        let Some(first) = samples.first() else {
            return Self::identity(0);
        };
        let width = first.len();
        let count = samples.len() as f32;

        let mut means = vec![0.0f32; width];
        for row in samples {
            for (idx, value) in row.iter().enumerate() {
                means[idx] += value;
            }
        }
        for mean in &mut means {
            *mean /= count;
        }

        let mut stds = vec![0.0f32; width];
        for row in samples {
            for (idx, value) in row.iter().enumerate() {
                stds[idx] += (value - means[idx]).powi(2);
            }
        }
        for std in &mut stds {
            *std = (*std / count).sqrt().max(1e-6);
        }

        Self { means, stds }
    }

    /// Scales one feature vector.
    pub fn transform(&self, features: &[f32]) -> Result<Vec<f32>, FeatureAlignmentError> {
        if features.len() != self.means.len() {
            return Err(FeatureAlignmentError::new(format!(
                "scaler fitted on {} columns, got {}",
                self.means.len(),
                features.len()
            )));
        }
        Ok(features
            .iter()
            .zip(self.means.iter().zip(&self.stds))
            .map(|(value, (mean, std))| (value - mean) / std)
            .collect())
    }

    /// Scales a batch of rows.
    pub fn transform_batch(
        &self,
        samples: &[Vec<f32>],
    ) -> Result<Vec<Vec<f32>>, FeatureAlignmentError> {
        samples.iter().map(|row| self.transform(row)).collect()
    }

    /// Fitted column count.
    #[must_use]
    pub fn width(&self) -> usize {
        self.means.len()
    }
}
