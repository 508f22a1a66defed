use anyhow::{ensure, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::model::{RiskModel, RiskScores};

/// Loss recorded after one epoch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EpochReport {
    /// Epoch index, 0-based.
    pub epoch: usize,
    /// Summed mean-squared error across the three heads.
    pub loss: f32,
}

/// Gradient-descent trainer for the prediction heads.
///
/// The recurrent encoder and attention weights stay frozen; every sample's
/// final-step representation is computed once and reused across epochs. The
/// loss is the summed mean-squared error of the three heads.
#[derive(Debug, Clone)]
pub struct HeadTrainer {
    learning_rate: f32,
    epochs: usize,
}

impl HeadTrainer {
    /// Creates a trainer with the given budget.
    #[must_use]
    pub const fn new(learning_rate: f32, epochs: usize) -> Self {
        Self {
            learning_rate,
            epochs,
        }
    }

    /// Fits the heads in place, returning per-epoch losses.
    pub fn fit(
        &self,
        model: &mut RiskModel,
        rows: &[Vec<f32>],
        targets: &[[f32; 3]],
    ) -> Result<Vec<EpochReport>> {
        ensure!(
            rows.len() == targets.len(),
            "row/target count mismatch: {} vs {}",
            rows.len(),
            targets.len()
        );
        ensure!(!rows.is_empty(), "cannot fit on an empty training split");

        let representations = representations(model, rows)?;
        let hidden_dim = model.hidden_dim();
        let count = rows.len() as f32;
        let mut reports = Vec::with_capacity(self.epochs);

        for epoch in 0..self.epochs {
            let mut grad_weights: [Array1<f32>; 3] =
                std::array::from_fn(|_| Array1::zeros(hidden_dim));
            let mut grad_biases = [0.0f32; 3];
            let mut loss = 0.0f32;

            for (representation, target) in representations.iter().zip(targets) {
                let scores = model.heads().predict(representation.view());
                let preds = [
                    scores.pollution_risk,
                    scores.explosion_risk,
                    scores.gas_leak_risk,
                ];
                for head in 0..3 {
                    let error = preds[head] - target[head];
                    loss += error * error;
                    let local = 2.0 * error * preds[head] * (1.0 - preds[head]);
                    grad_weights[head] = &grad_weights[head] + &(representation * local);
                    grad_biases[head] += local;
                }
            }

            for ((head, grad_w), grad_b) in model
                .heads_mut()
                .as_mut_array()
                .into_iter()
                .zip(grad_weights)
                .zip(grad_biases)
            {
                head.apply_gradient(&(&grad_w / count), grad_b / count, self.learning_rate);
            }
            reports.push(EpochReport {
                epoch,
                loss: loss / count,
            });
        }
        Ok(reports)
    }

    /// Summed mean-squared error of the heads over a held-out split.
    pub fn evaluate(
        &self,
        model: &RiskModel,
        rows: &[Vec<f32>],
        targets: &[[f32; 3]],
    ) -> Result<f32> {
        if rows.is_empty() {
            return Ok(0.0);
        }
        let representations = representations(model, rows)?;
        let mut loss = 0.0f32;
        for (representation, target) in representations.iter().zip(targets) {
            let scores = model.heads().predict(representation.view());
            loss += squared_error(&scores, target);
        }
        Ok(loss / rows.len() as f32)
    }
}

fn representations(model: &RiskModel, rows: &[Vec<f32>]) -> Result<Vec<Array1<f32>>> {
    rows.iter()
        .map(|row| Ok(model.representation(row)?))
        .collect()
}

fn squared_error(scores: &RiskScores, target: &[f32; 3]) -> f32 {
    (scores.pollution_risk - target[0]).powi(2)
        + (scores.explosion_risk - target[1]).powi(2)
        + (scores.gas_leak_risk - target[2]).powi(2)
}
