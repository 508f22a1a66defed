//! Multi-head sequence model producing three correlated risk scores.
//!
//! A recurrent encoder consumes the feature sequence, a self-attention layer
//! refines the per-step representations, and three independent linear+sigmoid
//! heads read the final step. Outputs are monotonic risk indicators in [0, 1],
//! threshold-comparable only against the fusion cutoffs.

/// Self-attention refinement layer.
pub mod attention;
/// Linear+sigmoid prediction heads.
pub mod heads;
/// Gated recurrent sequence encoder.
pub mod recurrent;

use ndarray::{Array1, Array2};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use attention::SelfAttention;
use heads::RiskHeads;
use recurrent::GruEncoder;

/// Raised when the input width disagrees with the model's expected
/// dimensionality. Never silently truncates or pads; an empty sequence is
/// reported as width 0.
#[derive(Debug, Clone, Error)]
#[error("model expects {expected} input features, got {actual}")]
pub struct ShapeMismatchError {
    /// Width the model was built with.
    pub expected: usize,
    /// Width of the rejected input.
    pub actual: usize,
}

/// The three bounded risk indicators produced per evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskScores {
    /// General pollution level indicator.
    pub pollution_risk: f32,
    /// Explosive-condition indicator.
    pub explosion_risk: f32,
    /// Gas-leak indicator.
    pub gas_leak_risk: f32,
}

/// Recurrent encoder + attention refinement + three sigmoid heads.
///
/// Stateless across calls: identical inputs always produce identical scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskModel {
    input_dim: usize,
    hidden_dim: usize,
    encoder: GruEncoder,
    attention: SelfAttention,
    heads: RiskHeads,
}

impl RiskModel {
    /// Creates a model with seeded uniform random weights.
    #[must_use]
    pub fn new(input_dim: usize, hidden_dim: usize, seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        Self {
            input_dim,
            hidden_dim,
            encoder: GruEncoder::new(input_dim, hidden_dim, &mut rng),
            attention: SelfAttention::new(hidden_dim, &mut rng),
            heads: RiskHeads::new(hidden_dim, &mut rng),
        }
    }

    /// Expected input feature count.
    #[must_use]
    pub const fn input_dim(&self) -> usize {
        self.input_dim
    }

    /// Hidden width shared by the encoder, attention, and heads.
    #[must_use]
    pub const fn hidden_dim(&self) -> usize {
        self.hidden_dim
    }

    /// Scores a feature sequence (rows are steps, oldest first).
    pub fn forward(&self, sequence: &Array2<f32>) -> Result<RiskScores, ShapeMismatchError> {
        let refined = self.encode_steps(sequence)?;
        Ok(self.heads.predict(refined.row(refined.nrows() - 1)))
    }

    /// Scores a single reading as a sequence of length 1.
    pub fn score_single(&self, features: &[f32]) -> Result<RiskScores, ShapeMismatchError> {
        self.forward(&single_step(features))
    }

    /// Final-step refined representation, as read by the heads.
    ///
    /// The trainer uses this to fit heads over the frozen encoder.
    pub fn representation(&self, features: &[f32]) -> Result<Array1<f32>, ShapeMismatchError> {
        let refined = self.encode_steps(&single_step(features))?;
        Ok(refined.row(refined.nrows() - 1).to_owned())
    }

    /// Shared access to the prediction heads.
    #[must_use]
    pub const fn heads(&self) -> &RiskHeads {
        &self.heads
    }

    /// Mutable access to the prediction heads (training only).
    pub fn heads_mut(&mut self) -> &mut RiskHeads {
        &mut self.heads
    }

    fn encode_steps(&self, sequence: &Array2<f32>) -> Result<Array2<f32>, ShapeMismatchError> {
        if sequence.nrows() == 0 || sequence.ncols() != self.input_dim {
            return Err(ShapeMismatchError {
                expected: self.input_dim,
                actual: if sequence.nrows() == 0 {
                    0
                } else {
                    sequence.ncols()
                },
            });
        }
        let hidden = self.encoder.run(sequence);
        Ok(self.attention.refine(&hidden))
    }
}

fn single_step(features: &[f32]) -> Array2<f32> {
    Array2::from_shape_vec((1, features.len()), features.to_vec())
        .unwrap_or_else(|_| Array2::zeros((1, features.len())))
}

/// Logistic activation shared by the gates and heads.
pub(crate) fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Uniform random matrix in [-0.1, 0.1).
pub(crate) fn uniform_matrix(rng: &mut SmallRng, rows: usize, cols: usize) -> Array2<f32> {
    Array2::from_shape_fn((rows, cols), |_| rng.gen_range(-0.1..0.1))
}

/// Uniform random vector in [-0.1, 0.1).
pub(crate) fn uniform_vector(rng: &mut SmallRng, len: usize) -> Array1<f32> {
    Array1::from_shape_fn(len, |_| rng.gen_range(-0.1..0.1))
}
