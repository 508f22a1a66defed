use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

use super::{sigmoid, uniform_matrix, uniform_vector};

/// Gated recurrent encoder producing one hidden row per input step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GruEncoder {
    w_update: Array2<f32>,
    u_update: Array2<f32>,
    b_update: Array1<f32>,
    w_reset: Array2<f32>,
    u_reset: Array2<f32>,
    b_reset: Array1<f32>,
    w_cand: Array2<f32>,
    u_cand: Array2<f32>,
    b_cand: Array1<f32>,
}

impl GruEncoder {
    /// Creates an encoder with uniform random weights from the given generator.
    #[must_use]
    pub fn new(input_dim: usize, hidden_dim: usize, rng: &mut SmallRng) -> Self {
        Self {
            w_update: uniform_matrix(rng, hidden_dim, input_dim),
            u_update: uniform_matrix(rng, hidden_dim, hidden_dim),
            b_update: uniform_vector(rng, hidden_dim),
            w_reset: uniform_matrix(rng, hidden_dim, input_dim),
            u_reset: uniform_matrix(rng, hidden_dim, hidden_dim),
            b_reset: uniform_vector(rng, hidden_dim),
            w_cand: uniform_matrix(rng, hidden_dim, input_dim),
            u_cand: uniform_matrix(rng, hidden_dim, hidden_dim),
            b_cand: uniform_vector(rng, hidden_dim),
        }
    }

    /// Hidden width.
    #[must_use]
    pub fn hidden_dim(&self) -> usize {
        self.b_update.len()
    }

    /// Consumes the sequence, returning the hidden representation per step.
    #[must_use]
    pub fn run(&self, sequence: &Array2<f32>) -> Array2<f32> {
        let hidden_dim = self.hidden_dim();
        let mut states = Array2::zeros((sequence.nrows(), hidden_dim));
        let mut state = Array1::<f32>::zeros(hidden_dim);
        for (step, input) in sequence.rows().into_iter().enumerate() {
            state = self.step(input, &state);
            states.row_mut(step).assign(&state);
        }
        states
    }

    fn step(&self, input: ArrayView1<'_, f32>, state: &Array1<f32>) -> Array1<f32> {
        let update = (self.w_update.dot(&input) + self.u_update.dot(state) + &self.b_update)
            .mapv(sigmoid);
        let reset =
            (self.w_reset.dot(&input) + self.u_reset.dot(state) + &self.b_reset).mapv(sigmoid);
        let gated = &reset * state;
        let candidate =
            (self.w_cand.dot(&input) + self.u_cand.dot(&gated) + &self.b_cand).mapv(f32::tanh);
        let retain = update.mapv(|z| 1.0 - z);
        &retain * state + &update * &candidate
    }
}
