use ndarray::{Array2, ArrayViewMut1, Axis};
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

use super::uniform_matrix;

/// Single-head scaled dot-product self-attention over step representations.
///
/// Lets the model weigh interactions between recent steps (a temperature rise
/// coinciding with a pressure rise, for example) better than independent
/// per-step readouts would.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfAttention {
    w_query: Array2<f32>,
    w_key: Array2<f32>,
    w_value: Array2<f32>,
}

impl SelfAttention {
    /// Creates a layer with uniform random projections from the generator.
    #[must_use]
    pub fn new(hidden_dim: usize, rng: &mut SmallRng) -> Self {
        Self {
            w_query: uniform_matrix(rng, hidden_dim, hidden_dim),
            w_key: uniform_matrix(rng, hidden_dim, hidden_dim),
            w_value: uniform_matrix(rng, hidden_dim, hidden_dim),
        }
    }

    /// Refines per-step representations; the output keeps the input shape.
    #[must_use]
    pub fn refine(&self, hidden: &Array2<f32>) -> Array2<f32> {
        let queries = hidden.dot(&self.w_query);
        let keys = hidden.dot(&self.w_key);
        let values = hidden.dot(&self.w_value);
        let scale = (self.w_query.ncols() as f32).sqrt().max(1e-6);
        let mut weights = queries.dot(&keys.t()) / scale;
        for row in weights.axis_iter_mut(Axis(0)) {
            softmax_in_place(row);
        }
        weights.dot(&values)
    }
}

fn softmax_in_place(mut row: ArrayViewMut1<'_, f32>) {
    let max = row.fold(f32::NEG_INFINITY, |acc, value| acc.max(*value));
    row.mapv_inplace(|value| (value - max).exp());
    let sum = row.sum();
    if sum > 0.0 {
        row.mapv_inplace(|value| value / sum);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;
    use rand::SeedableRng;

    #[test]
    fn output_keeps_input_shape() {
        let mut rng = SmallRng::seed_from_u64(9);
        let attention = SelfAttention::new(4, &mut rng);
        let hidden = Array2::from_shape_fn((3, 4), |(row, col)| (row + col) as f32 * 0.1);
        let refined = attention.refine(&hidden);
        assert_eq!(refined.dim(), (3, 4));
    }

    #[test]
    fn single_step_attends_only_to_itself() {
        let mut rng = SmallRng::seed_from_u64(9);
        let attention = SelfAttention::new(3, &mut rng);
        let hidden = Array2::from_shape_vec((1, 3), vec![0.2, -0.4, 0.6]).unwrap();
        let refined = attention.refine(&hidden);
        // With one step the softmax weight is exactly 1, so the output equals
        // the projected value row.
        let projected = hidden.dot(&attention.w_value);
        let diff: Array1<f32> = &refined.row(0).to_owned() - &projected.row(0).to_owned();
        assert!(diff.iter().all(|value| value.abs() < 1e-6));
    }
}
