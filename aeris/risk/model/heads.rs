use ndarray::{Array1, ArrayView1};
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

use super::{sigmoid, uniform_vector, RiskScores};

/// One linear+sigmoid prediction head.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Head {
    weights: Array1<f32>,
    bias: f32,
}

impl Head {
    /// Creates a head with uniform random weights and a zero bias.
    #[must_use]
    pub fn new(hidden_dim: usize, rng: &mut SmallRng) -> Self {
        Self {
            weights: uniform_vector(rng, hidden_dim),
            bias: 0.0,
        }
    }

    /// Bounded score for one representation.
    #[must_use]
    pub fn predict(&self, representation: ArrayView1<'_, f32>) -> f32 {
        sigmoid(self.weights.dot(&representation) + self.bias)
    }

    /// Applies one gradient-descent step.
    pub fn apply_gradient(
        &mut self,
        grad_weights: &Array1<f32>,
        grad_bias: f32,
        learning_rate: f32,
    ) {
        self.weights = &self.weights - &(grad_weights * learning_rate);
        self.bias -= learning_rate * grad_bias;
    }
}

/// The three independent prediction heads, in verdict order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskHeads {
    pollution: Head,
    explosion: Head,
    gas_leak: Head,
}

impl RiskHeads {
    /// Creates the three heads from the given generator.
    #[must_use]
    pub fn new(hidden_dim: usize, rng: &mut SmallRng) -> Self {
        Self {
            pollution: Head::new(hidden_dim, rng),
            explosion: Head::new(hidden_dim, rng),
            gas_leak: Head::new(hidden_dim, rng),
        }
    }

    /// Reads all three heads from one representation.
    #[must_use]
    pub fn predict(&self, representation: ArrayView1<'_, f32>) -> RiskScores {
        RiskScores {
            pollution_risk: self.pollution.predict(representation),
            explosion_risk: self.explosion.predict(representation),
            gas_leak_risk: self.gas_leak.predict(representation),
        }
    }

    /// Mutable access to the heads in (pollution, explosion, gas leak) order.
    pub fn as_mut_array(&mut self) -> [&mut Head; 3] {
        [&mut self.pollution, &mut self.explosion, &mut self.gas_leak]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn gradient_step_moves_prediction_toward_target() {
        let mut rng = SmallRng::seed_from_u64(2);
        let mut head = Head::new(3, &mut rng);
        let representation = Array1::from_vec(vec![0.5, -0.2, 0.8]);
        let before = head.predict(representation.view());
        // Push the head toward zero: gradient of squared error at target 0.
        for _ in 0..50 {
            let pred = head.predict(representation.view());
            let local = 2.0 * pred * pred * (1.0 - pred);
            head.apply_gradient(&(&representation * local), local, 0.5);
        }
        let after = head.predict(representation.view());
        assert!(after < before);
    }

    #[test]
    fn heads_are_independent() {
        let mut rng = SmallRng::seed_from_u64(2);
        let heads = RiskHeads::new(4, &mut rng);
        let representation = Array1::from_vec(vec![0.1, 0.2, 0.3, 0.4]);
        let scores = heads.predict(representation.view());
        assert!(scores.pollution_risk > 0.0 && scores.pollution_risk < 1.0);
        assert!((scores.pollution_risk - scores.explosion_risk).abs() > f32::EPSILON);
    }
}
