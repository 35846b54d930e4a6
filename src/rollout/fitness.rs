//! Reward shaping for gait search.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::Evaluation;

/// Robot mass (kg) times gravity, scaling the distance term.
const WEIGHT: f64 = 1.447812 * 9.81;

/// Scores an episode. Higher is better; failed episodes and backward motion
/// score zero.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum Reward {
    /// `m·g·distance·tanh(energy / e_ref)`
    Tanh { e_ref: f64 },
    /// `(10 − 0.01·(energy − e_ref)²)·distance`
    Quadratic { e_ref: f64 },
}

impl Default for Reward {
    fn default() -> Self {
        Reward::Tanh { e_ref: 20.0 }
    }
}

impl Reward {
    pub fn score(&self, success: bool, distance: f64, energy: f64) -> f64 {
        if !success || distance < 0.0 {
            return 0.0;
        }
        match *self {
            Reward::Tanh { e_ref } => WEIGHT * distance * (energy / e_ref).tanh(),
            Reward::Quadratic { e_ref } => {
                let de = energy - e_ref;
                (10.0 - 0.01 * de * de) * distance
            }
        }
    }

    pub fn evaluate(&self, eval: &Evaluation) -> f64 {
        self.score(eval.success, eval.distance, eval.energy_consumed)
    }

    /// Negated score, for minimizing optimizers.
    pub fn cost(&self, eval: &Evaluation) -> f64 {
        -self.evaluate(eval)
    }
}
