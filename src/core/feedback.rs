//! Closed-loop modulation of the oscillators.
//!
//! Sensor readings (one foot force per leg) are turned into additive
//! modulation terms on the three state derivatives:
//!
//! ```text
//! d_radius = gain * (mu + k_r * F_r - r^2) * r
//! d_phase  = omega + k_phi * F_phi + coupling
//! d_offset = k_o * F_o
//! ```
//!
//! Open loop is `Modulation::ZERO`, which leaves the offset constant.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{CpgError, Result};
use crate::oscillator::LEG_COUNT;

/// Per-leg modulation of radius, phase and offset derivatives.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Modulation {
    pub radius: [f64; LEG_COUNT],
    pub phase: [f64; LEG_COUNT],
    pub offset: [f64; LEG_COUNT],
}

impl Modulation {
    pub const ZERO: Modulation = Modulation {
        radius: [0.0; LEG_COUNT],
        phase: [0.0; LEG_COUNT],
        offset: [0.0; LEG_COUNT],
    };

    /// Split a 12-wide vector as `[F_r x4, F_phi x4, F_o x4]`.
    pub fn from_flat(values: &[f64; 3 * LEG_COUNT]) -> Self {
        let mut m = Self::ZERO;
        m.radius.copy_from_slice(&values[0..LEG_COUNT]);
        m.phase.copy_from_slice(&values[LEG_COUNT..2 * LEG_COUNT]);
        m.offset.copy_from_slice(&values[2 * LEG_COUNT..3 * LEG_COUNT]);
        m
    }
}

/// Source of closed-loop modulation.
pub trait Feedback {
    fn modulation(&mut self, forces: &[f64; LEG_COUNT]) -> Modulation;
}

/// Open-loop source: never modulates.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenLoop;

impl Feedback for OpenLoop {
    fn modulation(&mut self, _forces: &[f64; LEG_COUNT]) -> Modulation {
        Modulation::ZERO
    }
}

/// Dense feed-forward network mapping 4 foot forces to 12 modulation terms.
///
/// No biases; every layer (output included) goes through `tanh`, so each
/// modulation term lies in `(-1, 1)` before the per-leg gains.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TanhNetwork {
    /// Layer sizes including input and output, e.g. `[4, 8, 12]`.
    sizes: Vec<usize>,
    /// One row-major `inputs x outputs` matrix per layer, flattened.
    weights: Vec<Vec<f64>>,
}

impl TanhNetwork {
    pub const INPUTS: usize = LEG_COUNT;
    pub const OUTPUTS: usize = 3 * LEG_COUNT;

    /// Build a network with the given hidden layer widths and zero weights.
    pub fn new(hidden: &[usize]) -> Result<Self> {
        if hidden.iter().any(|&h| h == 0) {
            return Err(CpgError::configuration("hidden", "layer width must be >= 1"));
        }
        let mut sizes = Vec::with_capacity(hidden.len() + 2);
        sizes.push(Self::INPUTS);
        sizes.extend_from_slice(hidden);
        sizes.push(Self::OUTPUTS);

        let weights = sizes
            .windows(2)
            .map(|w| vec![0.0; w[0] * w[1]])
            .collect();
        Ok(Self { sizes, weights })
    }

    /// Build a network and load its weights from a flat slice.
    pub fn with_weights(hidden: &[usize], flat: &[f64]) -> Result<Self> {
        let mut net = Self::new(hidden)?;
        net.set_weights(flat)?;
        Ok(net)
    }

    pub fn weight_count(&self) -> usize {
        self.weights.iter().map(Vec::len).sum()
    }

    pub fn layer_sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Load weights ordered layer by layer, then input row, then output column.
    pub fn set_weights(&mut self, flat: &[f64]) -> Result<()> {
        let expected = self.weight_count();
        if flat.len() != expected {
            return Err(CpgError::BoundsMismatch {
                expected,
                actual: flat.len(),
            });
        }
        if let Some(pos) = flat.iter().position(|w| !w.is_finite()) {
            return Err(CpgError::configuration(
                "weights",
                format!("weight {pos} is not finite"),
            ));
        }
        let mut cursor = 0;
        for layer in &mut self.weights {
            let n = layer.len();
            layer.copy_from_slice(&flat[cursor..cursor + n]);
            cursor += n;
        }
        Ok(())
    }

    pub fn forward(&self, inputs: &[f64; LEG_COUNT]) -> [f64; 3 * LEG_COUNT] {
        let mut values: Vec<f64> = inputs.to_vec();
        for (layer, w) in self.sizes.windows(2).zip(&self.weights) {
            let (rows, cols) = (layer[0], layer[1]);
            let mut next = vec![0.0; cols];
            for (r, &x) in values.iter().enumerate().take(rows) {
                let row = &w[r * cols..(r + 1) * cols];
                for (acc, &wij) in next.iter_mut().zip(row) {
                    *acc += x * wij;
                }
            }
            for v in &mut next {
                *v = v.tanh();
            }
            values = next;
        }

        let mut out = [0.0; 3 * LEG_COUNT];
        out.copy_from_slice(&values[..3 * LEG_COUNT]);
        out
    }
}

impl Feedback for TanhNetwork {
    fn modulation(&mut self, forces: &[f64; LEG_COUNT]) -> Modulation {
        Modulation::from_flat(&self.forward(forces))
    }
}
