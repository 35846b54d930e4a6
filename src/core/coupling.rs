//! Phase coupling between the four leg oscillators.
//!
//! `coupling[i][j]` scales how strongly leg `i` is pulled toward holding the
//! relative phase `psi[i][j]` to leg `j`. The pull term is
//! `coupling[i][j] * sin(phi[j] - phi[i] - psi[i][j])`, so its stable point is
//! `phi[j] - phi[i] == psi[i][j]`.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{CpgError, Result};
use crate::oscillator::{Leg, LEG_COUNT};

/// 4x4 matrix indexed by leg.
pub type LegMatrix = [[f64; LEG_COUNT]; LEG_COUNT];

/// Tolerance used when checking the symmetry contracts of explicit matrices.
const SYMMETRY_EPS: f64 = 1e-9;

/// Target phase of every leg relative to the front-left leg (radians).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LegPhases(pub [f64; LEG_COUNT]);

impl LegPhases {
    /// Three independent offsets: front-right, back-left and back-right
    /// relative to front-left.
    pub fn from_offsets(left_right: f64, front_hind: f64, diagonal: f64) -> Self {
        Self([0.0, left_right, front_hind, diagonal])
    }

    /// Bound gait: left and right legs move together, hind pair lags the
    /// front pair by `front_hind`.
    pub fn bound(front_hind: f64) -> Self {
        Self([0.0, 0.0, front_hind, front_hind])
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CouplingMatrix {
    coupling: LegMatrix,
    psi: LegMatrix,
}

impl CouplingMatrix {
    /// Build from explicit matrices.
    ///
    /// Rejects non-finite entries, asymmetric `coupling`, non-antisymmetric
    /// `psi` and a non-zero diagonal in either.
    pub fn new(coupling: LegMatrix, psi: LegMatrix) -> Result<Self> {
        for i in 0..LEG_COUNT {
            let leg = Leg::ALL[i];
            if coupling[i][i] != 0.0 || psi[i][i] != 0.0 {
                return Err(CpgError::leg_configuration(
                    "coupling",
                    leg,
                    "self-coupling must be zero",
                ));
            }
            for j in 0..LEG_COUNT {
                if !coupling[i][j].is_finite() || !psi[i][j].is_finite() {
                    return Err(CpgError::leg_configuration(
                        "coupling",
                        leg,
                        format!("entry [{i}][{j}] is not finite"),
                    ));
                }
                if coupling[i][j] < 0.0 {
                    return Err(CpgError::leg_configuration(
                        "coupling",
                        leg,
                        format!("entry [{i}][{j}] is negative ({})", coupling[i][j]),
                    ));
                }
                if (coupling[i][j] - coupling[j][i]).abs() > SYMMETRY_EPS {
                    return Err(CpgError::leg_configuration(
                        "coupling",
                        leg,
                        format!("coupling[{i}][{j}] != coupling[{j}][{i}]"),
                    ));
                }
                if (psi[i][j] + psi[j][i]).abs() > SYMMETRY_EPS {
                    return Err(CpgError::leg_configuration(
                        "psi",
                        leg,
                        format!("psi[{i}][{j}] != -psi[{j}][{i}]"),
                    ));
                }
            }
        }
        Ok(Self { coupling, psi })
    }

    /// Unit coupling between every distinct pair of legs, biases derived from
    /// per-leg target phases as `psi[i][j] = theta[j] - theta[i]`.
    ///
    /// Deriving every bias from one phase vector keeps `psi` antisymmetric and
    /// consistent around every loop of legs, so the coupling has a common
    /// fixed point and adds no net drift.
    pub fn all_to_all(phases: LegPhases) -> Self {
        let theta = phases.0;
        let mut coupling = [[0.0; LEG_COUNT]; LEG_COUNT];
        let mut psi = [[0.0; LEG_COUNT]; LEG_COUNT];
        for i in 0..LEG_COUNT {
            for j in 0..LEG_COUNT {
                if i != j {
                    coupling[i][j] = 1.0;
                    psi[i][j] = theta[j] - theta[i];
                }
            }
        }
        Self { coupling, psi }
    }

    pub fn from_offsets(left_right: f64, front_hind: f64, diagonal: f64) -> Self {
        Self::all_to_all(LegPhases::from_offsets(left_right, front_hind, diagonal))
    }

    pub fn bound(front_hind: f64) -> Self {
        Self::all_to_all(LegPhases::bound(front_hind))
    }

    /// No coupling at all; every leg runs at its own frequency.
    pub fn uncoupled() -> Self {
        Self {
            coupling: [[0.0; LEG_COUNT]; LEG_COUNT],
            psi: [[0.0; LEG_COUNT]; LEG_COUNT],
        }
    }

    /// Scale every coupling strength by `k` (k >= 0).
    pub fn with_strength(mut self, k: f64) -> Result<Self> {
        if !k.is_finite() || k < 0.0 {
            return Err(CpgError::configuration(
                "coupling",
                format!("strength must be finite and >= 0, got {k}"),
            ));
        }
        for row in &mut self.coupling {
            for c in row.iter_mut() {
                *c *= k;
            }
        }
        Ok(self)
    }

    #[inline]
    pub fn coupling(&self) -> &LegMatrix {
        &self.coupling
    }

    #[inline]
    pub fn psi(&self) -> &LegMatrix {
        &self.psi
    }

    /// Phase-locking correction for leg `i` given the phases of all legs.
    #[inline]
    pub fn phase_pull(&self, i: usize, phases: &[f64; LEG_COUNT]) -> f64 {
        let mut pull = 0.0;
        for j in 0..LEG_COUNT {
            let k = self.coupling[i][j];
            if k != 0.0 {
                pull += k * (phases[j] - phases[i] - self.psi[i][j]).sin();
            }
        }
        pull
    }

    /// Largest total coupling acting on one leg; bounds the fastest phase rate
    /// the coupling can add.
    pub fn max_row_strength(&self) -> f64 {
        self.coupling
            .iter()
            .map(|row| row.iter().sum::<f64>())
            .fold(0.0, f64::max)
    }

    pub fn is_antisymmetric(&self) -> bool {
        (0..LEG_COUNT).all(|i| (0..LEG_COUNT).all(|j| self.psi[i][j] == -self.psi[j][i]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f64::consts::PI;

    #[test]
    fn bound_gait_pairs_legs() {
        let m = CouplingMatrix::bound(PI / 3.0);
        let psi = m.psi();
        assert_eq!(psi[0][1], 0.0);
        assert_eq!(psi[2][3], 0.0);
        assert_eq!(psi[0][2], PI / 3.0);
        assert_eq!(psi[1][3], PI / 3.0);
        assert_eq!(psi[2][0], -PI / 3.0);
        assert!(m.is_antisymmetric());
    }

    #[test]
    fn offsets_are_transitive() {
        let m = CouplingMatrix::from_offsets(0.4, 1.3, 2.9);
        let psi = m.psi();
        for i in 0..LEG_COUNT {
            for j in 0..LEG_COUNT {
                for k in 0..LEG_COUNT {
                    assert!((psi[i][k] - (psi[i][j] + psi[j][k])).abs() < 1e-12);
                }
            }
        }
        assert!(m.is_antisymmetric());
        assert_eq!(m.max_row_strength(), 3.0);
    }

    #[test]
    fn pull_vanishes_at_target_phases() {
        let phases = LegPhases::from_offsets(0.4, 1.3, 2.9);
        let m = CouplingMatrix::all_to_all(phases);
        let phi = [1.0 + phases.0[0], 1.0 + phases.0[1], 1.0 + phases.0[2], 1.0 + phases.0[3]];
        for i in 0..LEG_COUNT {
            assert!(m.phase_pull(i, &phi).abs() < 1e-12);
        }
    }

    #[test]
    fn explicit_matrices_are_validated() {
        let good = CouplingMatrix::all_to_all(LegPhases::bound(1.0));
        assert!(CouplingMatrix::new(*good.coupling(), *good.psi()).is_ok());

        let mut psi = *good.psi();
        psi[0][2] = 0.5;
        let err = CouplingMatrix::new(*good.coupling(), psi).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("psi"));

        let mut coupling = *good.coupling();
        coupling[1][1] = 1.0;
        assert!(CouplingMatrix::new(coupling, *good.psi()).is_err());

        let mut coupling = *good.coupling();
        coupling[0][3] = 0.5;
        assert!(CouplingMatrix::new(coupling, *good.psi()).is_err());
    }

    #[test]
    fn strength_scales_coupling_only() {
        let m = CouplingMatrix::bound(1.0).with_strength(2.5).unwrap();
        assert_eq!(m.coupling()[0][1], 2.5);
        assert_eq!(m.psi()[0][2], 1.0);
        assert!(CouplingMatrix::bound(1.0).with_strength(-1.0).is_err());
        assert_eq!(CouplingMatrix::uncoupled().max_row_strength(), 0.0);
    }
}
