#[cfg(feature = "serde")]
use std::fs;
#[cfg(feature = "serde")]
use std::path::Path;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{CpgError, Result};
use crate::oscillator::LEG_COUNT;

/// Numerical scheme used by `OscillatorNetwork::step`.
///
/// Both schemes honor the same step contract (one fixed `dt` advance of all
/// legs from the same prior state); they differ only in accuracy per step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Integrator {
    /// Forward Euler. Adequate while `dt` stays very small.
    #[default]
    Euler,
    /// Classic fourth-order Runge-Kutta on the joint 12-dimensional state.
    Rk4,
}

impl Integrator {
    /// Upper bound on `dt * lambda` for a linear decay `x' = -lambda x` to stay stable.
    pub fn stability_limit(self) -> f64 {
        match self {
            Integrator::Euler => 2.0,
            Integrator::Rk4 => 2.78,
        }
    }

    /// Parse `euler` / `rk4` (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "euler" => Some(Integrator::Euler),
            "rk4" | "runge-kutta" => Some(Integrator::Rk4),
            _ => None,
        }
    }
}

/// Starting phase of each oscillator.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PhaseSeed {
    /// `phi = π·d`: every leg starts mid-stance.
    #[default]
    DutyScaled,
    /// Same fixed phase for every leg.
    Constant(f64),
}

impl PhaseSeed {
    pub fn initial_phase(self, duty_factor: f64) -> f64 {
        match self {
            PhaseSeed::DutyScaled => core::f64::consts::PI * duty_factor,
            PhaseSeed::Constant(phase) => phase,
        }
    }
}

/// Per-leg weights applied to closed-loop modulation (κ_r, κ_φ, κ_o).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FeedbackGains {
    pub radius: [f64; LEG_COUNT],
    pub phase: [f64; LEG_COUNT],
    pub offset: [f64; LEG_COUNT],
}

impl Default for FeedbackGains {
    fn default() -> Self {
        Self {
            radius: [1.0; LEG_COUNT],
            phase: [1.0; LEG_COUNT],
            offset: [1.0; LEG_COUNT],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CpgConfig {
    /// Internal integration step (seconds).
    pub dt: f64,
    /// Convergence rate γ of each radius toward `sqrt(amplitude_target)`.
    pub gain: f64,
    pub integrator: Integrator,

    pub initial_radius: f64,
    pub phase_seed: PhaseSeed,

    /// Fail fast with `NumericalInstability` if a step produces NaN/inf.
    pub check_finite: bool,

    pub feedback_gains: FeedbackGains,
}

impl Default for CpgConfig {
    /// Values used by the simulation controller:
    ///
    /// - 1 ms integration step with Euler
    /// - slow radius convergence (γ = 0.1)
    /// - unit starting radius, legs seeded mid-stance
    fn default() -> Self {
        Self {
            dt: 1e-3,
            gain: 0.1,
            integrator: Integrator::Euler,
            initial_radius: 1.0,
            phase_seed: PhaseSeed::DutyScaled,
            check_finite: true,
            feedback_gains: FeedbackGains::default(),
        }
    }
}

impl CpgConfig {
    /// Largest accepted integration step.
    pub const MAX_DT: f64 = 0.1;

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !self.dt.is_finite() || self.dt <= 0.0 || self.dt > Self::MAX_DT {
            return Err(CpgError::configuration(
                "dt",
                format!("must be in (0, {}], got {}", Self::MAX_DT, self.dt),
            ));
        }
        if !self.gain.is_finite() || self.gain <= 0.0 {
            return Err(CpgError::configuration(
                "gain",
                format!("must be finite and > 0, got {}", self.gain),
            ));
        }
        if !self.initial_radius.is_finite() || self.initial_radius <= 0.0 {
            return Err(CpgError::configuration(
                "initial_radius",
                format!("must be finite and > 0, got {}", self.initial_radius),
            ));
        }
        if let PhaseSeed::Constant(phase) = self.phase_seed {
            if !phase.is_finite() {
                return Err(CpgError::configuration("phase_seed", "must be finite"));
            }
        }
        let g = &self.feedback_gains;
        if g
            .radius
            .iter()
            .chain(g.phase.iter())
            .chain(g.offset.iter())
            .any(|k| !k.is_finite())
        {
            return Err(CpgError::configuration("feedback_gains", "must be finite"));
        }
        Ok(())
    }

    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    pub fn with_gain(mut self, gain: f64) -> Self {
        self.gain = gain;
        self
    }

    pub fn with_integrator(mut self, integrator: Integrator) -> Self {
        self.integrator = integrator;
        self
    }

    pub fn with_phase_seed(mut self, seed: PhaseSeed) -> Self {
        self.phase_seed = seed;
        self
    }

    pub fn with_feedback_gains(mut self, gains: FeedbackGains) -> Self {
        self.feedback_gains = gains;
        self
    }

    /// Settings of the earlier on-robot controller (γ = 5, 0.1 ms step).
    pub fn hardware() -> Self {
        Self {
            dt: 1e-4,
            gain: 5.0,
            ..Default::default()
        }
    }

    #[cfg(feature = "serde")]
    pub fn from_json_str(s: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    #[cfg(feature = "serde")]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        Self::from_json_str(&s)
    }

    #[cfg(feature = "serde")]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let s = serde_json::to_string_pretty(self)?;
        fs::write(path, s)?;
        Ok(())
    }
}
