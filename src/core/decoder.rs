//! Genome decoding.
//!
//! A genome is the flat parameter vector the external optimizer searches
//! over, already rescaled from the optimizer's `[0, 1]^n` box to physical
//! units. Its layout and scaling are also the on-disk format of a trained
//! controller, so the index tables below must not change.
//!
//! Full mode (12 values):
//!
//! | idx | value                         |
//! |-----|-------------------------------|
//! | 0   | front swing extent (deg)      |
//! | 1   | hind swing extent (deg)       |
//! | 2   | front stance extent (deg)     |
//! | 3   | hind stance extent (deg)      |
//! | 4   | front offset (deg)            |
//! | 5   | hind offset (deg)             |
//! | 6   | frequency (Hz)                |
//! | 7   | front duty factor             |
//! | 8   | hind duty factor              |
//! | 9   | left-right phase offset (rad) |
//! | 10  | front-hind phase offset (rad) |
//! | 11  | diagonal phase offset (rad)   |
//!
//! Bound-gait mode (8 values): front amplitude, hind amplitude, front offset,
//! hind offset, frequency, front duty, hind duty, front-hind phase offset.

use core::f64::consts::{PI, TAU};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use tracing::debug;

use crate::config::CpgConfig;
use crate::coupling::CouplingMatrix;
use crate::error::{CpgError, Result};
use crate::oscillator::{CpgParams, Leg, OscillatorNetwork, LEG_COUNT};
use crate::prng::Prng;

const FULL_NAMES: [&str; 12] = [
    "front_swing",
    "hind_swing",
    "front_stance",
    "hind_stance",
    "front_offset",
    "hind_offset",
    "frequency",
    "front_duty",
    "hind_duty",
    "left_right_phase",
    "front_hind_phase",
    "diagonal_phase",
];

const BOUND_GAIT_NAMES: [&str; 8] = [
    "front_amplitude",
    "hind_amplitude",
    "front_offset",
    "hind_offset",
    "frequency",
    "front_duty",
    "hind_duty",
    "front_hind_phase",
];

/// Control parameterization, selected by genome length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DecoderMode {
    /// Independent swing/stance extents, three phase offsets.
    Full,
    /// Left-right symmetric legs, one front-hind phase offset.
    BoundGait,
}

impl DecoderMode {
    pub const FULL_LEN: usize = 12;
    pub const BOUND_GAIT_LEN: usize = 8;

    pub fn genome_len(self) -> usize {
        match self {
            DecoderMode::Full => Self::FULL_LEN,
            DecoderMode::BoundGait => Self::BOUND_GAIT_LEN,
        }
    }

    pub fn from_genome_len(len: usize) -> Result<Self> {
        match len {
            Self::FULL_LEN => Ok(DecoderMode::Full),
            Self::BOUND_GAIT_LEN => Ok(DecoderMode::BoundGait),
            actual => Err(CpgError::GenomeLength {
                expected: "12 (full) or 8 (bound gait)",
                actual,
            }),
        }
    }

    pub fn parameter_names(self) -> &'static [&'static str] {
        match self {
            DecoderMode::Full => &FULL_NAMES,
            DecoderMode::BoundGait => &BOUND_GAIT_NAMES,
        }
    }

    /// Search box used by the locomotion experiments.
    pub fn default_bounds(self) -> ParamBounds {
        match self {
            DecoderMode::Full => ParamBounds {
                lower: vec![10.0, 10.0, 20.0, 20.0, -30.0, -30.0, 0.5, 0.1, 0.1, 0.0, 0.0, 0.0],
                upper: vec![40.0, 40.0, 40.0, 40.0, 0.0, 15.0, 4.0, 0.9, 0.9, TAU, TAU, TAU],
            },
            DecoderMode::BoundGait => ParamBounds {
                lower: vec![0.0, 0.0, -30.0, -30.0, 0.5, 0.1, 0.1, 0.0],
                upper: vec![15.0, 15.0, 0.0, 15.0, 4.0, 0.9, 0.9, TAU],
            },
        }
    }

    /// Physically meaningful starting point for the search.
    pub fn initial_values(self) -> Vec<f64> {
        match self {
            DecoderMode::Full => vec![35.0, 35.0, 30.0, 30.0, -5.0, 5.0, 1.0, 0.4, 0.4, 0.0, 0.0, 0.0],
            DecoderMode::BoundGait => vec![2.5, 2.5, -5.0, 5.0, 1.0, 0.4, 0.4, 0.0],
        }
    }

    /// Stable numeric tag used by the binary controller format.
    pub fn tag(self) -> u32 {
        match self {
            DecoderMode::Full => 1,
            DecoderMode::BoundGait => 2,
        }
    }

    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            1 => Some(DecoderMode::Full),
            2 => Some(DecoderMode::BoundGait),
            _ => None,
        }
    }
}

/// Decode a genome; the mode is picked from its length.
pub fn decode(genome: &[f64]) -> Result<CpgParams> {
    decode_with_mode(DecoderMode::from_genome_len(genome.len())?, genome)
}

/// Decode a genome with an explicit mode.
pub fn decode_with_mode(mode: DecoderMode, genome: &[f64]) -> Result<CpgParams> {
    if genome.len() != mode.genome_len() {
        return Err(CpgError::GenomeLength {
            expected: match mode {
                DecoderMode::Full => "12",
                DecoderMode::BoundGait => "8",
            },
            actual: genome.len(),
        });
    }
    let names = mode.parameter_names();
    if let Some(i) = genome.iter().position(|x| !x.is_finite()) {
        return Err(CpgError::configuration(
            "genome",
            format!("value {i} ({}) is not finite", names[i]),
        ));
    }

    let g = genome;
    let (front_amp, hind_amp, front_offset, hind_offset, freq, front_duty, hind_duty, coupling) =
        match mode {
            DecoderMode::Full => (
                half_range_squared(g[0], g[2]),
                half_range_squared(g[1], g[3]),
                g[4],
                g[5],
                g[6],
                g[7],
                g[8],
                CouplingMatrix::from_offsets(g[9], g[10], g[11]),
            ),
            DecoderMode::BoundGait => (
                g[0] * g[0],
                g[1] * g[1],
                g[2],
                g[3],
                g[4],
                g[5],
                g[6],
                CouplingMatrix::bound(g[7]),
            ),
        };

    if freq < 0.0 {
        return Err(CpgError::configuration(
            "frequency",
            format!("must be >= 0 Hz, got {freq}"),
        ));
    }
    let omega = 2.0 * PI * freq;

    let pair = |front: f64, hind: f64| Leg::ALL.map(|leg| if leg.is_front() { front } else { hind });
    let params = CpgParams {
        amplitude: pair(front_amp, hind_amp),
        offset: pair(front_offset, hind_offset),
        angular_frequency: [omega; LEG_COUNT],
        duty_factor: pair(front_duty, hind_duty),
        coupling,
    };
    params.validate()?;
    Ok(params)
}

/// `((swing - stance) / 2)^2`: the oscillator wants a squared amplitude.
#[inline]
fn half_range_squared(swing: f64, stance: f64) -> f64 {
    let half = (swing - stance) / 2.0;
    half * half
}

/// Decode a genome and construct a fresh network for one trial.
pub fn build_oscillator_network(genome: &[f64], cfg: CpgConfig) -> Result<OscillatorNetwork> {
    let mode = DecoderMode::from_genome_len(genome.len())?;
    debug!(?mode, "decoding genome");
    OscillatorNetwork::new(decode_with_mode(mode, genome)?, cfg)
}

/// Per-dimension box mapping optimizer space `[0, 1]^n` to physical units.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ParamBounds {
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl ParamBounds {
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> Result<Self> {
        if lower.len() != upper.len() {
            return Err(CpgError::BoundsMismatch {
                expected: lower.len(),
                actual: upper.len(),
            });
        }
        for (i, (&l, &u)) in lower.iter().zip(&upper).enumerate() {
            if !l.is_finite() || !u.is_finite() || u <= l {
                return Err(CpgError::configuration(
                    "bounds",
                    format!("dimension {i}: need finite lower < upper, got [{l}, {u}]"),
                ));
            }
        }
        Ok(Self { lower, upper })
    }

    pub fn full_default() -> Self {
        DecoderMode::Full.default_bounds()
    }

    pub fn bound_gait_default() -> Self {
        DecoderMode::BoundGait.default_bounds()
    }

    pub fn len(&self) -> usize {
        self.lower.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    fn check_len(&self, x: &[f64]) -> Result<()> {
        if x.len() != self.len() {
            return Err(CpgError::BoundsMismatch {
                expected: self.len(),
                actual: x.len(),
            });
        }
        Ok(())
    }

    /// Physical to optimizer space: `(x - lower) / (upper - lower)`.
    pub fn normalize(&self, physical: &[f64]) -> Result<Vec<f64>> {
        self.check_len(physical)?;
        Ok(physical
            .iter()
            .zip(self.lower.iter().zip(&self.upper))
            .map(|(&x, (&l, &u))| (x - l) / (u - l))
            .collect())
    }

    /// Optimizer to physical space: `x * (upper - lower) + lower`.
    pub fn denormalize(&self, normalized: &[f64]) -> Result<Vec<f64>> {
        self.check_len(normalized)?;
        Ok(normalized
            .iter()
            .zip(self.lower.iter().zip(&self.upper))
            .map(|(&x, (&l, &u))| x * (u - l) + l)
            .collect())
    }

    /// Clamp an optimizer-space point into the unit box.
    pub fn clamp_normalized(normalized: &[f64]) -> Vec<f64> {
        normalized.iter().map(|x| x.clamp(0.0, 1.0)).collect()
    }

    /// Denormalize after clamping into the unit box, so the result always
    /// lies inside the bounds.
    pub fn denormalize_clamped(&self, normalized: &[f64]) -> Result<Vec<f64>> {
        self.denormalize(&Self::clamp_normalized(normalized))
    }

    pub fn contains(&self, physical: &[f64]) -> bool {
        physical.len() == self.len()
            && physical
                .iter()
                .zip(self.lower.iter().zip(&self.upper))
                .all(|(&x, (&l, &u))| l <= x && x <= u)
    }

    /// Uniform sample inside the box, in physical units.
    pub fn sample(&self, rng: &mut Prng) -> Vec<f64> {
        self.lower
            .iter()
            .zip(&self.upper)
            .map(|(&l, &u)| rng.gen_range_f64(l, u))
            .collect()
    }
}
