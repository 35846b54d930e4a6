//! # tigrillo
//!
//! Central pattern generator (CPG) for a four-legged robot.
//!
//! Four coupled Hopf-like oscillators, one per leg, produce joint angle
//! commands. A flat parameter vector (the genome) found by an external
//! optimizer is decoded into oscillator parameters; the network is then
//! advanced at a fixed internal step and queried at the simulator's clock.
//!
//! ## Quick Start
//!
//! ```
//! use tigrillo::prelude::*;
//!
//! // Decode a 12-value genome into a fresh network
//! let genome = DecoderMode::Full.initial_values();
//! let mut cpg = build_oscillator_network(&genome, CpgConfig::default()).unwrap();
//!
//! // Query commands at increasing simulation times
//! let a = cpg.get_action(0.01).unwrap();
//! let b = cpg.get_action(0.02).unwrap();
//! assert!(a.iter().chain(b.iter()).all(|x| x.is_finite()));
//! ```
//!
//! ## Feature Flags
//!
//! - `serde` (default): serialization of configs, parameters and results;
//!   JSON persistence
//! - `parallel`: evaluate populations on multiple threads via rayon
//!
//! ## Modules
//!
//! - [`oscillator`]: The coupled oscillator network
//! - [`decoder`]: Genome layouts and search bounds
//! - [`coupling`]: Coupling strengths and phase biases
//! - [`shaping`]: Duty-cycle phase shaping
//! - [`feedback`]: Closed-loop modulation from foot forces
//! - [`rollout`]: Episode driver, simulator boundary and rewards
//! - [`storage`]: Saved controllers

#[path = "core/error.rs"]
pub mod error;

#[path = "core/config.rs"]
pub mod config;

#[path = "core/shaping.rs"]
pub mod shaping;

#[path = "core/coupling.rs"]
pub mod coupling;

#[path = "core/feedback.rs"]
pub mod feedback;

#[path = "core/oscillator.rs"]
pub mod oscillator;

#[path = "core/decoder.rs"]
pub mod decoder;

#[path = "core/prng.rs"]
pub mod prng;

#[path = "core/storage.rs"]
pub mod storage;

pub mod rollout;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::{CpgConfig, FeedbackGains, Integrator, PhaseSeed};
    pub use crate::coupling::{CouplingMatrix, LegPhases};
    pub use crate::decoder::{build_oscillator_network, decode, DecoderMode, ParamBounds};
    pub use crate::error::{CpgError, Result};
    pub use crate::feedback::{Feedback, Modulation, OpenLoop, TanhNetwork};
    pub use crate::oscillator::{CpgParams, Leg, LegState, OscillatorNetwork, LEG_COUNT};
    pub use crate::rollout::{
        evaluate_population, run_episode, Environment, EpisodeConfig, Evaluation,
        EvaluationRequest, Perturbation, Reward, Simulator,
    };
}
