//! Episode driver and the boundary to the physics simulator.
//!
//! The simulator itself lives outside this crate. It is reached through two
//! traits:
//! - [`Environment`]: one running physics episode, stepped by [`run_episode`].
//! - [`Simulator`]: evaluates a full [`EvaluationRequest`] (one genome, one
//!   model) and returns an [`Evaluation`]. [`LocalSimulator`] implements it on
//!   top of any `Environment` factory.
//!
//! Every evaluation builds its own `OscillatorNetwork`, so requests can run
//! concurrently with no shared mutable state.

pub mod fitness;

use core::f64::consts::PI;
use core::marker::PhantomData;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use tracing::{debug, warn};

use crate::config::{CpgConfig, FeedbackGains};
use crate::decoder::{build_oscillator_network, DecoderMode};
use crate::error::{CpgError, Result};
use crate::feedback::{Feedback, OpenLoop, TanhNetwork};
use crate::oscillator::{OscillatorNetwork, LEG_COUNT};

pub use fitness::Reward;

/// External push on the robot body: 3 forces then 3 torques.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Perturbation {
    /// Simulated time (s) from which the push is due.
    pub time: f64,
    pub wrench: [f64; 6],
}

/// One running physics episode.
pub trait Environment {
    /// Current simulated time (s).
    fn time(&self) -> f64;

    /// Advance the physics with joint targets in radians.
    ///
    /// Returns `false` when the episode has failed (the robot fell).
    fn step(&mut self, actions: &[f64; LEG_COUNT], perturbation: Option<&Perturbation>) -> bool;

    /// Contact force of each foot, in leg order.
    fn foot_forces(&self) -> [f64; LEG_COUNT];

    /// Forward distance covered so far (m).
    fn distance(&self) -> f64;

    /// Energy consumed so far (J).
    fn energy_consumed(&self) -> f64;
}

/// Parameters of one episode.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EpisodeConfig {
    /// Episode length in simulated seconds.
    pub duration: f64,
    /// Initial period with zero commands so the robot can settle on its feet.
    pub settle_time: f64,
    /// Multiplier on CPG output (degrees) before conversion to radians.
    pub amplitude_scale: f64,
    pub closed_loop: bool,
    /// Record raw commands and foot forces.
    pub logging: bool,
}

impl Default for EpisodeConfig {
    fn default() -> Self {
        Self {
            duration: 15.0,
            settle_time: 1.0,
            amplitude_scale: 1.0,
            closed_loop: false,
            logging: false,
        }
    }
}

impl EpisodeConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(CpgError::configuration(
                "duration",
                format!("must be finite and > 0, got {}", self.duration),
            ));
        }
        if !self.settle_time.is_finite() || self.settle_time < 0.0 {
            return Err(CpgError::configuration(
                "settle_time",
                format!("must be finite and >= 0, got {}", self.settle_time),
            ));
        }
        if !self.amplitude_scale.is_finite() {
            return Err(CpgError::configuration("amplitude_scale", "must be finite"));
        }
        Ok(())
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_settle_time(mut self, settle_time: f64) -> Self {
        self.settle_time = settle_time;
        self
    }

    pub fn with_logging(mut self, logging: bool) -> Self {
        self.logging = logging;
        self
    }

    /// Factor from CPG output to actuator radians (mirrored joint sign).
    #[inline]
    pub fn command_scale(&self) -> f64 {
        -self.amplitude_scale * PI / 180.0
    }
}

/// Result of one episode.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Evaluation {
    pub success: bool,
    pub simulated_time: f64,
    pub distance: f64,
    pub energy_consumed: f64,
    /// Raw CPG commands per leg (empty unless logging).
    pub action_history: [Vec<f64>; LEG_COUNT],
    /// Foot forces per leg (empty unless logging).
    pub sensor_history: [Vec<f64>; LEG_COUNT],
}

impl Evaluation {
    fn finish<E: Environment + ?Sized>(mut self, env: &E, success: bool) -> Self {
        self.success = success;
        self.simulated_time = env.time();
        self.distance = env.distance();
        self.energy_consumed = env.energy_consumed();
        self
    }
}

/// Pops each perturbation once, at the first step whose time reaches it.
struct PerturbationSchedule {
    pending: Vec<Perturbation>,
    next: usize,
}

impl PerturbationSchedule {
    fn new(perturbations: &[Perturbation]) -> Result<Self> {
        if perturbations.iter().any(|p| !p.time.is_finite()) {
            return Err(CpgError::configuration("perturbations", "time must be finite"));
        }
        let mut pending = perturbations.to_vec();
        pending.sort_by(|a, b| a.time.total_cmp(&b.time));
        Ok(Self { pending, next: 0 })
    }

    fn due(&mut self, t: f64) -> Option<&Perturbation> {
        let p = self.pending.get(self.next).filter(|p| t >= p.time)?;
        self.next += 1;
        Some(p)
    }
}

/// Drive `network` through one episode of `env`.
///
/// Commands are zero during the settle time. Afterwards the network is
/// queried at the environment's clock, so integration stays on the network's
/// own `dt` whatever the physics step is. The network is reset first, so
/// one network can be reused across episodes.
pub fn run_episode<E, F>(
    env: &mut E,
    network: &mut OscillatorNetwork,
    feedback: &mut F,
    perturbations: &[Perturbation],
    cfg: &EpisodeConfig,
) -> Result<Evaluation>
where
    E: Environment + ?Sized,
    F: Feedback + ?Sized,
{
    cfg.validate()?;
    network.reset();
    let mut schedule = PerturbationSchedule::new(perturbations)?;
    let scale = cfg.command_scale();
    let mut eval = Evaluation::default();

    debug!(
        duration = cfg.duration,
        closed_loop = cfg.closed_loop,
        perturbations = perturbations.len(),
        "episode started"
    );

    while env.time() < cfg.duration {
        let t = env.time();
        let mut actions = [0.0; LEG_COUNT];

        if t >= cfg.settle_time {
            let raw = if cfg.closed_loop {
                network.get_action_closed_loop(t, &env.foot_forces(), feedback)?
            } else {
                network.get_action(t)?
            };
            if cfg.logging {
                let forces = env.foot_forces();
                for i in 0..LEG_COUNT {
                    eval.action_history[i].push(raw[i]);
                    eval.sensor_history[i].push(forces[i]);
                }
            }
            for (a, r) in actions.iter_mut().zip(raw) {
                *a = r * scale;
            }
        }

        let ok = env.step(&actions, schedule.due(t));
        if !ok {
            let eval = eval.finish(env, false);
            debug!(time = eval.simulated_time, distance = eval.distance, "episode failed");
            return Ok(eval);
        }
        if env.time() <= t {
            warn!(time = t, "environment clock did not advance");
            return Err(CpgError::configuration(
                "environment",
                format!("time did not advance past {t}"),
            ));
        }
    }

    let eval = eval.finish(env, true);
    debug!(
        time = eval.simulated_time,
        distance = eval.distance,
        energy = eval.energy_consumed,
        "episode finished"
    );
    Ok(eval)
}

/// One evaluation handed to a simulator.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EvaluationRequest {
    /// Path of the robot model to load.
    pub model: String,
    pub closed_loop: bool,
    /// Genome, followed in closed loop by feedback gains and network weights.
    pub params: Vec<f64>,
    pub perturbations: Vec<Perturbation>,
    pub render: bool,
    pub logging: bool,
}

impl EvaluationRequest {
    pub fn open_loop(model: impl Into<String>, params: Vec<f64>) -> Self {
        Self {
            model: model.into(),
            closed_loop: false,
            params,
            perturbations: Vec::new(),
            render: false,
            logging: false,
        }
    }
}

/// Evaluates genomes against a physics model.
pub trait Simulator {
    fn evaluate(&self, request: &EvaluationRequest) -> Result<Evaluation>;
}

/// Closed-loop parameter layout:
/// `genome | k_r x4 | k_phi x4 | k_o x4 | network weights`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClosedLoopLayout {
    pub mode: DecoderMode,
    /// Hidden layer widths of the feedback network.
    pub hidden: Vec<usize>,
}

impl ClosedLoopLayout {
    pub fn param_count(&self) -> Result<usize> {
        let weights = TanhNetwork::new(&self.hidden)?.weight_count();
        Ok(self.mode.genome_len() + 3 * LEG_COUNT + weights)
    }

    /// Split closed-loop params into genome, feedback gains and network.
    pub fn split<'a>(&self, params: &'a [f64]) -> Result<(&'a [f64], FeedbackGains, TanhNetwork)> {
        let expected = self.param_count()?;
        if params.len() != expected {
            return Err(CpgError::BoundsMismatch {
                expected,
                actual: params.len(),
            });
        }
        let (genome, rest) = params.split_at(self.mode.genome_len());
        let (kappa, weights) = rest.split_at(3 * LEG_COUNT);
        let mut gains = FeedbackGains::default();
        gains.radius.copy_from_slice(&kappa[..LEG_COUNT]);
        gains.phase.copy_from_slice(&kappa[LEG_COUNT..2 * LEG_COUNT]);
        gains.offset.copy_from_slice(&kappa[2 * LEG_COUNT..]);
        let net = TanhNetwork::with_weights(&self.hidden, weights)?;
        Ok((genome, gains, net))
    }
}

/// `Simulator` over any environment factory.
pub struct LocalSimulator<M, E> {
    make_env: M,
    cpg: CpgConfig,
    episode: EpisodeConfig,
    layout: ClosedLoopLayout,
    _env: PhantomData<fn() -> E>,
}

impl<M, E> LocalSimulator<M, E>
where
    M: Fn(&EvaluationRequest) -> Result<E>,
    E: Environment,
{
    pub fn new(make_env: M, cpg: CpgConfig, episode: EpisodeConfig) -> Self {
        Self {
            make_env,
            cpg,
            episode,
            layout: ClosedLoopLayout {
                mode: DecoderMode::Full,
                hidden: Vec::new(),
            },
            _env: PhantomData,
        }
    }

    pub fn with_closed_loop_layout(mut self, layout: ClosedLoopLayout) -> Self {
        self.layout = layout;
        self
    }
}

impl<M, E> Simulator for LocalSimulator<M, E>
where
    M: Fn(&EvaluationRequest) -> Result<E>,
    E: Environment,
{
    fn evaluate(&self, request: &EvaluationRequest) -> Result<Evaluation> {
        let episode = EpisodeConfig {
            closed_loop: request.closed_loop,
            logging: request.logging,
            ..self.episode
        };
        let mut env = (self.make_env)(request)?;

        if request.closed_loop {
            let (genome, gains, mut net) = self.layout.split(&request.params)?;
            let mut network =
                build_oscillator_network(genome, self.cpg.with_feedback_gains(gains))?;
            run_episode(&mut env, &mut network, &mut net, &request.perturbations, &episode)
        } else {
            let mut network = build_oscillator_network(&request.params, self.cpg)?;
            run_episode(&mut env, &mut network, &mut OpenLoop, &request.perturbations, &episode)
        }
    }
}

/// Evaluate every request; results keep the order of `requests`.
#[cfg(feature = "parallel")]
pub fn evaluate_population<S>(simulator: &S, requests: &[EvaluationRequest]) -> Vec<Result<Evaluation>>
where
    S: Simulator + Sync + ?Sized,
{
    requests.par_iter().map(|r| simulator.evaluate(r)).collect()
}

/// Evaluate every request; results keep the order of `requests`.
#[cfg(not(feature = "parallel"))]
pub fn evaluate_population<S>(simulator: &S, requests: &[EvaluationRequest]) -> Vec<Result<Evaluation>>
where
    S: Simulator + ?Sized,
{
    requests.iter().map(|r| simulator.evaluate(r)).collect()
}
