use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use tracing::{debug, warn};

use crate::config::{CpgConfig, Integrator};
use crate::coupling::CouplingMatrix;
use crate::error::{CpgError, Result};
use crate::feedback::{Feedback, Modulation};
use crate::shaping::shaped_output;

pub const LEG_COUNT: usize = 4;

/// Phase resolution below which construction logs a warning (radians per step).
const COARSE_PHASE_STEP: f64 = 0.1;

/// Cap on the up-front allocation of `trace`.
const MAX_TRACE_PREALLOC: usize = 1 << 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Leg {
    FrontLeft,
    FrontRight,
    BackLeft,
    BackRight,
}

impl Leg {
    pub const ALL: [Leg; LEG_COUNT] = [Leg::FrontLeft, Leg::FrontRight, Leg::BackLeft, Leg::BackRight];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_front(self) -> bool {
        matches!(self, Leg::FrontLeft | Leg::FrontRight)
    }

    pub fn name(self) -> &'static str {
        match self {
            Leg::FrontLeft => "front-left",
            Leg::FrontRight => "front-right",
            Leg::BackLeft => "back-left",
            Leg::BackRight => "back-right",
        }
    }
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Mutable oscillator state of one leg.
///
/// Only the integration step writes these fields.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LegState {
    pub radius: f64,
    pub phase: f64,
    pub offset: f64,
}

impl LegState {
    #[inline]
    fn add_scaled(self, d: LegState, h: f64) -> LegState {
        LegState {
            radius: self.radius + h * d.radius,
            phase: self.phase + h * d.phase,
            offset: self.offset + h * d.offset,
        }
    }
}

type NetworkState = [LegState; LEG_COUNT];

#[inline]
fn add_scaled(s: &NetworkState, d: &NetworkState, h: f64) -> NetworkState {
    let mut out = *s;
    for i in 0..LEG_COUNT {
        out[i] = s[i].add_scaled(d[i], h);
    }
    out
}

/// Physical oscillator constants, one entry per leg.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CpgParams {
    /// Target squared amplitude μ; the radius settles at `sqrt(mu)`.
    pub amplitude: [f64; LEG_COUNT],
    pub offset: [f64; LEG_COUNT],
    /// Base phase rate ω (rad/s).
    pub angular_frequency: [f64; LEG_COUNT],
    /// Stance fraction d of each cycle, strictly inside (0, 1).
    pub duty_factor: [f64; LEG_COUNT],
    pub coupling: CouplingMatrix,
}

impl CpgParams {
    /// Build from per-leg slices, rejecting any slice that is not one value per leg.
    pub fn from_slices(
        amplitude: &[f64],
        offset: &[f64],
        angular_frequency: &[f64],
        duty_factor: &[f64],
        coupling: CouplingMatrix,
    ) -> Result<Self> {
        fn per_leg(name: &'static str, values: &[f64]) -> Result<[f64; LEG_COUNT]> {
            values.try_into().map_err(|_| {
                CpgError::configuration(
                    name,
                    format!("expected {LEG_COUNT} values, got {}", values.len()),
                )
            })
        }

        let params = Self {
            amplitude: per_leg("amplitude", amplitude)?,
            offset: per_leg("offset", offset)?,
            angular_frequency: per_leg("angular_frequency", angular_frequency)?,
            duty_factor: per_leg("duty_factor", duty_factor)?,
            coupling,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        for leg in Leg::ALL {
            let i = leg.index();
            let mu = self.amplitude[i];
            if !mu.is_finite() || mu < 0.0 {
                return Err(CpgError::leg_configuration(
                    "amplitude",
                    leg,
                    format!("must be finite and >= 0, got {mu}"),
                ));
            }
            if !self.offset[i].is_finite() {
                return Err(CpgError::leg_configuration("offset", leg, "must be finite"));
            }
            let omega = self.angular_frequency[i];
            if !omega.is_finite() || omega < 0.0 {
                return Err(CpgError::leg_configuration(
                    "angular_frequency",
                    leg,
                    format!("must be finite and >= 0, got {omega}"),
                ));
            }
            let d = self.duty_factor[i];
            if !(d.is_finite() && 0.0 < d && d < 1.0) {
                return Err(CpgError::leg_configuration(
                    "duty_factor",
                    leg,
                    format!("must be in (0, 1), got {d}"),
                ));
            }
        }
        Ok(())
    }
}

/// Four coupled Hopf-like oscillators producing shaped joint commands.
///
/// One instance drives one trial. It is advanced in place and is not meant to
/// be shared between threads; parallel trials each build their own.
#[derive(Debug, Clone)]
pub struct OscillatorNetwork {
    cfg: CpgConfig,
    params: CpgParams,
    legs: NetworkState,
    steps: u64,
    last_query: Option<f64>,
}

impl OscillatorNetwork {
    pub fn new(params: CpgParams, cfg: CpgConfig) -> Result<Self> {
        cfg.validate()?;
        params.validate()?;
        check_stiffness(&params, &cfg)?;

        let mut net = Self {
            cfg,
            params,
            legs: [LegState::default(); LEG_COUNT],
            steps: 0,
            last_query: None,
        };
        net.reset();

        debug!(
            dt = cfg.dt,
            gain = cfg.gain,
            integrator = ?cfg.integrator,
            "oscillator network constructed"
        );
        Ok(net)
    }

    /// Return every leg to its starting state and forget the query history.
    pub fn reset(&mut self) {
        for leg in Leg::ALL {
            let i = leg.index();
            self.legs[i] = LegState {
                radius: self.cfg.initial_radius,
                phase: self.cfg.phase_seed.initial_phase(self.params.duty_factor[i]),
                offset: self.params.offset[i],
            };
        }
        self.steps = 0;
        self.last_query = None;
    }

    pub fn config(&self) -> &CpgConfig {
        &self.cfg
    }

    pub fn params(&self) -> &CpgParams {
        &self.params
    }

    pub fn legs(&self) -> &[LegState; LEG_COUNT] {
        &self.legs
    }

    pub fn leg(&self, leg: Leg) -> &LegState {
        &self.legs[leg.index()]
    }

    pub fn steps_taken(&self) -> u64 {
        self.steps
    }

    /// Simulated time covered by the steps taken so far.
    pub fn time(&self) -> f64 {
        self.steps as f64 * self.cfg.dt
    }

    /// Shaped commands for the current state.
    pub fn actions(&self) -> [f64; LEG_COUNT] {
        let mut out = [0.0; LEG_COUNT];
        for (i, a) in out.iter_mut().enumerate() {
            let s = &self.legs[i];
            *a = shaped_output(s.radius, s.phase, s.offset, self.params.duty_factor[i]);
        }
        out
    }

    /// Advance all legs by one `dt` (open loop).
    pub fn step(&mut self) -> Result<()> {
        self.step_modulated(&Modulation::ZERO)
    }

    /// Advance all legs by one `dt` with modulation derived from `forces`.
    pub fn step_closed_loop<F: Feedback + ?Sized>(
        &mut self,
        forces: &[f64; LEG_COUNT],
        feedback: &mut F,
    ) -> Result<()> {
        let m = feedback.modulation(forces);
        self.step_modulated(&m)
    }

    fn step_modulated(&mut self, m: &Modulation) -> Result<()> {
        let dt = self.cfg.dt;
        let s = self.legs;
        self.legs = match self.cfg.integrator {
            Integrator::Euler => {
                let d = self.derivative(&s, m);
                add_scaled(&s, &d, dt)
            }
            Integrator::Rk4 => {
                let k1 = self.derivative(&s, m);
                let k2 = self.derivative(&add_scaled(&s, &k1, 0.5 * dt), m);
                let k3 = self.derivative(&add_scaled(&s, &k2, 0.5 * dt), m);
                let k4 = self.derivative(&add_scaled(&s, &k3, dt), m);
                let mut next = s;
                for i in 0..LEG_COUNT {
                    let avg = LegState {
                        radius: k1[i].radius + 2.0 * k2[i].radius + 2.0 * k3[i].radius + k4[i].radius,
                        phase: k1[i].phase + 2.0 * k2[i].phase + 2.0 * k3[i].phase + k4[i].phase,
                        offset: k1[i].offset + 2.0 * k2[i].offset + 2.0 * k3[i].offset + k4[i].offset,
                    };
                    next[i] = s[i].add_scaled(avg, dt / 6.0);
                }
                next
            }
        };
        self.steps += 1;

        if self.cfg.check_finite {
            self.check_finite()?;
        }
        Ok(())
    }

    /// State derivative. Every leg reads the same prior state `s`, so the
    /// update does not depend on the order legs are visited in.
    fn derivative(&self, s: &NetworkState, m: &Modulation) -> NetworkState {
        let phases = [s[0].phase, s[1].phase, s[2].phase, s[3].phase];
        let gains = &self.cfg.feedback_gains;
        let mut d = [LegState::default(); LEG_COUNT];
        for i in 0..LEG_COUNT {
            let r = s[i].radius;
            let mu = self.params.amplitude[i] + gains.radius[i] * m.radius[i];
            d[i] = LegState {
                radius: self.cfg.gain * (mu - r * r) * r,
                phase: self.params.angular_frequency[i]
                    + gains.phase[i] * m.phase[i]
                    + self.params.coupling.phase_pull(i, &phases),
                offset: gains.offset[i] * m.offset[i],
            };
        }
        d
    }

    fn check_finite(&self) -> Result<()> {
        for leg in Leg::ALL {
            let s = &self.legs[leg.index()];
            for (field, value) in [("radius", s.radius), ("phase", s.phase), ("offset", s.offset)] {
                if !value.is_finite() {
                    warn!(%leg, field, value, step = self.steps, "non-finite oscillator state");
                    return Err(CpgError::NumericalInstability {
                        leg,
                        field,
                        value,
                        step: self.steps,
                    });
                }
            }
        }
        Ok(())
    }

    /// Number of steps needed to reach query time `t`, validating monotonicity.
    fn steps_until(&mut self, t: f64) -> Result<u64> {
        let previous = self.last_query.unwrap_or_else(|| self.time());
        let non_monotonic = match self.last_query {
            Some(prev) => t <= prev,
            None => t < 0.0,
        };
        if !t.is_finite() || non_monotonic {
            return Err(CpgError::NonMonotonicTime {
                previous,
                requested: t,
            });
        }
        self.last_query = Some(t);
        let target = (t / self.cfg.dt).round() as u64;
        Ok(target.saturating_sub(self.steps))
    }

    /// Advance to simulated time `t` and return the shaped commands.
    ///
    /// Integration runs at `dt` regardless of how coarsely this is queried.
    /// `t` must strictly increase between calls.
    pub fn get_action(&mut self, t: f64) -> Result<[f64; LEG_COUNT]> {
        let n = self.steps_until(t)?;
        for _ in 0..n {
            self.step()?;
        }
        Ok(self.actions())
    }

    /// Closed-loop variant of `get_action`; modulation is re-evaluated every
    /// internal step from the same force reading.
    pub fn get_action_closed_loop<F: Feedback + ?Sized>(
        &mut self,
        t: f64,
        forces: &[f64; LEG_COUNT],
        feedback: &mut F,
    ) -> Result<[f64; LEG_COUNT]> {
        let n = self.steps_until(t)?;
        for _ in 0..n {
            self.step_closed_loop(forces, feedback)?;
        }
        Ok(self.actions())
    }

    /// Sample commands at `rate_hz` for `duration` seconds, starting at `1/rate_hz`.
    pub fn trace(&mut self, rate_hz: f64, duration: f64) -> Result<Vec<(f64, [f64; LEG_COUNT])>> {
        if !rate_hz.is_finite() || rate_hz <= 0.0 {
            return Err(CpgError::configuration(
                "rate",
                format!("must be finite and > 0, got {rate_hz}"),
            ));
        }
        if !duration.is_finite() || duration < 0.0 {
            return Err(CpgError::configuration(
                "duration",
                format!("must be finite and >= 0, got {duration}"),
            ));
        }
        let count = (duration * rate_hz).floor();
        if count > u32::MAX as f64 {
            return Err(CpgError::configuration(
                "duration",
                format!("{count} samples requested at {rate_hz} Hz"),
            ));
        }
        let start = self.last_query.unwrap_or(0.0);
        let samples = count as usize;
        let mut out = Vec::with_capacity(samples.min(MAX_TRACE_PREALLOC));
        for k in 1..=samples {
            let t = start + k as f64 / rate_hz;
            out.push((t, self.get_action(t)?));
        }
        Ok(out)
    }
}

/// Reject step sizes the chosen integrator cannot follow.
///
/// Near its fixed point the radius decays at rate `2·gain·mu`; the coupling
/// contributes at most `2·sum_j coupling[i][j]`.
fn check_stiffness(params: &CpgParams, cfg: &CpgConfig) -> Result<()> {
    let limit = cfg.integrator.stability_limit();
    for leg in Leg::ALL {
        let i = leg.index();
        let rate = 2.0 * cfg.gain * params.amplitude[i];
        let h = cfg.dt * rate;
        if h >= limit {
            return Err(CpgError::leg_configuration(
                "amplitude",
                leg,
                format!(
                    "dt * 2 * gain * amplitude = {h:.3} exceeds the {:?} stability limit {limit}; reduce dt or gain",
                    cfg.integrator
                ),
            ));
        }
        if h >= 0.5 * limit {
            warn!(%leg, h, limit, "integration step close to the stability limit");
        }
        let phase_step = cfg.dt * params.angular_frequency[i];
        if phase_step > COARSE_PHASE_STEP {
            warn!(%leg, phase_step, "coarse phase resolution per step");
        }
    }
    let coupling_h = cfg.dt * 2.0 * params.coupling.max_row_strength();
    if coupling_h >= limit {
        return Err(CpgError::configuration(
            "coupling",
            format!("dt * coupling rate = {coupling_h:.3} exceeds the stability limit {limit}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PhaseSeed;
    use crate::shaping::wrap_phase;
    use core::f64::consts::TAU;

    fn uniform(mu: f64, omega: f64, d: f64, coupling: CouplingMatrix) -> CpgParams {
        CpgParams {
            amplitude: [mu; LEG_COUNT],
            offset: [0.0; LEG_COUNT],
            angular_frequency: [omega; LEG_COUNT],
            duty_factor: [d; LEG_COUNT],
            coupling,
        }
    }

    #[test]
    fn radius_converges_to_sqrt_amplitude() {
        for integrator in [Integrator::Euler, Integrator::Rk4] {
            for mu in [0.25, 1.0, 4.0, 9.0] {
                let cfg = CpgConfig::default()
                    .with_gain(5.0)
                    .with_dt(1e-3)
                    .with_integrator(integrator);
                let mut net =
                    OscillatorNetwork::new(uniform(mu, TAU, 0.5, CouplingMatrix::uncoupled()), cfg)
                        .unwrap();
                for _ in 0..20_000 {
                    net.step().unwrap();
                }
                for s in net.legs() {
                    assert!(
                        (s.radius - mu.sqrt()).abs() < 1e-6,
                        "{integrator:?} mu={mu} r={}",
                        s.radius
                    );
                }
            }
        }
    }

    #[test]
    fn half_duty_output_is_plain_cosine() {
        let mut params = uniform(2.0, 3.0, 0.5, CouplingMatrix::from_offsets(0.3, 1.0, 2.0));
        params.offset = [0.5, -0.5, 1.0, 0.0];
        let mut net = OscillatorNetwork::new(params, CpgConfig::default()).unwrap();
        for _ in 0..1234 {
            net.step().unwrap();
        }
        let actions = net.actions();
        for (i, s) in net.legs().iter().enumerate() {
            assert_eq!(actions[i], s.radius * wrap_phase(s.phase).cos() + s.offset);
        }
    }

    #[test]
    fn boundary_duty_factors_are_rejected() {
        for d in [0.0, 1.0, -0.2, 1.5, f64::NAN] {
            let mut params = uniform(1.0, 1.0, 0.5, CouplingMatrix::uncoupled());
            params.duty_factor[2] = d;
            let err = OscillatorNetwork::new(params, CpgConfig::default()).unwrap_err();
            match err {
                CpgError::Configuration { parameter, leg, .. } => {
                    assert_eq!(parameter, "duty_factor");
                    assert_eq!(leg, Some(Leg::BackLeft));
                }
                other => panic!("unexpected error {other:?}"),
            }
        }
    }

    #[test]
    fn negative_frequency_and_amplitude_are_rejected() {
        let mut params = uniform(1.0, 1.0, 0.5, CouplingMatrix::uncoupled());
        params.angular_frequency[1] = -1.0;
        assert!(OscillatorNetwork::new(params, CpgConfig::default())
            .unwrap_err()
            .is_configuration());

        let mut params = uniform(1.0, 1.0, 0.5, CouplingMatrix::uncoupled());
        params.amplitude[3] = -0.1;
        assert!(OscillatorNetwork::new(params, CpgConfig::default()).is_err());
    }

    #[test]
    fn mismatched_slices_are_rejected() {
        let err = CpgParams::from_slices(
            &[1.0; 4],
            &[0.0; 3],
            &[1.0; 4],
            &[0.5; 4],
            CouplingMatrix::uncoupled(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("offset"));
        assert!(CpgParams::from_slices(
            &[1.0; 4],
            &[0.0; 4],
            &[1.0; 4],
            &[0.5; 4],
            CouplingMatrix::uncoupled()
        )
        .is_ok());
    }

    #[test]
    fn stiff_configurations_are_rejected() {
        let params = uniform(900.0, TAU, 0.5, CouplingMatrix::uncoupled());
        let cfg = CpgConfig::default().with_gain(5.0).with_dt(1e-3);
        let err = OscillatorNetwork::new(params.clone(), cfg).unwrap_err();
        assert!(err.to_string().contains("stability"));
        // Same oscillator is fine with the slower simulation gain.
        assert!(OscillatorNetwork::new(params, CpgConfig::default()).is_ok());
    }

    #[test]
    fn legs_update_from_the_same_prior_state() {
        let params = uniform(1.0, 2.0, 0.4, CouplingMatrix::from_offsets(0.5, 1.5, 2.5));
        let cfg = CpgConfig::default()
            .with_dt(1e-2)
            .with_phase_seed(PhaseSeed::Constant(0.0));
        let mut net = OscillatorNetwork::new(params.clone(), cfg).unwrap();
        // Desynchronize the legs first.
        net.legs[1].phase = 0.7;
        net.legs[2].phase = -0.4;
        net.legs[3].phase = 2.0;

        let before = net.legs;
        let phases = [before[0].phase, before[1].phase, before[2].phase, before[3].phase];
        net.step().unwrap();

        for i in 0..LEG_COUNT {
            let expected = before[i].phase + 1e-2 * (2.0 + params.coupling.phase_pull(i, &phases));
            assert_eq!(net.legs[i].phase, expected);
        }
    }

    #[test]
    fn get_action_substeps_to_query_time() {
        let params = uniform(1.0, TAU, 0.5, CouplingMatrix::bound(1.0));
        let mut net = OscillatorNetwork::new(params, CpgConfig::default()).unwrap();
        net.get_action(0.0).unwrap();
        assert_eq!(net.steps_taken(), 0);
        net.get_action(0.01).unwrap();
        assert_eq!(net.steps_taken(), 10);
        net.get_action(0.0206).unwrap();
        assert_eq!(net.steps_taken(), 21);
        net.get_action(0.02061).unwrap();
        assert_eq!(net.steps_taken(), 21);
    }

    #[test]
    fn non_increasing_queries_fail_loudly() {
        let params = uniform(1.0, TAU, 0.5, CouplingMatrix::bound(1.0));
        let mut net = OscillatorNetwork::new(params, CpgConfig::default()).unwrap();
        net.get_action(0.5).unwrap();
        assert!(matches!(
            net.get_action(0.5),
            Err(CpgError::NonMonotonicTime { .. })
        ));
        assert!(net.get_action(0.2).is_err());
        assert!(net.get_action(f64::NAN).is_err());

        net.reset();
        assert!(net.get_action(-0.1).is_err());
        assert!(net.get_action(0.1).is_ok());
    }

    #[test]
    fn replay_is_bit_identical() {
        let params = uniform(4.0, 5.0, 0.3, CouplingMatrix::from_offsets(0.1, 3.0, 3.1));
        let cfg = CpgConfig::default().with_integrator(Integrator::Rk4);
        let mut a = OscillatorNetwork::new(params.clone(), cfg).unwrap();
        let mut b = OscillatorNetwork::new(params, cfg).unwrap();
        for k in 1..300 {
            let t = k as f64 * 0.013;
            assert_eq!(a.get_action(t).unwrap(), b.get_action(t).unwrap());
        }
        a.reset();
        let first = a.get_action(0.013).unwrap();
        let mut c = b.clone();
        c.reset();
        assert_eq!(first, c.get_action(0.013).unwrap());
    }

    #[test]
    fn rk4_tracks_the_exact_radius_better_than_euler() {
        let (mu, gain, r0, t_end): (f64, f64, f64, f64) = (4.0, 5.0, 1.0, 0.1);
        let exact = (mu / (1.0 + (mu / (r0 * r0) - 1.0) * (-2.0 * gain * mu * t_end).exp())).sqrt();

        let mut errors = Vec::new();
        for integrator in [Integrator::Euler, Integrator::Rk4] {
            let cfg = CpgConfig::default()
                .with_gain(gain)
                .with_dt(1e-2)
                .with_integrator(integrator);
            let mut net =
                OscillatorNetwork::new(uniform(mu, 1.0, 0.5, CouplingMatrix::uncoupled()), cfg)
                    .unwrap();
            net.get_action(t_end).unwrap();
            errors.push((net.legs()[0].radius - exact).abs());
        }
        assert!(errors[1] < errors[0] * 0.1, "{errors:?}");
    }

    struct Runaway;

    impl Feedback for Runaway {
        fn modulation(&mut self, _forces: &[f64; LEG_COUNT]) -> Modulation {
            let mut m = Modulation::ZERO;
            m.offset[1] = f64::INFINITY;
            m
        }
    }

    #[test]
    fn non_finite_state_is_reported() {
        let params = uniform(1.0, 1.0, 0.5, CouplingMatrix::uncoupled());
        let mut net = OscillatorNetwork::new(params, CpgConfig::default()).unwrap();
        let err = net.step_closed_loop(&[0.0; 4], &mut Runaway).unwrap_err();
        match err {
            CpgError::NumericalInstability { leg, field, step, .. } => {
                assert_eq!(leg, Leg::FrontRight);
                assert_eq!(field, "offset");
                assert_eq!(step, 1);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn open_loop_feedback_matches_open_loop_step() {
        let params = uniform(2.0, 4.0, 0.6, CouplingMatrix::bound(0.8));
        let mut a = OscillatorNetwork::new(params.clone(), CpgConfig::default()).unwrap();
        let mut b = OscillatorNetwork::new(params, CpgConfig::default()).unwrap();
        let mut open = crate::feedback::OpenLoop;
        for k in 1..50 {
            let t = k as f64 * 0.02;
            assert_eq!(
                a.get_action(t).unwrap(),
                b.get_action_closed_loop(t, &[1.0, 2.0, 3.0, 4.0], &mut open)
                    .unwrap()
            );
        }
        // Offsets never move without modulation.
        assert_eq!(a.legs()[0].offset, 0.0);
    }

    #[test]
    fn feedback_modulates_offset() {
        struct Push;
        impl Feedback for Push {
            fn modulation(&mut self, forces: &[f64; LEG_COUNT]) -> Modulation {
                let mut m = Modulation::ZERO;
                m.offset = *forces;
                m
            }
        }
        let params = uniform(1.0, 1.0, 0.5, CouplingMatrix::uncoupled());
        let mut net = OscillatorNetwork::new(params, CpgConfig::default()).unwrap();
        net.get_action_closed_loop(1.0, &[1.0, 0.0, -1.0, 2.0], &mut Push)
            .unwrap();
        let offsets: Vec<f64> = net.legs().iter().map(|s| s.offset).collect();
        assert!((offsets[0] - 1.0).abs() < 1e-9);
        assert_eq!(offsets[1], 0.0);
        assert!((offsets[2] + 1.0).abs() < 1e-9);
        assert!((offsets[3] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn trace_samples_at_the_requested_rate() {
        let params = uniform(1.0, TAU, 0.5, CouplingMatrix::bound(0.0));
        let mut net = OscillatorNetwork::new(params, CpgConfig::default()).unwrap();
        let samples = net.trace(100.0, 1.0).unwrap();
        assert_eq!(samples.len(), 100);
        assert!((samples[99].0 - 1.0).abs() < 1e-12);
        assert_eq!(net.steps_taken(), 1000);
        assert!(net.trace(0.0, 1.0).is_err());
    }

    #[test]
    fn trace_rejects_unbounded_durations() {
        let params = uniform(1.0, TAU, 0.5, CouplingMatrix::bound(0.0));
        let mut net = OscillatorNetwork::new(params, CpgConfig::default()).unwrap();
        for duration in [f64::INFINITY, f64::NAN, -1.0, 1e30] {
            let err = net.trace(100.0, duration).unwrap_err();
            assert!(err.to_string().contains("duration"), "{err}");
        }
        assert_eq!(net.steps_taken(), 0);
        assert!(net.trace(100.0, 0.0).unwrap().is_empty());
    }

    #[test]
    fn leg_names() {
        assert_eq!(Leg::BackRight.to_string(), "back-right");
        assert!(Leg::FrontRight.is_front());
        assert!(!Leg::BackLeft.is_front());
        assert_eq!(Leg::ALL.map(Leg::index), [0, 1, 2, 3]);
    }
}
