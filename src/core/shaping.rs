//! Duty-cycle waveform shaping.
//!
//! The raw oscillator phase is not fed to `cos` directly. Each cycle is split
//! so that the first `2π·d` of phase covers `[0, π]` (stance, the descending
//! half of the cosine) and the remaining `2π·(1-d)` covers `[π, 2π]` (swing).
//! At `d = 0.5` the map is the identity on `[0, 2π)`.

use core::f64::consts::TAU;

/// Type alias for oscillator phases (radians, unbounded).
pub type Phase = f64;

/// Wrap a phase into `[0, 2π)`.
#[inline]
pub fn wrap_phase(phase: Phase) -> Phase {
    let w = phase.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs.
    if w >= TAU {
        0.0
    } else {
        w
    }
}

/// Map a raw phase to the shaped phase for duty factor `d` in `(0, 1)`.
#[inline]
pub fn shape_phase(phase: Phase, duty_factor: f64) -> Phase {
    let p = wrap_phase(phase);
    if p < TAU * duty_factor {
        p / (2.0 * duty_factor)
    } else {
        (p + TAU * (1.0 - 2.0 * duty_factor)) / (2.0 * (1.0 - duty_factor))
    }
}

/// Shaped oscillator output: `r·cos(shape(φ)) + o`.
#[inline]
pub fn shaped_output(radius: f64, phase: Phase, offset: f64, duty_factor: f64) -> f64 {
    radius * shape_phase(phase, duty_factor).cos() + offset
}
