//! Error types for oscillator construction, integration and persistence.

use thiserror::Error;

use crate::oscillator::Leg;

/// Errors raised by the CPG core.
#[derive(Debug, Error)]
pub enum CpgError {
    /// Invalid oscillator or decoder configuration. Raised at decode/construct time.
    #[error("Configuration error in {parameter}{}: {message}", leg_suffix(.leg))]
    Configuration {
        /// Name of the offending parameter.
        parameter: &'static str,
        /// Leg the parameter belongs to, when it is per-leg.
        leg: Option<Leg>,
        /// Description of the violation.
        message: String,
    },

    /// Genome has a length no decoder mode accepts.
    #[error("Genome length mismatch: expected {expected}, actual {actual}")]
    GenomeLength {
        expected: &'static str,
        actual: usize,
    },

    /// Oscillator state became non-finite after an integration step.
    #[error("Numerical instability at step {step}: {field} of {leg} is {value}")]
    NumericalInstability {
        leg: Leg,
        field: &'static str,
        value: f64,
        step: u64,
    },

    /// `get_action` was queried with a time that does not advance.
    #[error("Non-monotonic query time: previous {previous}, requested {requested}")]
    NonMonotonicTime { previous: f64, requested: f64 },

    /// Bound or parameter vectors disagree in length.
    #[error("Bounds mismatch: expected {expected} values, actual {actual}")]
    BoundsMismatch { expected: usize, actual: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn leg_suffix(leg: &Option<Leg>) -> String {
    match leg {
        Some(leg) => format!(" ({leg})"),
        None => String::new(),
    }
}

impl CpgError {
    /// Create a Configuration error not tied to a leg.
    pub fn configuration(parameter: &'static str, message: impl Into<String>) -> Self {
        Self::Configuration {
            parameter,
            leg: None,
            message: message.into(),
        }
    }

    /// Create a Configuration error for one leg.
    pub fn leg_configuration(parameter: &'static str, leg: Leg, message: impl Into<String>) -> Self {
        Self::Configuration {
            parameter,
            leg: Some(leg),
            message: message.into(),
        }
    }

    /// True for errors raised while validating configuration or genomes.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. } | Self::GenomeLength { .. } | Self::BoundsMismatch { .. }
        )
    }
}

pub type Result<T> = core::result::Result<T, CpgError>;
