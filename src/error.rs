//! Error types for trajectory propagation.

use thiserror::Error;

/// Errors that can occur while propagating a track.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PropagationError {
    /// The initial kinematic state cannot be integrated.
    #[error("Invalid kinematics: {0}")]
    InvalidKinematics(String),

    /// Step-size halving failed to bring the local error estimate
    /// below the tolerance within the configured number of attempts.
    #[error(
        "Step did not converge after {attempts} attempts (error estimate {error_estimate}, \
         step size {step_size})"
    )]
    NonConvergentStep {
        attempts: u32,
        error_estimate: f64,
        step_size: f64,
    },
}

pub type PropagationResult<T> = Result<T, PropagationError>;
