//! Propagation of charged-particle tracks through magnetic fields.

pub mod stepping;

use self::stepping::{RK4Stepper3, RK4StepperConfig};
use crate::{
    error::{PropagationError, PropagationResult},
    field::MagneticField3,
    geometry::{Point3, Vec3},
};
use log::debug;
use serde::Serialize;

/// Floating-point precision to use for propagation.
#[allow(non_camel_case_types)]
pub type fpr = f64;

/// An immutable snapshot of the particle state after an accepted step.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PathSample3 {
    /// Position of the particle.
    pub position: Point3<fpr>,
    /// Unit direction of travel at the position.
    pub direction: Vec3<fpr>,
}

/// Reason for terminating propagation.
#[derive(Copy, Clone, PartialEq, Debug, Serialize)]
pub enum StoppingCause {
    BudgetReached,
    OutOfBounds,
}

/// An ordered sequence of path samples produced by propagating a track.
#[derive(Clone, Debug, Serialize)]
pub struct Trajectory3 {
    /// One sample per accepted integration step, in the order produced.
    pub samples: Vec<PathSample3>,
    /// Total accumulated path length.
    pub total_path_length: fpr,
    /// Why the propagation terminated.
    pub stopping_cause: StoppingCause,
}

/// Configuration parameters for track propagation.
#[derive(Clone, Debug)]
pub struct PropagatorConfig {
    /// Configuration parameters for the adaptive stepper.
    pub stepper: RK4StepperConfig,
    /// Total path length after which propagation stops.
    pub target_path_length: fpr,
}

impl PropagatorConfig {
    pub const DEFAULT_TARGET_PATH_LENGTH: fpr = 1000.0;
}

impl Default for PropagatorConfig {
    fn default() -> Self {
        PropagatorConfig {
            stepper: RK4StepperConfig::default(),
            target_path_length: Self::DEFAULT_TARGET_PATH_LENGTH,
        }
    }
}

/// Propagates a charged-particle track through the given magnetic field
/// until the path-length budget is exhausted.
///
/// # Parameters
///
/// - `field`: Magnetic field to propagate through.
/// - `start_position`: Position where the propagation should start.
/// - `start_direction`: Initial direction of travel (normalized internally).
/// - `momentum`: Magnitude of the particle momentum.
/// - `charge`: Particle charge in elementary charge units.
/// - `config`: Configuration parameters for the propagation.
///
/// # Returns
///
/// A `Result<Trajectory3, PropagationError>` which is either:
///
/// - `Ok`: The traced trajectory, one sample per accepted step.
/// - `Err`: The start state was invalid or a step failed to converge.
pub fn propagate(
    field: &dyn MagneticField3<fpr>,
    start_position: &Point3<fpr>,
    start_direction: &Vec3<fpr>,
    momentum: fpr,
    charge: fpr,
    config: &PropagatorConfig,
) -> PropagationResult<Trajectory3> {
    propagate_bounded(
        field,
        start_position,
        start_direction,
        momentum,
        charge,
        config,
        |_| true,
    )
}

/// Propagates a charged-particle track like [`propagate`], but truncates
/// the trajectory once the given predicate reports that the current
/// position is out of bounds.
pub fn propagate_bounded<C>(
    field: &dyn MagneticField3<fpr>,
    start_position: &Point3<fpr>,
    start_direction: &Vec3<fpr>,
    momentum: fpr,
    charge: fpr,
    config: &PropagatorConfig,
    mut inbounds: C,
) -> PropagationResult<Trajectory3>
where
    C: FnMut(&Point3<fpr>) -> bool,
{
    let mut stepper = RK4Stepper3::new(
        start_position,
        start_direction,
        momentum,
        charge,
        config.stepper.clone(),
    )?;

    debug!(
        "Propagating track with momentum {} and charge {} from {}",
        momentum, charge, start_position
    );

    let mut samples = Vec::new();
    let mut stopping_cause = StoppingCause::BudgetReached;

    while stepper.path_length() < config.target_path_length {
        stepper.step(field)?;
        samples.push(PathSample3 {
            position: stepper.position().clone(),
            direction: stepper.direction().clone(),
        });
        if !inbounds(stepper.position()) {
            stopping_cause = StoppingCause::OutOfBounds;
            break;
        }
    }

    debug!(
        "Propagation terminated after {} samples at path length {} ({:?})",
        samples.len(),
        stepper.path_length(),
        stopping_cause
    );

    Ok(Trajectory3 {
        samples,
        total_path_length: stepper.path_length(),
        stopping_cause,
    })
}

/// Start kinematics for a propagation.
#[derive(Clone, Debug)]
pub struct TrackStart3 {
    pub position: Point3<fpr>,
    pub direction: Vec3<fpr>,
    pub momentum: fpr,
    pub charge: fpr,
}

/// Converts perigee track parameters `(d0, z0, phi, theta, q/p)` into
/// start kinematics for the propagator.
pub fn start_from_perigee(
    d0: fpr,
    z0: fpr,
    phi: fpr,
    theta: fpr,
    qop: fpr,
) -> PropagationResult<TrackStart3> {
    if qop == 0.0 || !qop.is_finite() {
        return Err(PropagationError::InvalidKinematics(format!(
            "curvature parameter q/p must be finite and non-zero, got {}",
            qop
        )));
    }
    let momentum = qop.recip().abs();
    let charge = (momentum * qop).round();

    let position = Point3::new(-d0 * phi.sin(), d0 * phi.cos(), z0);
    let mut direction = Vec3::new(
        phi.cos() * theta.sin(),
        phi.sin() * theta.sin(),
        theta.cos(),
    );
    direction.normalize();

    Ok(TrackStart3 {
        position,
        direction,
        momentum,
        charge,
    })
}
