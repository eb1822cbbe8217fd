//! Adaptive Runge-Kutta stepping of charged-particle tracks.
//!
//! The stepper advances the particle state with a classical 4th-order
//! Runge-Kutta scheme specialized for magnetic bending, where the
//! acceleration is the cross product of the travel direction and the
//! local field scaled by the charge-to-momentum ratio. The step size is
//! halved until the local error estimate falls below the tolerance.

use super::fpr;
use crate::{
    constants::FIELD_TO_CURVATURE,
    error::{PropagationError, PropagationResult},
    field::MagneticField3,
    geometry::{Point3, Vec3},
};
use log::trace;

/// Configuration parameters for RK4 steppers.
#[derive(Clone, Debug)]
pub struct RK4StepperConfig {
    /// Largest allowed step length, or `None` for no restriction.
    pub max_step_size: Option<fpr>,
    /// Local error estimate above which a step attempt is rejected.
    pub error_tolerance: fpr,
    /// Maximum number of step attempts before a step is abandoned.
    pub max_step_attempts: u32,
    /// Conversion constant from field units to the equation-of-motion
    /// unit system.
    pub unit_conversion: fpr,
}

#[derive(Clone, Debug)]
struct IntegrationState3 {
    /// Current position of the particle.
    position: Point3<fpr>,
    /// Unit direction of travel at the current position.
    direction: Vec3<fpr>,
    /// Magnitude of the particle momentum, fixed for the whole propagation.
    momentum: fpr,
    /// Particle charge in elementary charge units, fixed for the whole
    /// propagation.
    charge: fpr,
    /// Step length to use as the starting guess for the next step.
    step_size: fpr,
    /// Accumulated path length of all accepted steps.
    path_length: fpr,
}

#[derive(Clone, Debug)]
struct StepAttempt3 {
    k2: Vec3<fpr>,
    k3: Vec3<fpr>,
    k4: Vec3<fpr>,
    error_estimate: fpr,
}

/// A stepper advancing a charged particle through a magnetic field using
/// an adaptive 4th-order Runge-Kutta scheme.
#[derive(Clone, Debug)]
pub struct RK4Stepper3 {
    config: RK4StepperConfig,
    state: IntegrationState3,
}

impl RK4Stepper3 {
    /// Creates a new stepper for the given start kinematics.
    ///
    /// The start direction is normalized before integration. Returns an
    /// `InvalidKinematics` error if the momentum is zero or non-finite,
    /// or if the direction has zero magnitude.
    pub fn new(
        position: &Point3<fpr>,
        direction: &Vec3<fpr>,
        momentum: fpr,
        charge: fpr,
        config: RK4StepperConfig,
    ) -> PropagationResult<Self> {
        config.validate();

        if momentum == 0.0 || !momentum.is_finite() {
            return Err(PropagationError::InvalidKinematics(format!(
                "momentum must be finite and non-zero, got {}",
                momentum
            )));
        }
        if direction.is_zero() {
            return Err(PropagationError::InvalidKinematics(
                "start direction must have non-zero magnitude".to_string(),
            ));
        }

        let mut direction = direction.clone();
        direction.normalize();

        let step_size = config
            .max_step_size
            .unwrap_or(RK4StepperConfig::DEFAULT_INITIAL_STEP_SIZE);

        Ok(RK4Stepper3 {
            config,
            state: IntegrationState3 {
                position: position.clone(),
                direction,
                momentum,
                charge,
                step_size,
                path_length: 0.0,
            },
        })
    }

    /// Returns a reference to the current stepper position.
    pub fn position(&self) -> &Point3<fpr> {
        &self.state.position
    }

    /// Returns a reference to the current direction of travel.
    pub fn direction(&self) -> &Vec3<fpr> {
        &self.state.direction
    }

    /// Returns the accumulated path length of all accepted steps.
    pub fn path_length(&self) -> fpr {
        self.state.path_length
    }

    /// Returns the step length that will be used as the starting guess
    /// for the next step.
    pub fn step_size(&self) -> fpr {
        self.state.step_size
    }

    /// Advances the state by one accepted step, halving the step size
    /// until the local error estimate is within tolerance.
    ///
    /// # Returns
    ///
    /// A `Result<fpr, PropagationError>` which is either:
    ///
    /// - `Ok`: The accepted step length, the path-length contribution of
    ///   this step.
    /// - `Err`: The error estimate did not fall below the tolerance
    ///   within the configured number of attempts.
    pub fn step(&mut self, field: &dyn MagneticField3<fpr>) -> PropagationResult<fpr> {
        let config = &self.config;
        let state = &mut self.state;

        if let Some(max_step_size) = config.max_step_size {
            state.step_size = fpr::min(state.step_size, max_step_size);
        }

        let qop = state.charge / (config.unit_conversion * state.momentum);

        // First evaluation point, at the current position
        let field_first = field.sample(&state.position);
        let k1 = state.direction.cross(&field_first) * qop;

        let mut attempt = Self::attempt_step(
            field,
            &state.position,
            &state.direction,
            &k1,
            qop,
            state.step_size,
        );
        let mut attempts = 1;

        while attempt.error_estimate > config.error_tolerance {
            if attempts >= config.max_step_attempts {
                return Err(PropagationError::NonConvergentStep {
                    attempts,
                    error_estimate: attempt.error_estimate,
                    step_size: state.step_size,
                });
            }
            state.step_size *= 0.5;
            trace!(
                "Step rejected with error estimate {}, retrying with step size {}",
                attempt.error_estimate,
                state.step_size
            );
            attempt = Self::attempt_step(
                field,
                &state.position,
                &state.direction,
                &k1,
                qop,
                state.step_size,
            );
            attempts += 1;
        }

        let h = state.step_size;
        let h2 = h * h;

        state.position = &state.position
            + (&state.direction * h + (&k1 + &attempt.k2 + &attempt.k3) * (h2 / 6.0));
        state.direction = &state.direction
            + (&k1 + &attempt.k2 * 2.0 + &attempt.k3 * 2.0 + &attempt.k4) * (h / 6.0);
        state.direction.normalize();
        state.path_length += h;

        Ok(h)
    }

    /// Evaluates the three remaining Runge-Kutta stages for a trial step
    /// length and estimates the local error.
    fn attempt_step(
        field: &dyn MagneticField3<fpr>,
        position: &Point3<fpr>,
        direction: &Vec3<fpr>,
        k1: &Vec3<fpr>,
        qop: fpr,
        h: fpr,
    ) -> StepAttempt3 {
        let h2 = h * h;
        let half_h = h * 0.5;

        // Second evaluation point, at the midpoint of the trial step;
        // the field sample is reused for the third stage
        let position_middle = position + (direction * half_h + k1 * (h2 / 8.0));
        let field_middle = field.sample(&position_middle);
        let k2 = (direction + k1 * half_h).cross(&field_middle) * qop;
        let k3 = (direction + &k2 * half_h).cross(&field_middle) * qop;

        // Last evaluation point, at the end of the trial step
        let position_last = position + (direction * h + &k3 * (h2 / 2.0));
        let field_last = field.sample(&position_last);
        let k4 = (direction + &k3 * h).cross(&field_last) * qop;

        // The L1 norm is deliberately used over the Euclidean norm to
        // keep the rejection test cheap
        let error_estimate = h * (k1 - &k2 - &k3 + &k4).l1_norm();

        StepAttempt3 {
            k2,
            k3,
            k4,
            error_estimate,
        }
    }
}

impl RK4StepperConfig {
    pub const DEFAULT_ERROR_TOLERANCE: fpr = 2.0e-4;
    pub const DEFAULT_MAX_STEP_ATTEMPTS: u32 = 64;
    pub const DEFAULT_INITIAL_STEP_SIZE: fpr = 1000.0;
    pub const DEFAULT_UNIT_CONVERSION: fpr = FIELD_TO_CURVATURE;

    fn validate(&self) {
        if let Some(max_step_size) = self.max_step_size {
            assert!(
                max_step_size > 0.0,
                "Maximum step size must be larger than zero."
            );
        }
        assert!(
            self.error_tolerance > 0.0,
            "Error tolerance must be larger than zero."
        );
        assert!(
            self.max_step_attempts > 0,
            "Maximum number of step attempts must be larger than zero."
        );
        assert!(
            self.unit_conversion > 0.0,
            "Unit conversion constant must be larger than zero."
        );
    }
}

impl Default for RK4StepperConfig {
    fn default() -> Self {
        RK4StepperConfig {
            max_step_size: None,
            error_tolerance: Self::DEFAULT_ERROR_TOLERANCE,
            max_step_attempts: Self::DEFAULT_MAX_STEP_ATTEMPTS,
            unit_conversion: Self::DEFAULT_UNIT_CONVERSION,
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::field::UniformField3;
    use crate::geometry::Dim3::{X, Y, Z};
    use approx::assert_abs_diff_eq;

    fn unit_track_stepper(config: RK4StepperConfig) -> RK4Stepper3 {
        RK4Stepper3::new(
            &Point3::origin(),
            &Vec3::new(1.0, 0.0, 0.0),
            1.0,
            1.0,
            config,
        )
        .unwrap()
    }

    #[test]
    fn accepted_step_size_matches_known_value() {
        // For unit momentum, charge and conversion constant in a field of
        // strength 2 along z, halving from 1 must settle on 2^-5
        let field = UniformField3::solenoidal(2.0);
        let mut stepper = unit_track_stepper(RK4StepperConfig {
            max_step_size: Some(1.0),
            unit_conversion: 1.0,
            ..RK4StepperConfig::default()
        });

        let accepted = stepper.step(&field).unwrap();
        assert_eq!(accepted, 0.03125);
        assert_eq!(stepper.path_length(), 0.03125);
        assert_eq!(stepper.step_size(), 0.03125);
    }

    #[test]
    fn step_in_zero_field_is_translation_along_direction() {
        let field = UniformField3::<fpr>::zero();
        let mut stepper = unit_track_stepper(RK4StepperConfig {
            max_step_size: Some(5.0),
            ..RK4StepperConfig::default()
        });

        let accepted = stepper.step(&field).unwrap();
        assert_eq!(accepted, 5.0);
        assert_eq!(stepper.position(), &Point3::new(5.0, 0.0, 0.0));
        assert_eq!(stepper.direction(), &Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn direction_is_unit_length_after_each_step() {
        let field = UniformField3::new(Vec3::new(0.0, 1.5, 2.0));
        let mut stepper = unit_track_stepper(RK4StepperConfig::default());

        for _ in 0..10 {
            stepper.step(&field).unwrap();
            assert_abs_diff_eq!(stepper.direction().length(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn shrunk_step_size_is_kept_for_the_next_step() {
        let field = UniformField3::solenoidal(2.0);
        let mut stepper = unit_track_stepper(RK4StepperConfig {
            max_step_size: Some(1.0),
            unit_conversion: 1.0,
            ..RK4StepperConfig::default()
        });

        stepper.step(&field).unwrap();
        let shrunk = stepper.step_size();
        stepper.step(&field).unwrap();
        assert_eq!(stepper.step_size(), shrunk);
        assert_abs_diff_eq!(stepper.path_length(), 2.0 * shrunk, epsilon = 1e-15);
    }

    #[test]
    fn pathological_field_reports_non_convergence() {
        let field = UniformField3::new(Vec3::new(0.0, 0.0, 1e30));
        let mut stepper = unit_track_stepper(RK4StepperConfig::default());

        let result = stepper.step(&field);
        assert!(matches!(
            result,
            Err(PropagationError::NonConvergentStep { .. })
        ));
        // A failed step must not advance the particle
        assert_eq!(stepper.path_length(), 0.0);
        assert_eq!(stepper.position(), &Point3::origin());
    }

    #[test]
    fn first_accepted_sample_matches_known_trajectory() {
        // Unit momentum and charge in a field of strength 2 along z,
        // with the default conversion constant and step-size guess
        let field = UniformField3::solenoidal(2.0);
        let mut stepper = RK4Stepper3::new(
            &Point3::origin(),
            &Vec3::new(1.0, 0.0, 0.0),
            1.0,
            1.0,
            RK4StepperConfig::default(),
        )
        .unwrap();

        let accepted = stepper.step(&field).unwrap();
        assert_eq!(accepted, 0.1220703125);
        assert_abs_diff_eq!(stepper.position()[X], 0.12196117095296723, epsilon = 1e-9);
        assert_abs_diff_eq!(stepper.position()[Y], -0.00446839460068735, epsilon = 1e-9);
        assert_eq!(stepper.position()[Z], 0.0);
        assert_abs_diff_eq!(stepper.direction()[X], 0.9973189374974512, epsilon = 1e-9);
        assert_abs_diff_eq!(stepper.direction()[Y], -0.07317743442452403, epsilon = 1e-9);
        assert_eq!(stepper.direction()[Z], 0.0);
    }

    #[test]
    fn zero_momentum_is_rejected_at_construction() {
        let result = RK4Stepper3::new(
            &Point3::origin(),
            &Vec3::new(1.0, 0.0, 0.0),
            0.0,
            1.0,
            RK4StepperConfig::default(),
        );
        assert!(matches!(
            result,
            Err(PropagationError::InvalidKinematics(_))
        ));
    }
}
