//! Physical constants and unit conversions.

/// Floating-point precision to use for constants.
#[allow(non_camel_case_types)]
pub type fcn = f64;

/// Conversion constant coupling the magnetic field [T] to the track
/// equation of motion, the reciprocal of 0.3 GeV/(c T m) in the
/// rule-of-thumb bending formula p = 0.3 B R.
pub const FIELD_TO_CURVATURE: fcn = 3.3333;
