//! Magnetic field models sampled during propagation.

use crate::geometry::{Point3, Vec3};
use crate::num::PFloat;

/// Defines the properties of a magnetic field that can be sampled
/// at arbitrary positions.
pub trait MagneticField3<F: PFloat> {
    /// Returns the field vector at the given position.
    fn sample(&self, position: &Point3<F>) -> Vec3<F>;
}

/// A magnetic field with the same vector everywhere.
#[derive(Clone, Debug)]
pub struct UniformField3<F> {
    vector: Vec3<F>,
}

impl<F: PFloat> UniformField3<F> {
    /// Creates a new uniform field with the given field vector.
    pub fn new(vector: Vec3<F>) -> Self {
        UniformField3 { vector }
    }

    /// Creates a new solenoidal field of the given strength directed
    /// along the z-axis.
    pub fn solenoidal(strength: F) -> Self {
        Self::new(Vec3::new(F::zero(), F::zero(), strength))
    }

    /// Creates a new field that is zero everywhere.
    pub fn zero() -> Self {
        Self::new(Vec3::zero())
    }
}

impl<F: PFloat> MagneticField3<F> for UniformField3<F> {
    fn sample(&self, _position: &Point3<F>) -> Vec3<F> {
        self.vector.clone()
    }
}

impl<F, S> MagneticField3<F> for S
where
    F: PFloat,
    S: Fn(&Point3<F>) -> Vec3<F>,
{
    fn sample(&self, position: &Point3<F>) -> Vec3<F> {
        self(position)
    }
}
