use crate::Float;

/// Cartesian 3-vector used for positions, field samples and field integrals.
pub type Vec3 = nalgebra::Vector3<Float>;

/// Cylindrical view of a `Vec3`, z along the detector axis.
pub trait Cylindrical {
    /// Builds a vector from radius, azimuth and z.
    fn from_cylindrical(r: Float, phi: Float, z: Float) -> Self;
    /// Transverse radius.
    fn rho(&self) -> Float;
    /// Azimuth in (-pi, pi], 0 on the axis.
    fn azimuth(&self) -> Float;
}

impl Cylindrical for Vec3 {
    fn from_cylindrical(r: Float, phi: Float, z: Float) -> Vec3 {
        Vec3::new(r * phi.cos(), r * phi.sin(), z)
    }

    #[inline(always)]
    fn rho(&self) -> Float {
        self.xy().norm()
    }

    #[inline(always)]
    fn azimuth(&self) -> Float {
        if self.x == 0.0 && self.y == 0.0 {
            return 0.0;
        }
        self.y.atan2(self.x)
    }
}
