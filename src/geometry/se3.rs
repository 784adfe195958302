//! SE3: 6-DOF rigid transformation (rotation + translation).
//!
//! Used for the ego-motion between two consecutive camera frames. A point `p`
//! expressed in the previous camera frame maps to `R * p + t` in the current one.

use nalgebra::{Quaternion, UnitQuaternion, Vector3};

/// Rigid body transformation.
#[derive(Debug, Clone, PartialEq)]
pub struct SE3 {
    pub rotation: UnitQuaternion<f64>,
    pub translation: Vector3<f64>,
}

impl SE3 {
    pub fn identity() -> Self {
        Self {
            rotation: UnitQuaternion::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// Construct from quaternion (w, x, y, z) and translation.
    ///
    /// The quaternion is normalized, so slightly denormalized input from text
    /// files is accepted.
    pub fn from_quaternion(qw: f64, qx: f64, qy: f64, qz: f64, translation: Vector3<f64>) -> Self {
        let rotation = UnitQuaternion::from_quaternion(Quaternion::new(qw, qx, qy, qz));
        Self {
            rotation,
            translation,
        }
    }

    #[inline]
    pub fn transform_point(&self, p: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * p + self.translation
    }
}

impl Default for SE3 {
    fn default() -> Self {
        Self::identity()
    }
}
