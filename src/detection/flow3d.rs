use nalgebra::{Point2, Vector3};

/// A 3D motion vector reconstructed from one pixel correspondence.
///
/// `start` is the previous-frame point already moved into the current camera
/// frame by the ego-motion, so for a static scene point `start ≈ end`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Flow3D {
    pub start: Vector3<f64>,
    pub end: Vector3<f64>,
    /// Pixel in the previous left image.
    pub start_uv: Point2<i32>,
    /// Pixel in the current left image.
    pub end_uv: Point2<i32>,
}

impl Flow3D {
    pub fn new(
        start: Vector3<f64>,
        end: Vector3<f64>,
        start_uv: Point2<i32>,
        end_uv: Point2<i32>,
    ) -> Self {
        Self {
            start,
            end,
            start_uv,
            end_uv,
        }
    }

    #[inline]
    pub fn distance_vector(&self) -> Vector3<f64> {
        self.end - self.start
    }

    #[inline]
    pub fn length(&self) -> f64 {
        self.distance_vector().norm()
    }

    /// Angle in `[0, π]` between the two motion directions.
    ///
    /// Zero-length flows have no direction and report 0.
    #[inline]
    pub fn radian_to(&self, other: &Flow3D) -> f64 {
        self.distance_vector().angle(&other.distance_vector())
    }
}
