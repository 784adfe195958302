use nalgebra::{Matrix3, Point2, Vector3};
use serde::Deserialize;

/// Pinhole intrinsics of the rectified left camera.
///
/// Distortion is assumed to have been removed upstream: every input image
/// (disparity, depth, flow) is aligned to the rectified left image.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CameraModel {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl CameraModel {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self { fx, fy, cx, cy }
    }

    /// Build from a 3x3 intrinsic matrix K.
    pub fn from_k(k: &Matrix3<f64>) -> Self {
        Self {
            fx: k[(0, 0)],
            fy: k[(1, 1)],
            cx: k[(0, 2)],
            cy: k[(1, 2)],
        }
    }

    /// Ray through pixel (u, v), scaled so that `ray.z == 1`.
    ///
    /// Multiplying the ray by a depth gives the 3D point at that depth.
    #[inline]
    pub fn pixel_to_ray(&self, u: f64, v: f64) -> Vector3<f64> {
        Vector3::new((u - self.cx) / self.fx, (v - self.cy) / self.fy, 1.0)
    }

    /// Project a camera-frame point to pixel coordinates.
    ///
    /// Returns `None` for points at or behind the image plane.
    pub fn project(&self, p: &Vector3<f64>) -> Option<Point2<f64>> {
        if p.z <= 0.0 {
            return None;
        }
        Some(Point2::new(
            self.fx * p.x / p.z + self.cx,
            self.fy * p.y / p.z + self.cy,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ray_through_principal_point() {
        let cam = CameraModel::new(500.0, 500.0, 320.0, 240.0);
        let ray = cam.pixel_to_ray(320.0, 240.0);
        assert_relative_eq!(ray, Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_ray_projects_back() {
        let cam = CameraModel::new(450.0, 460.0, 310.5, 242.25);
        for &(u, v) in &[(0.0, 0.0), (100.0, 37.0), (639.0, 479.0)] {
            let p = cam.pixel_to_ray(u, v) * 3.7;
            let uv = cam.project(&p).unwrap();
            assert_relative_eq!(uv.x, u, epsilon = 1e-9);
            assert_relative_eq!(uv.y, v, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_project_behind_camera() {
        let cam = CameraModel::new(500.0, 500.0, 320.0, 240.0);
        assert!(cam.project(&Vector3::new(0.0, 0.0, -1.0)).is_none());
    }

    #[test]
    fn test_from_k() {
        #[rustfmt::skip]
        let k = Matrix3::new(
            458.654, 0.0,     367.215,
            0.0,     457.296, 248.375,
            0.0,     0.0,     1.0,
        );
        assert_eq!(
            CameraModel::from_k(&k),
            CameraModel::new(458.654, 457.296, 367.215, 248.375)
        );
    }
}
