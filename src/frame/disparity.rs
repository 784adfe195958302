//! Disparity map wrapper: disparity ↔ depth ↔ 3D point per pixel.

use nalgebra::Vector3;
use serde::Deserialize;

use super::{FrameError, Grid};
use crate::camera::CameraModel;
use crate::cloud::OrganizedPointCloud;

/// Stereo rig parameters that accompany a disparity map.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct StereoParams {
    /// Focal length f in pixels.
    pub focal_length: f32,
    /// Camera separation T in meters.
    pub baseline: f32,
    /// Smallest valid disparity (inclusive).
    pub min_disparity: f32,
    /// Largest valid disparity (inclusive).
    pub max_disparity: f32,
}

/// A disparity map plus everything needed to lift it into 3D.
///
/// Immutable after construction. The detector keeps the previous frame's
/// instance alive until the next one replaces it.
#[derive(Debug, Clone)]
pub struct DisparityFrame {
    disparities: Grid<f32>,
    params: StereoParams,
    camera: CameraModel,
}

impl DisparityFrame {
    pub fn new(
        disparities: Grid<f32>,
        params: StereoParams,
        camera: CameraModel,
    ) -> Result<Self, FrameError> {
        let (min, max) = (params.min_disparity, params.max_disparity);
        if min.is_nan() || max.is_nan() || min > max {
            return Err(FrameError::InvalidDisparityRange { min, max });
        }
        Ok(Self {
            disparities,
            params,
            camera,
        })
    }

    pub fn width(&self) -> usize {
        self.disparities.width()
    }

    pub fn height(&self) -> usize {
        self.disparities.height()
    }

    pub fn params(&self) -> &StereoParams {
        &self.params
    }

    pub fn camera(&self) -> &CameraModel {
        &self.camera
    }

    /// Raw stored value, bounds-checked only.
    #[inline]
    pub fn raw(&self, u: i32, v: i32) -> Option<f32> {
        self.disparities.get(u, v).copied()
    }

    /// Disparity at (u, v) if inside the image and within
    /// `[min_disparity, max_disparity]`.
    pub fn disparity(&self, u: i32, v: i32) -> Option<f32> {
        let d = self.raw(u, v)?;
        if d > self.params.max_disparity || d < self.params.min_disparity {
            return None;
        }
        // NaN slips through both comparisons above
        if d.is_nan() {
            return None;
        }
        Some(d)
    }

    /// Depth z = f * T / d, or `None` where the disparity is invalid or zero.
    pub fn depth(&self, u: i32, v: i32) -> Option<f64> {
        let d = self.disparity(u, v)?;
        if d == 0.0 {
            return None;
        }
        Some(self.params.focal_length as f64 * self.params.baseline as f64 / d as f64)
    }

    /// 3D point in the left camera frame.
    pub fn point_3d(&self, u: i32, v: i32) -> Option<Vector3<f64>> {
        let z = self.depth(u, v)?;
        let ray = self.camera.pixel_to_ray(u as f64, v as f64);
        Some(Vector3::new(ray.x * z, ray.y * z, z))
    }

    /// Organized cloud: one entry per pixel, invalid pixels kept as holes so
    /// that index (u, v) of the cloud still refers to pixel (u, v).
    pub fn to_point_cloud(&self) -> OrganizedPointCloud {
        OrganizedPointCloud::new(Grid::from_fn(self.width(), self.height(), |u, v| {
            self.point_3d(u as i32, v as i32)
        }))
    }

    /// Dense depth image (meters), NaN where no depth can be reconstructed.
    pub fn to_depth_image(&self) -> Grid<f32> {
        Grid::from_fn(self.width(), self.height(), |u, v| {
            self.depth(u as i32, v as i32)
                .map_or(f32::NAN, |z| z as f32)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn params() -> StereoParams {
        StereoParams {
            focal_length: 500.0,
            baseline: 0.1,
            min_disparity: 0.0,
            max_disparity: 64.0,
        }
    }

    fn camera() -> CameraModel {
        CameraModel::new(500.0, 500.0, 4.0, 3.0)
    }

    fn frame_with(values: Vec<f32>) -> DisparityFrame {
        let grid = Grid::from_vec(8, 6, values).unwrap();
        DisparityFrame::new(grid, params(), camera()).unwrap()
    }

    #[test]
    fn test_depth_from_disparity() {
        let frame = frame_with(vec![50.0; 48]);
        // 500 * 0.1 / 50 = 1.0m
        assert_relative_eq!(frame.depth(2, 2).unwrap(), 1.0, epsilon = 1e-6);
        let p = frame.point_3d(4, 3).unwrap();
        assert_relative_eq!(p, Vector3::new(0.0, 0.0, 1.0), epsilon = 1e-6);
    }

    #[test]
    fn test_reprojection_recovers_pixel() {
        let values: Vec<f32> = (0..48).map(|i| 1.0 + i as f32).collect();
        let frame = frame_with(values);
        for v in 0..6 {
            for u in 0..8 {
                let p = frame.point_3d(u, v).unwrap();
                let uv = frame.camera().project(&p).unwrap();
                assert_relative_eq!(uv.x, u as f64, epsilon = 1e-6);
                assert_relative_eq!(uv.y, v as f64, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_disparity_out_of_bounds() {
        let frame = frame_with(vec![10.0; 48]);
        for &(u, v) in &[(-1, 0), (0, -1), (8, 0), (0, 6), (100, 100)] {
            assert!(frame.disparity(u, v).is_none());
            assert!(frame.point_3d(u, v).is_none());
        }
    }

    #[test]
    fn test_disparity_range_is_inclusive() {
        let mut values = vec![10.0; 48];
        values[0] = 64.0;
        values[1] = 64.5;
        values[2] = -0.5;
        values[3] = f32::NAN;
        let frame = frame_with(values);

        assert_eq!(frame.disparity(0, 0), Some(64.0));
        assert!(frame.disparity(1, 0).is_none());
        assert!(frame.disparity(2, 0).is_none());
        assert!(frame.disparity(3, 0).is_none());
    }

    #[test]
    fn test_zero_disparity_has_no_point() {
        let mut values = vec![10.0; 48];
        values[9] = 0.0;
        let frame = frame_with(values);

        assert_eq!(frame.disparity(1, 1), Some(0.0));
        assert!(frame.point_3d(1, 1).is_none());
    }

    #[test]
    fn test_point_cloud_is_organized() {
        let mut values = vec![25.0; 48];
        values[5] = 0.0;
        values[20] = 100.0;
        let frame = frame_with(values);
        let cloud = frame.to_point_cloud();

        assert_eq!(cloud.len(), 8 * 6);
        assert_eq!(cloud.width(), 8);
        assert_eq!(cloud.height(), 6);
        assert!(!cloud.is_dense());

        for v in 0..6 {
            for u in 0..8 {
                let xyz = cloud.xyz(u, v);
                match frame.point_3d(u as i32, v as i32) {
                    Some(p) => assert_relative_eq!(xyz[2], p.z as f32),
                    None => assert!(xyz.iter().all(|c| c.is_nan())),
                }
            }
        }
    }

    #[test]
    fn test_depth_image_nan_holes() {
        let mut values = vec![50.0; 48];
        values[47] = f32::INFINITY;
        let frame = frame_with(values);
        let depth = frame.to_depth_image();

        assert_relative_eq!(*depth.get(0, 0).unwrap(), 1.0, epsilon = 1e-6);
        assert!(depth.get(7, 5).unwrap().is_nan());
    }

    #[test]
    fn test_rejects_inverted_range() {
        let grid = Grid::filled(2, 2, 1.0);
        let bad = StereoParams {
            min_disparity: 10.0,
            max_disparity: 1.0,
            ..params()
        };
        assert!(DisparityFrame::new(grid, bad, camera()).is_err());
    }
}
