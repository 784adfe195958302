//! Depth image accessor for the two supported sample encodings.

use std::fmt;
use std::str::FromStr;

use nalgebra::Vector3;

use super::{FrameError, Grid};
use crate::camera::CameraModel;

/// Scale of fixed-point depth samples.
const METERS_PER_MILLIMETER: f32 = 0.001;

/// How depth samples are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthEncoding {
    /// Unsigned 16-bit millimeters; 0 marks a missing sample.
    FixedPointMillimeters,
    /// 32-bit float meters; any non-finite value marks a missing sample.
    FloatMeters,
}

impl DepthEncoding {
    /// Canonical encoding name (`16UC1` / `32FC1`).
    pub fn name(&self) -> &'static str {
        match self {
            Self::FixedPointMillimeters => "16UC1",
            Self::FloatMeters => "32FC1",
        }
    }

}

impl FromStr for DepthEncoding {
    type Err = FrameError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim() {
            "16UC1" | "mono16" => Ok(Self::FixedPointMillimeters),
            "32FC1" => Ok(Self::FloatMeters),
            other => Err(FrameError::UnsupportedEncoding(other.to_string())),
        }
    }
}

impl fmt::Display for DepthEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Depth samples tagged with their encoding.
#[derive(Debug, Clone)]
enum DepthSamples {
    FixedPointMillimeters(Grid<u16>),
    FloatMeters(Grid<f32>),
}

/// A depth image in either supported encoding.
#[derive(Debug, Clone)]
pub struct DepthFrame {
    samples: DepthSamples,
}

impl DepthFrame {
    pub fn from_millimeters(samples: Grid<u16>) -> Self {
        Self {
            samples: DepthSamples::FixedPointMillimeters(samples),
        }
    }

    pub fn from_meters(samples: Grid<f32>) -> Self {
        Self {
            samples: DepthSamples::FloatMeters(samples),
        }
    }

    pub fn encoding(&self) -> DepthEncoding {
        match self.samples {
            DepthSamples::FixedPointMillimeters(_) => DepthEncoding::FixedPointMillimeters,
            DepthSamples::FloatMeters(_) => DepthEncoding::FloatMeters,
        }
    }

    pub fn width(&self) -> usize {
        match &self.samples {
            DepthSamples::FixedPointMillimeters(g) => g.width(),
            DepthSamples::FloatMeters(g) => g.width(),
        }
    }

    pub fn height(&self) -> usize {
        match &self.samples {
            DepthSamples::FixedPointMillimeters(g) => g.height(),
            DepthSamples::FloatMeters(g) => g.height(),
        }
    }

    /// Depth in meters at (u, v), `None` if outside the image or missing.
    pub fn metric_depth_at(&self, u: i32, v: i32) -> Option<f32> {
        match &self.samples {
            DepthSamples::FixedPointMillimeters(g) => g
                .get(u, v)
                .copied()
                .filter(|&raw| raw != 0)
                .map(|raw| raw as f32 * METERS_PER_MILLIMETER),
            DepthSamples::FloatMeters(g) => g.get(u, v).copied().filter(|d| d.is_finite()),
        }
    }

    /// Back-project pixel (u, v) with its depth through the pinhole model.
    pub fn point_3d(&self, u: i32, v: i32, camera: &CameraModel) -> Option<Vector3<f64>> {
        let depth = self.metric_depth_at(u, v)? as f64;
        Some(Vector3::new(
            (u as f64 - camera.cx) * depth / camera.fx,
            (v as f64 - camera.cy) * depth / camera.fy,
            depth,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_millimeter_validity() {
        let grid = Grid::from_vec(2, 1, vec![0u16, 1500]).unwrap();
        let depth = DepthFrame::from_millimeters(grid);

        assert!(depth.metric_depth_at(0, 0).is_none());
        assert_relative_eq!(depth.metric_depth_at(1, 0).unwrap(), 1.5);
    }

    #[test]
    fn test_float_validity() {
        let grid = Grid::from_vec(4, 1, vec![2.25f32, f32::NAN, f32::INFINITY, 0.0]).unwrap();
        let depth = DepthFrame::from_meters(grid);

        assert_eq!(depth.metric_depth_at(0, 0), Some(2.25));
        assert!(depth.metric_depth_at(1, 0).is_none());
        assert!(depth.metric_depth_at(2, 0).is_none());
        // Finite zero is passed through as-is
        assert_eq!(depth.metric_depth_at(3, 0), Some(0.0));
        assert!(depth.metric_depth_at(4, 0).is_none());
    }

    #[test]
    fn test_encoding_names() {
        assert_eq!(
            "16UC1".parse::<DepthEncoding>(),
            Ok(DepthEncoding::FixedPointMillimeters)
        );
        assert_eq!(
            "mono16".parse::<DepthEncoding>(),
            Ok(DepthEncoding::FixedPointMillimeters)
        );
        assert_eq!("32FC1".parse::<DepthEncoding>(), Ok(DepthEncoding::FloatMeters));
        assert_eq!(
            "rgb8".parse::<DepthEncoding>(),
            Err(FrameError::UnsupportedEncoding("rgb8".to_string()))
        );
    }

    #[test]
    fn test_point_3d() {
        let camera = CameraModel::new(500.0, 400.0, 1.0, 1.0);
        let grid = Grid::filled(3, 3, 2.0f32);
        let depth = DepthFrame::from_meters(grid);

        let p = depth.point_3d(2, 0, &camera).unwrap();
        assert_relative_eq!(p, Vector3::new(1.0 * 2.0 / 500.0, -1.0 * 2.0 / 400.0, 2.0));
    }
}
