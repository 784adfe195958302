//! Frame data carried from one invocation to the next.

use nalgebra::Vector3;

use crate::config::PointSource;
use crate::frame::{DepthFrame, DisparityFrame};

/// Everything about one frame that the next frame compares against.
#[derive(Debug, Clone)]
pub struct FrameData {
    pub timestamp_ns: u64,
    pub disparity: DisparityFrame,
    /// `None` when the depth image could not be decoded.
    pub depth: Option<DepthFrame>,
}

impl FrameData {
    /// 3D point at (u, v) in this frame's camera coordinates.
    pub fn point_3d(&self, u: i32, v: i32, source: PointSource) -> Option<Vector3<f64>> {
        match source {
            PointSource::Depth => self
                .depth
                .as_ref()?
                .point_3d(u, v, self.disparity.camera()),
            PointSource::Disparity => self.disparity.point_3d(u, v),
        }
    }

    /// Whether 3D points can be reconstructed at all with `source`.
    pub fn has_points(&self, source: PointSource) -> bool {
        match source {
            PointSource::Depth => self.depth.is_some(),
            PointSource::Disparity => true,
        }
    }
}

/// Detector memory between frames. Replaced wholesale after every frame.
#[derive(Debug, Clone, Default)]
pub enum PreviousFrameState {
    /// No frame seen yet.
    #[default]
    Empty,
    Seeded(FrameData),
}

impl PreviousFrameState {
    pub fn is_seeded(&self) -> bool {
        matches!(self, Self::Seeded(_))
    }

    pub fn frame(&self) -> Option<&FrameData> {
        match self {
            Self::Empty => None,
            Self::Seeded(frame) => Some(frame),
        }
    }
}
