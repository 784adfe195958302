//! Flow3D reconstruction: pixel correspondences + stereo + ego-motion → 3D flows.
//!
//! For every sampled pixel of the previous left image the left optical flow
//! gives the matching pixel in the current left image. Disparity moves both
//! pixels into the right image, where the independently estimated right flow
//! must agree with the disparity-implied position. Only correspondences that
//! survive this stereo cross-check are lifted into 3D.

use nalgebra::{Point2, Vector3};

use super::Flow3D;
use super::state::FrameData;
use crate::config::PointSource;
use crate::frame::FlowField;
use crate::geometry::SE3;

/// Which previous-left pixels to try.
#[derive(Debug, Clone, PartialEq)]
pub enum Sampling {
    /// Regular grid with the given stride, starting at (0, 0).
    Grid { stride: usize },
    /// Explicit pixels, e.g. the sources of a sparse match list.
    Pixels(Vec<Point2<i32>>),
}

impl Sampling {
    pub fn pixels(&self, width: usize, height: usize) -> Vec<Point2<i32>> {
        match self {
            Self::Grid { stride } => {
                let stride = (*stride).max(1);
                (0..height)
                    .step_by(stride)
                    .flat_map(|v| {
                        (0..width)
                            .step_by(stride)
                            .map(move |u| Point2::new(u as i32, v as i32))
                    })
                    .collect()
            }
            Self::Pixels(pixels) => pixels.clone(),
        }
    }
}

/// Per-reason counts of rejected samples for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RejectionStats {
    pub sampled: usize,
    pub invalid_left_flow: usize,
    pub out_of_bounds: usize,
    pub invalid_disparity: usize,
    pub right_out_of_bounds: usize,
    pub invalid_right_flow: usize,
    pub stereo_mismatch: usize,
    pub missing_point: usize,
    pub accepted: usize,
}

impl RejectionStats {
    pub fn rejected(&self) -> usize {
        self.sampled - self.accepted
    }
}

/// Everything one reconstruction pass reads. Borrowed, never modified.
pub struct ReconstructionInputs<'a> {
    pub previous: &'a FrameData,
    pub current: &'a FrameData,
    /// Left flow, previous → current.
    pub left_flow: &'a FlowField,
    /// Right flow, previous → current.
    pub right_flow: &'a FlowField,
    /// Maps previous-camera points into the current camera frame.
    pub ego_motion: &'a SE3,
}

pub struct Reconstruction {
    pub flows: Vec<Flow3D>,
    pub stats: RejectionStats,
}

pub struct Flow3dReconstructor {
    /// Maximum pixel distance for the stereo cross-check.
    pub matching_tolerance: f64,
    pub point_source: PointSource,
}

impl Flow3dReconstructor {
    pub fn new(matching_tolerance: f64, point_source: PointSource) -> Self {
        Self {
            matching_tolerance,
            point_source,
        }
    }

    pub fn reconstruct(&self, inputs: &ReconstructionInputs<'_>, sampling: &Sampling) -> Reconstruction {
        let mut stats = RejectionStats::default();
        let pixels = sampling.pixels(inputs.left_flow.width(), inputs.left_flow.height());
        let mut flows = Vec::with_capacity(pixels.len());

        for left_previous in pixels {
            stats.sampled += 1;
            match self.reconstruct_pixel(inputs, left_previous) {
                Ok(flow) => {
                    stats.accepted += 1;
                    flows.push(flow);
                }
                Err(reason) => reason.count(&mut stats),
            }
        }

        Reconstruction { flows, stats }
    }

    fn reconstruct_pixel(
        &self,
        inputs: &ReconstructionInputs<'_>,
        left_previous: Point2<i32>,
    ) -> Result<Flow3D, Rejection> {
        let flow_left = inputs
            .left_flow
            .at(left_previous.x, left_previous.y)
            .ok_or(Rejection::InvalidLeftFlow)?;

        let left_now = Point2::new(
            (left_previous.x as f32 + flow_left.x).round() as i32,
            (left_previous.y as f32 + flow_left.y).round() as i32,
        );

        let disparity_now = inputs
            .current
            .disparity
            .raw(left_now.x, left_now.y)
            .ok_or(Rejection::OutOfBounds)?;
        let disparity_previous = inputs
            .previous
            .disparity
            .raw(left_previous.x, left_previous.y)
            .ok_or(Rejection::OutOfBounds)?;
        if !usable_disparity(disparity_now) || !usable_disparity(disparity_previous) {
            return Err(Rejection::InvalidDisparity);
        }

        // Right pixel = left pixel shifted by +disparity on the same row.
        // The sign follows the upstream disparity producer; do not flip it.
        let right_now = Point2::new((left_now.x as f32 + disparity_now) as i32, left_now.y);
        let right_previous = Point2::new(
            (left_previous.x as f32 + disparity_previous) as i32,
            left_previous.y,
        );
        if right_previous.x >= inputs.right_flow.width() as i32 {
            return Err(Rejection::RightOutOfBounds);
        }

        let flow_right = inputs
            .right_flow
            .at(right_previous.x, right_previous.y)
            .ok_or(Rejection::InvalidRightFlow)?;

        let x_diff = right_previous.x as f64 + flow_right.x as f64 - right_now.x as f64;
        let y_diff = right_previous.y as f64 + flow_right.y as f64 - right_now.y as f64;
        if x_diff.hypot(y_diff) > self.matching_tolerance {
            return Err(Rejection::StereoMismatch);
        }

        let point_now = inputs
            .current
            .point_3d(left_now.x, left_now.y, self.point_source)
            .ok_or(Rejection::MissingPoint)?;
        let point_previous = inputs
            .previous
            .point_3d(left_previous.x, left_previous.y, self.point_source)
            .ok_or(Rejection::MissingPoint)?;

        let start: Vector3<f64> = inputs.ego_motion.transform_point(&point_previous);
        Ok(Flow3D::new(start, point_now, left_previous, left_now))
    }
}

/// Raw disparity usable for right-pixel lookup.
#[inline]
fn usable_disparity(d: f32) -> bool {
    d.is_finite() && d >= 0.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    InvalidLeftFlow,
    OutOfBounds,
    InvalidDisparity,
    RightOutOfBounds,
    InvalidRightFlow,
    StereoMismatch,
    MissingPoint,
}

impl Rejection {
    fn count(self, stats: &mut RejectionStats) {
        let counter = match self {
            Self::InvalidLeftFlow => &mut stats.invalid_left_flow,
            Self::OutOfBounds => &mut stats.out_of_bounds,
            Self::InvalidDisparity => &mut stats.invalid_disparity,
            Self::RightOutOfBounds => &mut stats.right_out_of_bounds,
            Self::InvalidRightFlow => &mut stats.invalid_right_flow,
            Self::StereoMismatch => &mut stats.stereo_mismatch,
            Self::MissingPoint => &mut stats.missing_point,
        };
        *counter += 1;
    }
}
