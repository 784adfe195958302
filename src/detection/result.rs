//! Detection results and diagnostics structures.
//!
//! These types describe what happened during processing of a single frame:
//! - the raw colored 3D flow cloud and the clustered moving objects
//! - optional per-flow match records for offline debugging
//! - sample/rejection counts and timing information

use nalgebra::{Point2, Vector3};

use super::Cluster;
use super::reconstructor::RejectionStats;
use crate::cloud::{ColoredPoint, LabeledPoint};

/// Output of the detector for a single frame.
#[derive(Debug, Clone)]
pub struct DetectionResult {
    pub timestamp_ns: u64,
    /// Set when the frame produced no comparison against a previous frame.
    pub skipped: Option<SkipReason>,
    /// One point per reconstructed flow, colored by velocity.
    pub flow_cloud: Vec<ColoredPoint>,
    pub clusters: Vec<Cluster>,
    /// Cluster members at their current position, labeled by cluster index.
    pub cluster_cloud: Vec<LabeledPoint>,
    /// Filled only with `debug_records` enabled.
    pub match_records: Vec<MatchRecord>,
    pub metrics: DetectionMetrics,
    pub timing: TimingStats,
}

impl DetectionResult {
    pub fn skipped(timestamp_ns: u64, reason: SkipReason) -> Self {
        Self {
            timestamp_ns,
            skipped: Some(reason),
            flow_cloud: Vec::new(),
            clusters: Vec::new(),
            cluster_cloud: Vec::new(),
            match_records: Vec::new(),
            metrics: DetectionMetrics::default(),
            timing: TimingStats::zero(),
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// First frame: only seeds the previous-frame state.
    FirstFrame,
    /// Timestamp did not advance, so velocities are undefined.
    NonPositiveElapsed,
    /// Depth is the point source but this or the previous frame has none.
    MissingDepth,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::FirstFrame => "first frame",
            Self::NonPositiveElapsed => "non-positive elapsed time",
            Self::MissingDepth => "missing depth",
        };
        f.write_str(text)
    }
}

/// Scalar counts useful for tuning thresholds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DetectionMetrics {
    pub elapsed_s: f64,
    pub rejections: RejectionStats,
    /// Reconstructed flows, i.e. points in the raw cloud.
    pub n_flows: usize,
    /// Flows at or above the moving speed threshold.
    pub n_moving: usize,
    /// Clusters before the minimum size filter.
    pub n_candidate_clusters: usize,
    pub n_clusters: usize,
}

/// Timing breakdown for a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingStats {
    pub total_ms: f64,
    pub reconstruct_ms: f64,
    pub cluster_ms: f64,
}

impl TimingStats {
    pub fn zero() -> Self {
        Self {
            total_ms: 0.0,
            reconstruct_ms: 0.0,
            cluster_ms: 0.0,
        }
    }
}

/// One clustered flow with both endpoints, for offline inspection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchRecord {
    pub now: Vector3<f64>,
    /// Previous point, already in the current camera frame.
    pub prev: Vector3<f64>,
    pub now_uv: Point2<i32>,
    pub prev_uv: Point2<i32>,
    pub cluster: usize,
}
