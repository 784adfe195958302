//! Moving object detector: orchestrates reconstruction and clustering per frame.
//!
//! Each call to [`MovingObjectDetector::process_frame`] compares the new frame
//! against the one before it:
//! - reconstruct 3D flows (previous point moved by ego-motion → current point)
//! - color every flow by its velocity for the raw cloud
//! - cluster the flows that move fast enough
//! - keep the new frame as "previous" for the next call

use std::time::Instant;

use tracing::{debug, info, warn};

use super::clustering::{ClusterThresholds, IncrementalClusterer};
use super::color::velocity_color;
use super::reconstructor::{Flow3dReconstructor, ReconstructionInputs, Sampling};
use super::result::{DetectionMetrics, DetectionResult, MatchRecord, SkipReason, TimingStats};
use super::state::{FrameData, PreviousFrameState};
use super::Flow3D;
use crate::cloud::{ColoredPoint, LabeledPoint};
use crate::config::{ConfigHandle, DetectorConfig};
use crate::frame::{DepthFrame, DisparityFrame, FlowField, FlowMatch};
use crate::geometry::SE3;

/// Optical flow from the previous to the current image of one camera.
#[derive(Debug, Clone)]
pub enum FlowInput {
    /// One vector per pixel, NaN where unknown.
    Dense(FlowField),
    /// Explicit point matches from a feature tracker.
    Sparse(Vec<FlowMatch>),
}

impl FlowInput {
    fn into_field(self, width: usize, height: usize) -> FlowField {
        match self {
            Self::Dense(field) => field,
            Self::Sparse(matches) => FlowField::from_sparse(width, height, &matches),
        }
    }

    fn sampling(&self, stride: usize) -> Sampling {
        match self {
            Self::Dense(_) => Sampling::Grid { stride },
            Self::Sparse(matches) => {
                Sampling::Pixels(matches.iter().map(FlowMatch::source_pixel).collect())
            }
        }
    }
}

/// Everything the detector needs for one frame.
#[derive(Debug, Clone)]
pub struct FrameInputs {
    pub timestamp_ns: u64,
    /// Maps points of the previous camera frame into this one.
    pub ego_motion: SE3,
    pub left_flow: FlowInput,
    pub right_flow: FlowInput,
    pub disparity: DisparityFrame,
    pub depth: Option<DepthFrame>,
}

pub struct MovingObjectDetector {
    config: ConfigHandle,
    state: PreviousFrameState,
    frame_count: usize,
}

impl MovingObjectDetector {
    pub fn new(config: ConfigHandle) -> Self {
        Self {
            config,
            state: PreviousFrameState::Empty,
            frame_count: 0,
        }
    }

    pub fn config(&self) -> &ConfigHandle {
        &self.config
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn state(&self) -> &PreviousFrameState {
        &self.state
    }

    /// Forget the previous frame; the next call only seeds state again.
    pub fn reset(&mut self) {
        self.state = PreviousFrameState::Empty;
    }

    /// Process one frame. Never fails: degenerate frames come back with
    /// `skipped` set and empty outputs, and still become the previous frame.
    pub fn process_frame(&mut self, inputs: FrameInputs) -> DetectionResult {
        let t_start = Instant::now();
        let config = self.config.snapshot();
        self.frame_count += 1;

        let FrameInputs {
            timestamp_ns,
            ego_motion,
            left_flow,
            right_flow,
            disparity,
            depth,
        } = inputs;
        let current = FrameData {
            timestamp_ns,
            disparity,
            depth,
        };

        let previous = std::mem::take(&mut self.state);
        let result = match previous.frame() {
            None => {
                info!("Seeded detector with first frame at {} ns", timestamp_ns);
                DetectionResult::skipped(timestamp_ns, SkipReason::FirstFrame)
            }
            Some(previous) => self.compare(
                &config,
                previous,
                &current,
                &ego_motion,
                left_flow,
                right_flow,
                t_start,
            ),
        };

        self.state = PreviousFrameState::Seeded(current);
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn compare(
        &self,
        config: &DetectorConfig,
        previous: &FrameData,
        current: &FrameData,
        ego_motion: &SE3,
        left_flow: FlowInput,
        right_flow: FlowInput,
        t_start: Instant,
    ) -> DetectionResult {
        let timestamp_ns = current.timestamp_ns;
        if timestamp_ns <= previous.timestamp_ns {
            warn!(
                "Frame {} at {} ns does not advance past {} ns, skipping",
                self.frame_count, timestamp_ns, previous.timestamp_ns
            );
            return DetectionResult::skipped(timestamp_ns, SkipReason::NonPositiveElapsed);
        }
        if !previous.has_points(config.point_source) || !current.has_points(config.point_source) {
            warn!(
                "Frame {} at {} ns has no usable depth, skipping",
                self.frame_count, timestamp_ns
            );
            return DetectionResult::skipped(timestamp_ns, SkipReason::MissingDepth);
        }
        let elapsed_s = (timestamp_ns - previous.timestamp_ns) as f64 * 1e-9;

        // --- Reconstruction ---
        let t_reconstruct = Instant::now();
        let sampling = left_flow.sampling(config.downsample_scale);
        let left_field =
            left_flow.into_field(previous.disparity.width(), previous.disparity.height());
        let right_field =
            right_flow.into_field(previous.disparity.width(), previous.disparity.height());
        let reconstruction =
            Flow3dReconstructor::new(config.matching_tolerance, config.point_source).reconstruct(
                &ReconstructionInputs {
                    previous,
                    current,
                    left_flow: &left_field,
                    right_flow: &right_field,
                    ego_motion,
                },
                &sampling,
            );
        let reconstruct_ms = t_reconstruct.elapsed().as_secs_f64() * 1000.0;

        // --- Clustering ---
        let t_cluster = Instant::now();
        let mut flow_cloud = Vec::with_capacity(reconstruction.flows.len());
        let mut clusterer = IncrementalClusterer::new(ClusterThresholds {
            start_diff: config.flow_start_diff,
            length_diff: config.flow_length_diff,
            radian_diff: config.flow_radian_diff,
        });
        let mut n_moving = 0;
        for flow in &reconstruction.flows {
            flow_cloud.push(ColoredPoint {
                position: flow.end,
                rgb: velocity_color(flow, elapsed_s, config.flow_axis_max),
            });
            if is_moving(flow, elapsed_s, config.moving_flow_length) {
                n_moving += 1;
                clusterer.insert(*flow);
            }
        }
        let n_candidate_clusters = clusterer.num_clusters();
        let clusters = clusterer.finish(config.cluster_element_num);

        let mut cluster_cloud = Vec::new();
        let mut match_records = Vec::new();
        for (label, cluster) in clusters.iter().enumerate() {
            for flow in &cluster.flows {
                cluster_cloud.push(LabeledPoint {
                    position: flow.end,
                    cluster: label,
                });
                if config.debug_records {
                    match_records.push(MatchRecord {
                        now: flow.end,
                        prev: flow.start,
                        now_uv: flow.end_uv,
                        prev_uv: flow.start_uv,
                        cluster: label,
                    });
                }
            }
        }
        let cluster_ms = t_cluster.elapsed().as_secs_f64() * 1000.0;

        let metrics = DetectionMetrics {
            elapsed_s,
            rejections: reconstruction.stats,
            n_flows: reconstruction.flows.len(),
            n_moving,
            n_candidate_clusters,
            n_clusters: clusters.len(),
        };
        let timing = TimingStats {
            total_ms: t_start.elapsed().as_secs_f64() * 1000.0,
            reconstruct_ms,
            cluster_ms,
        };

        debug!(
            "Frame {}: {} sampled, {} flows, {} moving, {} clusters ({} before size filter) in {:.1} ms",
            self.frame_count,
            metrics.rejections.sampled,
            metrics.n_flows,
            metrics.n_moving,
            metrics.n_clusters,
            metrics.n_candidate_clusters,
            timing.total_ms
        );

        DetectionResult {
            timestamp_ns,
            skipped: None,
            flow_cloud,
            clusters,
            cluster_cloud,
            match_records,
            metrics,
            timing,
        }
    }
}

/// Whether a flow is fast enough to take part in clustering.
#[inline]
fn is_moving(flow: &Flow3D, elapsed_s: f64, min_speed: f64) -> bool {
    flow.length() / elapsed_s >= min_speed
}
