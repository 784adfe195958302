//! Rerun-based visualization of moving object detection.
//!
//! Entity hierarchy:
//!     status               - Status bar with frame state and key counts
//!     world/
//!         flows            - Raw 3D flow cloud, colored by velocity
//!         clusters         - Clustered flow endpoints, one class id per cluster
//!         motion           - Cluster motion arrows (previous → current)
//!     plots/
//!         flows            - Reconstructed flows per frame
//!         moving           - Flows above the speed threshold
//!         clusters         - Surviving clusters
//!         total_ms         - Frame processing time

use anyhow::{Context, Result};
use rerun::RecordingStream;

use crate::cloud::{ColoredPoint, LabeledPoint};
use crate::detection::{Cluster, DetectionResult};
use crate::geometry::frames::camera_position_to_viz;

pub struct RerunVisualizer {
    rec: RecordingStream,
    start_timestamp_ns: Option<u64>,
}

impl RerunVisualizer {
    pub fn new(app_name: &str) -> Result<Self> {
        // Runs rerun viewer in a separate process
        let rec = rerun::RecordingStreamBuilder::new(app_name)
            .spawn()
            .context("Failed to spawn rerun viewer")?;

        // Points are converted from camera RDF to FLU before logging
        rec.log_static("world", &rerun::ViewCoordinates::FLU()).ok();

        Ok(Self {
            rec,
            start_timestamp_ns: None,
        })
    }

    /// Set the current timestamp for all subsequent logs (relative to the first frame).
    pub fn set_time(&mut self, timestamp_ns: u64) {
        let start_ns = *self.start_timestamp_ns.get_or_insert(timestamp_ns);
        let relative_ns = timestamp_ns.saturating_sub(start_ns);
        self.rec
            .set_duration_secs("time", relative_ns as f64 / 1e9);
    }

    /// Log everything about one frame.
    pub fn log_result(&mut self, result: &DetectionResult) {
        self.set_time(result.timestamp_ns);
        self.log_status(result);
        if result.is_skipped() {
            return;
        }
        self.log_flow_cloud(&result.flow_cloud);
        self.log_clusters(&result.cluster_cloud);
        self.log_cluster_motion(&result.clusters);
        self.log_plots(result);
    }

    fn log_status(&self, result: &DetectionResult) {
        let status_text = match result.skipped {
            Some(reason) => format!("**SKIPPED** ({})", reason),
            None => format!(
                "Flows: {} | Moving: {} | Clusters: {} | {:.1} ms",
                result.metrics.n_flows,
                result.metrics.n_moving,
                result.metrics.n_clusters,
                result.timing.total_ms
            ),
        };
        self.rec
            .log(
                "status",
                &rerun::TextDocument::new(status_text)
                    .with_media_type(rerun::MediaType::markdown()),
            )
            .ok();
    }

    pub fn log_flow_cloud(&self, points: &[ColoredPoint]) {
        let positions: Vec<[f32; 3]> = points.iter().map(|p| to_viz(&p.position)).collect();
        let colors: Vec<[u8; 3]> = points.iter().map(|p| p.rgb).collect();
        self.rec
            .log(
                "world/flows",
                &rerun::Points3D::new(positions)
                    .with_colors(colors)
                    .with_radii([0.01f32]),
            )
            .ok();
    }

    pub fn log_clusters(&self, points: &[LabeledPoint]) {
        let positions: Vec<[f32; 3]> = points.iter().map(|p| to_viz(&p.position)).collect();
        let class_ids: Vec<u16> = points
            .iter()
            .map(|p| u16::try_from(p.cluster).unwrap_or(u16::MAX))
            .collect();
        self.rec
            .log(
                "world/clusters",
                &rerun::Points3D::new(positions)
                    .with_class_ids(class_ids)
                    .with_radii([0.02f32]),
            )
            .ok();
    }

    /// One arrow per clustered flow, from its ego-compensated start to its end.
    pub fn log_cluster_motion(&self, clusters: &[Cluster]) {
        let flows = clusters.iter().flat_map(|c| c.flows.iter());
        let (origins, vectors): (Vec<[f32; 3]>, Vec<[f32; 3]>) = flows
            .map(|f| (to_viz(&f.start), to_viz(&f.distance_vector())))
            .unzip();
        self.rec
            .log(
                "world/motion",
                &rerun::Arrows3D::from_vectors(vectors).with_origins(origins),
            )
            .ok();
    }

    fn log_plots(&self, result: &DetectionResult) {
        let metrics = &result.metrics;
        let series = [
            ("plots/flows", metrics.n_flows as f64),
            ("plots/moving", metrics.n_moving as f64),
            ("plots/clusters", metrics.n_clusters as f64),
            ("plots/total_ms", result.timing.total_ms),
        ];
        for (path, value) in series {
            self.rec.log(path, &rerun::Scalars::new([value])).ok();
        }
    }
}

fn to_viz(p: &nalgebra::Vector3<f64>) -> [f32; 3] {
    let v = camera_position_to_viz(p);
    [v.x as f32, v.y as f32, v.z as f32]
}
