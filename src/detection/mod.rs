//! Moving object detection: 3D flow reconstruction and clustering.
//!
//! Pipeline per frame:
//! - `reconstructor`: stereo-checked pixel flows lifted into 3D `Flow3D`s
//! - `color`: velocity coloring of the raw flow cloud
//! - `clustering`: incremental grouping of flows with a shared motion
//! - `detector`: the stateful orchestrator tying the above together

pub mod clustering;
pub mod color;
pub mod detector;
pub mod flow3d;
pub mod reconstructor;
pub mod result;
pub mod state;

pub use clustering::{Cluster, ClusterThresholds, IncrementalClusterer};
pub use detector::{FlowInput, FrameInputs, MovingObjectDetector};
pub use flow3d::Flow3D;
pub use reconstructor::{Flow3dReconstructor, RejectionStats, Sampling};
pub use result::{DetectionMetrics, DetectionResult, MatchRecord, SkipReason, TimingStats};
pub use state::{FrameData, PreviousFrameState};
