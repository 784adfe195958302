//! Point cloud types produced by the detector.

pub mod organized;
pub mod points;

pub use organized::OrganizedPointCloud;
pub use points::{ColoredPoint, LabeledPoint};
