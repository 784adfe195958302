//! Axis conventions between the camera frame and the viewer frame.
//!
//! All detection happens in the current left camera frame (RDF):
//! ```text
//!        +Y (down)
//!         |
//!         +------ +X (right)
//!        /
//!      +Z (forward, optical axis)
//! ```
//! Viewers such as Rerun are easier to read in a Z-up frame (FLU):
//! X forward, Y left, Z up. Only visualization converts; the detector
//! itself never leaves camera coordinates.

use nalgebra::{Matrix3, Vector3};

/// Rotation from the camera frame (RDF) to the viewer frame (FLU).
///
/// Maps:
/// - Camera +Z (forward) → Viz +X (forward)
/// - Camera +X (right)   → Viz -Y (left)
/// - Camera +Y (down)    → Viz -Z (up)
#[rustfmt::skip]
pub fn rotation_viz_cam() -> Matrix3<f64> {
    Matrix3::new(
        0.0,  0.0, 1.0,
       -1.0,  0.0, 0.0,
        0.0, -1.0, 0.0,
    )
}

/// Transform a camera-frame position to the viewer frame.
pub fn camera_position_to_viz(p_cam: &Vector3<f64>) -> Vector3<f64> {
    rotation_viz_cam() * p_cam
}
