//! Per-frame image data: disparity maps, depth images and optical flow fields.
//!
//! Everything here is aligned to the rectified left image and indexed by
//! integer pixel coordinates `(u, v)` = (column, row). Lookups never panic:
//! out-of-bounds and invalid samples come back as `None`.

pub mod depth;
pub mod disparity;
pub mod flow;
pub mod grid;

pub use depth::{DepthEncoding, DepthFrame};
pub use disparity::{DisparityFrame, StereoParams};
pub use flow::{FlowField, FlowMatch};
pub use grid::Grid;

use thiserror::Error;

/// Errors raised while building a frame from raw buffers.
#[derive(Debug, Error, PartialEq)]
pub enum FrameError {
    #[error("unsupported depth encoding [{0}]")]
    UnsupportedEncoding(String),

    #[error("buffer holds {actual} samples, expected {width}x{height}")]
    SizeMismatch {
        width: usize,
        height: usize,
        actual: usize,
    },

    #[error("invalid disparity range [{min}, {max}]")]
    InvalidDisparityRange { min: f32, max: f32 },
}
