//! Dataset loading and result export.

pub mod export;
pub mod flo;
pub mod pfm;
pub mod sequence;

pub use export::ResultExporter;
pub use sequence::{Calibration, Sequence};
