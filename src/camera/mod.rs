//! Camera projection model.

pub mod pinhole;

pub use pinhole::CameraModel;
