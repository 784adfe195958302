//! Geometry utilities: SE3 transforms and axis conventions.

pub mod frames;
pub mod se3;

pub use se3::SE3;
