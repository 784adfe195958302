pub mod camera;
pub mod cloud;
pub mod config;
pub mod detection;
pub mod frame;
pub mod geometry;
pub mod io;
pub mod system;
#[cfg(feature = "viz")]
pub mod viz;
