//! Optional Rerun viewer output (feature `viz`).

pub mod rerun;

pub use self::rerun::RerunVisualizer;
