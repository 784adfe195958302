//! Pipeline threading: a loader thread feeding frames to the detector.

pub mod messages;
pub mod prefetcher;
pub mod shared_state;

pub use messages::LoadedFrame;
pub use prefetcher::{DEFAULT_PREFETCH_CAPACITY, FramePrefetcher};
pub use shared_state::PipelineState;
