//! Flags shared between the runner and the loader thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct PipelineState {
    /// Request the loader thread to stop after the current frame.
    pub shutdown_requested: AtomicBool,

    /// Frames decoded so far, successful or not.
    pub frames_loaded: AtomicUsize,
}

impl PipelineState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn request_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }

    pub fn mark_loaded(&self) {
        self.frames_loaded.fetch_add(1, Ordering::SeqCst);
    }

    pub fn frames_loaded(&self) -> usize {
        self.frames_loaded.load(Ordering::SeqCst)
    }
}
