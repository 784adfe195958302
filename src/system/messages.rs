//! Messages from the loader thread to the runner.

use anyhow::Result;

/// One decoded frame, or the error that prevented decoding it.
pub struct LoadedFrame<T> {
    /// Position in the sequence.
    pub index: usize,
    pub inputs: Result<T>,
}
