//! Frame prefetching: decode frame N+1 while frame N is being processed.
//!
//! A loader thread walks the sequence in order and hands frames to the
//! consumer over a bounded channel. The channel closes once the last frame
//! is sent, which ends iteration on the consumer side.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, SendTimeoutError, bounded};
use tracing::{debug, error};

use super::messages::LoadedFrame;
use super::shared_state::PipelineState;
use crate::detection::FrameInputs;
use crate::io::Sequence;

/// Frames decoded ahead of the consumer.
pub const DEFAULT_PREFETCH_CAPACITY: usize = 4;

/// How long a blocked send waits before re-checking for shutdown.
const SEND_TIMEOUT: Duration = Duration::from_millis(50);

pub struct FramePrefetcher<T: Send + 'static> {
    shared: Arc<PipelineState>,
    receiver: Receiver<LoadedFrame<T>>,
    handle: Option<JoinHandle<()>>,
}

impl FramePrefetcher<FrameInputs> {
    /// Prefetch every frame of `sequence`.
    pub fn for_sequence(sequence: Arc<Sequence>, capacity: usize) -> Self {
        let len = sequence.len();
        Self::spawn(len, capacity, move |idx| sequence.load_frame(idx))
    }
}

impl<T: Send + 'static> FramePrefetcher<T> {
    /// Spawn a loader that calls `load(0..len)` in order.
    pub fn spawn<F>(len: usize, capacity: usize, load: F) -> Self
    where
        F: Fn(usize) -> anyhow::Result<T> + Send + 'static,
    {
        let shared = PipelineState::new();
        let (sender, receiver) = bounded::<LoadedFrame<T>>(capacity.max(1));

        let thread_shared = shared.clone();
        let handle = thread::spawn(move || {
            for index in 0..len {
                if thread_shared.is_shutdown_requested() {
                    break;
                }
                let mut msg = LoadedFrame {
                    index,
                    inputs: load(index),
                };
                thread_shared.mark_loaded();

                // Block while the consumer is behind, but keep honoring shutdown
                loop {
                    match sender.send_timeout(msg, SEND_TIMEOUT) {
                        Ok(()) => break,
                        Err(SendTimeoutError::Timeout(back)) => {
                            if thread_shared.is_shutdown_requested() {
                                return;
                            }
                            msg = back;
                        }
                        Err(SendTimeoutError::Disconnected(_)) => return,
                    }
                }
            }
            debug!("Frame loader finished");
        });

        Self {
            shared,
            receiver,
            handle: Some(handle),
        }
    }

    pub fn shared_state(&self) -> &Arc<PipelineState> {
        &self.shared
    }

    /// Stop loading and wait for the loader thread.
    pub fn shutdown(&mut self) {
        self.shared.request_shutdown();
        if let Some(handle) = self.handle.take() {
            if let Err(panic) = handle.join() {
                error!("Frame loader thread panicked: {:?}", panic);
            }
        }
    }
}

impl<T: Send + 'static> Iterator for FramePrefetcher<T> {
    type Item = LoadedFrame<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.receiver.recv().ok()
    }
}

impl<T: Send + 'static> Drop for FramePrefetcher<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
