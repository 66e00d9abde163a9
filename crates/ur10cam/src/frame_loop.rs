//! Cancellation token for the per-frame callback chain.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Shared running flag gating frame scheduling.
///
/// Clones observe the same state, so the window loop can hold a handle while
/// the viewer owns the original.
#[derive(Debug, Clone, Default)]
pub struct FrameLoop {
    running: Arc<AtomicBool>,
    frames: Arc<AtomicU64>,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the loop. Returns `false` if it was already running.
    pub fn start(&self) -> bool {
        !self.running.swap(true, Ordering::AcqRel)
    }

    /// Disarms the loop; no further frames are scheduled.
    pub fn cancel(&self) {
        self.running.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Marks the start of a frame. Returns `false` once cancelled.
    pub fn tick(&self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.frames.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Frames started since creation.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }
}
