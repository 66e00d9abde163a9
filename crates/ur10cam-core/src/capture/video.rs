//! Hidden video element that plays a media stream.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{Frame, FrameSource, MediaStream};

/// Plays a [`MediaStream`] and exposes its current frame.
///
/// Never shown on its own; it exists so the background texture has a frame
/// source to sample.
#[derive(Debug, Default)]
pub struct VideoElement {
    stream: Mutex<Option<MediaStream>>,
    playing: AtomicBool,
}

impl VideoElement {
    pub fn new() -> Self {
        Self::default()
    }

    fn stream(&self) -> MutexGuard<'_, Option<MediaStream>> {
        self.stream.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Binds a stream, replacing (and stopping) any previous one.
    pub fn set_src_object(&self, stream: MediaStream) {
        let previous = self.stream().replace(stream);
        if let Some(mut previous) = previous {
            previous.stop_all();
        }
    }

    /// Starts playback. Returns `false` if no stream is bound.
    pub fn play(&self) -> bool {
        let has_stream = self.stream().is_some();
        self.playing.store(has_stream, Ordering::Release);
        has_stream
    }

    pub fn pause(&self) {
        self.playing.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    /// True while a stream is bound.
    #[must_use]
    pub fn has_stream(&self) -> bool {
        self.stream().is_some()
    }

    /// Stops every track of the bound stream and unbinds it.
    ///
    /// Returns the number of tracks that were live.
    pub fn release(&self) -> usize {
        self.pause();
        match self.stream().take() {
            Some(mut stream) => stream.stop_all(),
            None => 0,
        }
    }
}

impl FrameSource for VideoElement {
    fn current_frame(&self) -> Option<Frame> {
        if !self.is_playing() {
            return None;
        }
        self.stream().as_ref().and_then(|s| s.frames().latest())
    }
}
