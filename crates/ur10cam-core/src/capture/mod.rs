//! Camera capture: devices, media streams and the frames they produce.
//!
//! A [`CaptureDevice`] hands out a [`MediaStream`] when asked for video,
//! usually through a [`CaptureRequest`] so the asking thread never waits on
//! the device. The stream's tracks push frames into a shared [`FrameSlot`]; a
//! [`VideoElement`] bound to the stream exposes the latest frame through the
//! [`FrameSource`] trait, which is all the renderer sees.

mod devices;
mod request;
mod track;
mod video;
#[cfg(feature = "webcam")]
mod webcam;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use image::RgbaImage;
use thiserror::Error;

pub use devices::{create_capture_device, ImageCapture, NoCapture, TestPatternCapture};
pub use request::{CapturePoll, CaptureRequest};
pub use track::ThreadTrack;
pub use video::VideoElement;
#[cfg(feature = "webcam")]
pub use webcam::WebcamCapture;

/// Errors from acquiring a camera stream.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// The host has no capture capability.
    #[error("media capture is not available")]
    Unavailable,

    /// The user or the OS refused access.
    #[error("camera permission denied")]
    PermissionDenied,

    /// The device failed to open or stream.
    #[error("capture device error: {0}")]
    Device(String),

    /// A still image source could not be decoded.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

/// A single video frame, RGBA8.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Monotonic per-slot counter, starting at 1.
    pub sequence: u64,
    pub image: Arc<RgbaImage>,
}

impl Frame {
    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Raw RGBA bytes, row-major from the top-left.
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }
}

/// Anything that can be sampled for a current frame.
pub trait FrameSource: Send + Sync {
    /// The most recent frame, or `None` if nothing is playing yet.
    fn current_frame(&self) -> Option<Frame>;
}

/// Latest-frame mailbox shared between a producer thread and readers.
#[derive(Debug, Default)]
pub struct FrameSlot {
    latest: RwLock<Option<Frame>>,
    sequence: AtomicU64,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the latest frame.
    ///
    /// The sequence number is assigned under the write lock, so the stored
    /// frame always carries the highest sequence even with several producers.
    pub fn publish(&self, image: RgbaImage) {
        let image = Arc::new(image);
        let mut latest = self.latest.write().unwrap_or_else(PoisonError::into_inner);
        let sequence = self.sequence.fetch_add(1, Ordering::AcqRel) + 1;
        *latest = Some(Frame { sequence, image });
    }

    /// Returns the latest frame.
    pub fn latest(&self) -> Option<Frame> {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl FrameSource for FrameSlot {
    fn current_frame(&self) -> Option<Frame> {
        self.latest()
    }
}

/// Lifecycle state of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    Live,
    Stopped,
}

/// A hardware (or synthetic) video track owned by a stream.
pub trait VideoTrack: Send {
    fn label(&self) -> &str;
    fn state(&self) -> TrackState;
    /// Releases the underlying device. Idempotent.
    fn stop(&mut self);
}

/// A set of video tracks feeding one frame slot.
pub struct MediaStream {
    tracks: Vec<Box<dyn VideoTrack>>,
    frames: Arc<FrameSlot>,
}

impl MediaStream {
    pub fn new(tracks: Vec<Box<dyn VideoTrack>>, frames: Arc<FrameSlot>) -> Self {
        Self { tracks, frames }
    }

    pub fn tracks(&self) -> &[Box<dyn VideoTrack>] {
        &self.tracks
    }

    pub fn frames(&self) -> &Arc<FrameSlot> {
        &self.frames
    }

    /// True while any track is live.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.tracks.iter().any(|t| t.state() == TrackState::Live)
    }

    /// Stops every track and returns how many were live.
    pub fn stop_all(&mut self) -> usize {
        let mut stopped = 0;
        for track in &mut self.tracks {
            if track.state() == TrackState::Live {
                stopped += 1;
            }
            track.stop();
        }
        stopped
    }
}

impl Drop for MediaStream {
    fn drop(&mut self) {
        self.stop_all();
    }
}

impl std::fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let labels: Vec<&str> = self.tracks.iter().map(|t| t.label()).collect();
        f.debug_struct("MediaStream")
            .field("tracks", &labels)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Source of video-only media streams.
///
/// Both calls may block (device enumeration, a permission prompt), so the
/// viewer only makes them from a [`CaptureRequest`] worker.
pub trait CaptureDevice: Send + Sync {
    /// Whether the host exposes capture at all.
    fn is_available(&self) -> bool;

    /// Requests a video-only stream. May be refused.
    fn request_video(&self) -> Result<MediaStream, CaptureError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FlagTrack {
        live: bool,
    }

    impl VideoTrack for FlagTrack {
        fn label(&self) -> &str {
            "flag"
        }

        fn state(&self) -> TrackState {
            if self.live {
                TrackState::Live
            } else {
                TrackState::Stopped
            }
        }

        fn stop(&mut self) {
            self.live = false;
        }
    }

    #[test]
    fn test_frame_slot_sequence_increases() {
        let slot = FrameSlot::new();
        assert!(slot.latest().is_none());
        slot.publish(RgbaImage::new(2, 2));
        slot.publish(RgbaImage::new(4, 2));
        let frame = slot.current_frame().unwrap();
        assert_eq!(frame.sequence, 2);
        assert_eq!((frame.width(), frame.height()), (4, 2));
        assert_eq!(frame.pixels().len(), 4 * 2 * 4);
    }

    #[test]
    fn test_concurrent_publishers_keep_newest_sequence() {
        let slot = Arc::new(FrameSlot::new());
        let producers: Vec<_> = (0..4)
            .map(|_| {
                let slot = slot.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        slot.publish(RgbaImage::new(1, 1));
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }
        assert_eq!(slot.latest().unwrap().sequence, 200);
    }

    #[test]
    fn test_stop_all_counts_live_tracks() {
        let mut stream = MediaStream::new(
            vec![
                Box::new(FlagTrack { live: true }),
                Box::new(FlagTrack { live: false }),
            ],
            Arc::new(FrameSlot::new()),
        );
        assert!(stream.is_active());
        assert_eq!(stream.stop_all(), 1);
        assert!(!stream.is_active());
        assert_eq!(stream.stop_all(), 0);
    }
}
