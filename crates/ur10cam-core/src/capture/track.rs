//! Video track backed by a producer thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use std::time::Duration;

use image::RgbaImage;

use super::{CaptureError, FrameSlot, TrackState, VideoTrack};

/// Produces the next frame, or `None` when there is nothing new.
pub type FrameProducer = Box<dyn FnMut() -> Option<RgbaImage>>;

/// A track whose frames are produced on a dedicated thread.
///
/// The producer is built on that thread, so device handles that are not
/// `Send` never cross threads.
pub struct ThreadTrack {
    label: String,
    stop_flag: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ThreadTrack {
    /// Starts the producer thread and waits for the producer to open.
    pub fn spawn<F>(
        label: impl Into<String>,
        frames: Arc<FrameSlot>,
        interval: Duration,
        open: F,
    ) -> Result<Self, CaptureError>
    where
        F: FnOnce() -> Result<FrameProducer, CaptureError> + Send + 'static,
    {
        let label = label.into();
        let stop_flag = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);

        let thread_stop = stop_flag.clone();
        let handle = std::thread::Builder::new()
            .name(format!("capture: {label}"))
            .spawn(move || {
                let mut producer = match open() {
                    Ok(producer) => {
                        let _ = ready_tx.send(Ok(()));
                        producer
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                while !thread_stop.load(Ordering::Acquire) {
                    if let Some(image) = producer() {
                        frames.publish(image);
                    }
                    std::thread::sleep(interval);
                }
            })
            .map_err(|e| CaptureError::Device(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                label,
                stop_flag,
                handle: Some(handle),
            }),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(CaptureError::Device(format!("{label}: capture thread exited")))
            }
        }
    }
}

impl VideoTrack for ThreadTrack {
    fn label(&self) -> &str {
        &self.label
    }

    fn state(&self) -> TrackState {
        if self.handle.is_some() {
            TrackState::Live
        } else {
            TrackState::Stopped
        }
    }

    fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("capture thread '{}' panicked", self.label);
            }
            log::debug!("track '{}' stopped", self.label);
        }
    }
}

impl Drop for ThreadTrack {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_publishes_and_stops() {
        let frames = Arc::new(FrameSlot::new());
        let mut track = ThreadTrack::spawn("test", frames.clone(), Duration::from_millis(1), || {
            Ok(Box::new(|| Some(RgbaImage::new(8, 8))) as FrameProducer)
        })
        .unwrap();
        assert_eq!(track.state(), TrackState::Live);

        for _ in 0..200 {
            if frames.latest().is_some() {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(frames.latest().is_some());

        track.stop();
        assert_eq!(track.state(), TrackState::Stopped);
        let last = frames.latest().unwrap().sequence;
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(frames.latest().unwrap().sequence, last);
    }

    #[test]
    fn test_open_failure_is_reported() {
        let frames = Arc::new(FrameSlot::new());
        let result = ThreadTrack::spawn("denied", frames, Duration::from_millis(1), || {
            Err(CaptureError::PermissionDenied)
        });
        assert!(matches!(result, Err(CaptureError::PermissionDenied)));
    }
}
