//! Camera stream request running off the caller's thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

use super::{CaptureDevice, CaptureError, MediaStream};

/// Result of polling a [`CaptureRequest`].
#[derive(Debug)]
pub enum CapturePoll {
    /// The device has not answered yet.
    Pending,
    /// The device answered; handed over exactly once.
    Ready(Result<MediaStream, CaptureError>),
    /// Nothing to wait for: already delivered or cancelled.
    Idle,
}

/// A stream request in flight on a worker thread.
///
/// The device may take arbitrarily long (or never answer) while the user
/// decides on a permission prompt. A stream granted after
/// [`cancel`](Self::cancel) is stopped by the worker and never delivered.
pub struct CaptureRequest {
    receiver: Option<Receiver<Result<MediaStream, CaptureError>>>,
    cancelled: Arc<AtomicBool>,
}

impl CaptureRequest {
    /// Asks `device` for a video-only stream in the background.
    ///
    /// A device without capture capability answers with
    /// [`CaptureError::Unavailable`].
    pub fn spawn(device: Arc<dyn CaptureDevice>) -> Self {
        let (tx, rx) = mpsc::channel();
        let cancelled = Arc::new(AtomicBool::new(false));

        let worker_cancelled = cancelled.clone();
        let spawned = std::thread::Builder::new()
            .name("capture request".into())
            .spawn(move || {
                let result = if device.is_available() {
                    device.request_video()
                } else {
                    Err(CaptureError::Unavailable)
                };
                if worker_cancelled.load(Ordering::Acquire) {
                    if let Ok(mut stream) = result {
                        let stopped = stream.stop_all();
                        log::debug!("stopped {stopped} track(s) granted after cancel");
                    }
                    return;
                }
                // A receiver dropped in the meantime drops the stream, which
                // stops its tracks.
                let _ = tx.send(result);
            });

        let receiver = match spawned {
            Ok(_) => rx,
            Err(e) => {
                let (tx, rx) = mpsc::channel();
                let _ = tx.send(Err(CaptureError::Device(e.to_string())));
                rx
            }
        };

        Self {
            receiver: Some(receiver),
            cancelled,
        }
    }

    /// True until the answer is delivered or the request is cancelled.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.receiver.is_some()
    }

    /// Checks for an answer without blocking.
    pub fn poll(&mut self) -> CapturePoll {
        let Some(receiver) = &self.receiver else {
            return CapturePoll::Idle;
        };
        match receiver.try_recv() {
            Ok(result) => {
                self.receiver = None;
                CapturePoll::Ready(result)
            }
            Err(TryRecvError::Empty) => CapturePoll::Pending,
            Err(TryRecvError::Disconnected) => self.disconnected(),
        }
    }

    /// Waits up to `timeout` for an answer.
    pub fn poll_timeout(&mut self, timeout: Duration) -> CapturePoll {
        let Some(receiver) = &self.receiver else {
            return CapturePoll::Idle;
        };
        match receiver.recv_timeout(timeout) {
            Ok(result) => {
                self.receiver = None;
                CapturePoll::Ready(result)
            }
            Err(RecvTimeoutError::Timeout) => CapturePoll::Pending,
            Err(RecvTimeoutError::Disconnected) => self.disconnected(),
        }
    }

    fn disconnected(&mut self) -> CapturePoll {
        self.receiver = None;
        if self.cancelled.load(Ordering::Acquire) {
            CapturePoll::Idle
        } else {
            CapturePoll::Ready(Err(CaptureError::Device(
                "capture worker exited without an answer".into(),
            )))
        }
    }

    /// Abandons the request. A late stream is stopped, never delivered.
    pub fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::Release);
        if self.receiver.take().is_some() {
            log::debug!("cancelled camera request");
        }
    }
}

impl Drop for CaptureRequest {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for CaptureRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureRequest")
            .field("pending", &self.is_pending())
            .finish()
    }
}
