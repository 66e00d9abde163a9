//! Built-in capture devices.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use image::{Rgba, RgbaImage};

use super::track::FrameProducer;
use super::{CaptureDevice, CaptureError, FrameSlot, MediaStream, ThreadTrack};
use crate::options::{CaptureBackend, CaptureOptions};

/// A host without any capture capability.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCapture;

impl CaptureDevice for NoCapture {
    fn is_available(&self) -> bool {
        false
    }

    fn request_video(&self) -> Result<MediaStream, CaptureError> {
        Err(CaptureError::Unavailable)
    }
}

/// Synthetic camera producing a scrolling color gradient.
#[derive(Debug, Clone)]
pub struct TestPatternCapture {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
}

impl TestPatternCapture {
    pub fn new(width: u32, height: u32, frame_rate: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            frame_rate: frame_rate.max(1),
        }
    }

    /// Renders frame number `tick` of the pattern.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn pattern(width: u32, height: u32, tick: u32) -> RgbaImage {
        let shift = tick.wrapping_mul(4) % 256;
        RgbaImage::from_fn(width, height, |x, y| {
            let r = ((x * 255 / width.max(1) + shift) % 256) as u8;
            let g = (y * 255 / height.max(1)) as u8;
            let b = (255 - shift) as u8;
            Rgba([r, g, b, 255])
        })
    }
}

impl Default for TestPatternCapture {
    fn default() -> Self {
        Self::new(640, 480, 30)
    }
}

impl CaptureDevice for TestPatternCapture {
    fn is_available(&self) -> bool {
        true
    }

    fn request_video(&self) -> Result<MediaStream, CaptureError> {
        let frames = Arc::new(FrameSlot::new());
        let (width, height) = (self.width, self.height);
        let interval = Duration::from_secs(1) / self.frame_rate;

        let track = ThreadTrack::spawn("test pattern", frames.clone(), interval, move || {
            let mut tick = 0u32;
            let producer: FrameProducer = Box::new(move || {
                tick = tick.wrapping_add(1);
                Some(Self::pattern(width, height, tick))
            });
            Ok(producer)
        })?;

        Ok(MediaStream::new(vec![Box::new(track)], frames))
    }
}

/// Plays a still image as a single-frame stream.
#[derive(Debug, Clone)]
pub struct ImageCapture {
    pub path: PathBuf,
}

impl ImageCapture {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CaptureDevice for ImageCapture {
    fn is_available(&self) -> bool {
        self.path.is_file()
    }

    fn request_video(&self) -> Result<MediaStream, CaptureError> {
        let image = image::open(&self.path)?.to_rgba8();
        let frames = Arc::new(FrameSlot::new());
        let label = self.path.display().to_string();

        let track = ThreadTrack::spawn(label, frames.clone(), Duration::from_millis(100), move || {
            let mut image = Some(image);
            let producer: FrameProducer = Box::new(move || image.take());
            Ok(producer)
        })?;

        Ok(MediaStream::new(vec![Box::new(track)], frames))
    }
}

/// Builds the capture device named by the options.
pub fn create_capture_device(options: &CaptureOptions) -> Arc<dyn CaptureDevice> {
    match options.backend {
        CaptureBackend::None => Arc::new(NoCapture),
        CaptureBackend::TestPattern => Arc::new(TestPatternCapture::new(
            options.width,
            options.height,
            options.frame_rate,
        )),
        CaptureBackend::Image => match &options.image_path {
            Some(path) => Arc::new(ImageCapture::new(path)),
            None => {
                log::warn!("image capture selected without an image path");
                Arc::new(NoCapture)
            }
        },
        CaptureBackend::Webcam => webcam_device(options),
    }
}

#[cfg(feature = "webcam")]
fn webcam_device(options: &CaptureOptions) -> Arc<dyn CaptureDevice> {
    Arc::new(super::WebcamCapture::new(options.device_index))
}

// Built without camera support: behaves like a host with no capture.
#[cfg(not(feature = "webcam"))]
fn webcam_device(_options: &CaptureOptions) -> Arc<dyn CaptureDevice> {
    log::debug!("built without the `webcam` feature, no camera capture");
    Arc::new(NoCapture)
}
