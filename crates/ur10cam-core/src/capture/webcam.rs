//! Physical camera capture via nokhwa.

use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;
use nokhwa::pixel_format::RgbAFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;

use super::track::FrameProducer;
use super::{CaptureDevice, CaptureError, FrameSlot, MediaStream, ThreadTrack};

/// A system camera, opened on its own capture thread.
#[derive(Debug, Clone)]
pub struct WebcamCapture {
    pub index: u32,
}

impl WebcamCapture {
    pub fn new(index: u32) -> Self {
        Self { index }
    }
}

impl CaptureDevice for WebcamCapture {
    fn is_available(&self) -> bool {
        nokhwa::query(nokhwa::utils::ApiBackend::Auto).is_ok_and(|cameras| !cameras.is_empty())
    }

    fn request_video(&self) -> Result<MediaStream, CaptureError> {
        let frames = Arc::new(FrameSlot::new());
        let index = self.index;

        // The camera frame call blocks until the next frame, so no extra pacing.
        let track = ThreadTrack::spawn(
            format!("webcam {index}"),
            frames.clone(),
            Duration::ZERO,
            move || {
                let format = RequestedFormat::new::<RgbAFormat>(
                    RequestedFormatType::AbsoluteHighestFrameRate,
                );
                let mut camera = Camera::new(CameraIndex::Index(index), format)
                    .map_err(|e| CaptureError::Device(e.to_string()))?;
                camera
                    .open_stream()
                    .map_err(|_| CaptureError::PermissionDenied)?;

                let producer: FrameProducer = Box::new(move || {
                    let buffer = camera
                        .frame()
                        .map_err(|e| log::debug!("dropped webcam frame: {e}"))
                        .ok()?;
                    let decoded = buffer
                        .decode_image::<RgbAFormat>()
                        .map_err(|e| log::debug!("undecodable webcam frame: {e}"))
                        .ok()?;
                    // Rebuild through raw bytes; nokhwa may link another image version.
                    RgbaImage::from_raw(decoded.width(), decoded.height(), decoded.into_raw())
                });
                Ok(producer)
            },
        )?;

        Ok(MediaStream::new(vec![Box::new(track)], frames))
    }
}
