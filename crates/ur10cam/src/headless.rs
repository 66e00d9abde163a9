//! Headless rendering API.
//!
//! Renders a scene to an image buffer or file without opening a window.
//! Used for snapshots of a configuration and for integration tests.

use std::path::Path;
use std::time::{Duration, Instant};

use pollster::FutureExt;
use ur10cam_core::capture::{create_capture_device, FrameSource};
use ur10cam_core::scene::Scene;
use ur10cam_core::{Result, ViewerError, ViewerOptions};
use ur10cam_render::{Camera, RenderEngine};

use crate::viewer::Viewer;

/// Renders `scene` from `camera` to a raw RGBA pixel buffer.
///
/// The returned buffer has `width * height * 4` bytes, row by row from the
/// top-left.
pub fn render_to_image(
    scene: &Scene,
    camera: &Camera,
    width: u32,
    height: u32,
) -> Result<Vec<u8>> {
    let mut engine = RenderEngine::new_headless(width, height)
        .block_on()
        .map_err(|e| ViewerError::RenderError(format!("Failed to create headless engine: {e}")))?;

    engine
        .render_scene(scene, camera)
        .map_err(|e| ViewerError::RenderError(e.to_string()))?;
    engine
        .capture_to_buffer()
        .map_err(|e| ViewerError::RenderError(e.to_string()))
}

/// Renders `scene` from `camera` and saves it as PNG or JPEG.
pub fn render_to_file(
    path: impl AsRef<Path>,
    scene: &Scene,
    camera: &Camera,
    width: u32,
    height: u32,
) -> Result<()> {
    let data = render_to_image(scene, camera, width, height)?;
    ur10cam_render::save_image(path, &data, width, height)
        .map_err(|e| ViewerError::RenderError(format!("Failed to save image: {e}")))
}

/// How long a snapshot waits for the camera to answer, and then for its
/// first frame.
const FIRST_FRAME_TIMEOUT: Duration = Duration::from_secs(1);

/// Starts a headless viewer for `options`, waits for the model, the camera
/// and its first frame, and renders a single frame.
pub fn snapshot(options: ViewerOptions, width: u32, height: u32) -> Result<Vec<u8>> {
    let capture = create_capture_device(&options.capture);
    let mut viewer = Viewer::new(options);
    viewer.start(
        || RenderEngine::new_headless(width, height).block_on(),
        capture,
    )?;
    viewer.finish_loading();
    viewer.await_capture(FIRST_FRAME_TIMEOUT);
    if let Some(video) = viewer.video() {
        let deadline = Instant::now() + FIRST_FRAME_TIMEOUT;
        while video.current_frame().is_none() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
    }
    viewer.frame();

    let pixels = viewer
        .renderer()
        .ok_or(ViewerError::NotStarted)?
        .capture_to_buffer()
        .map_err(|e| ViewerError::RenderError(e.to_string()));
    viewer.stop();
    pixels
}
