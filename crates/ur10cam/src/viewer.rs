//! The viewer: one scene, one camera, one renderer, one render loop.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use glam::Vec2;
use ur10cam_core::capture::{
    CaptureDevice, CaptureError, CapturePoll, CaptureRequest, FrameSource, MediaStream,
    VideoElement,
};
use ur10cam_core::model::{FetchPoll, ModelFetch, ModelLoadError};
use ur10cam_core::scene::{AmbientLight, Background, Scene, SceneNode, VideoTexture};
use ur10cam_core::{Result, ViewerError, ViewerOptions};
use ur10cam_render::{Camera, OrbitController, PointerButton, RenderResult, SceneRenderer};

use crate::frame_loop::FrameLoop;

/// Name of the ambient light node added on start.
pub const AMBIENT_LIGHT_NAME: &str = "ambient light";

/// Owns everything created by [`Viewer::start`] and released by [`Viewer::stop`].
pub struct Viewer<R: SceneRenderer> {
    options: ViewerOptions,
    scene: Scene,
    camera: Camera,
    controller: OrbitController,
    renderer: Option<R>,
    video: Option<Arc<VideoElement>>,
    fetch: Option<ModelFetch>,
    capture: Option<CaptureRequest>,
    frame_loop: FrameLoop,
}

impl<R: SceneRenderer> Viewer<R> {
    /// Creates an idle viewer. Nothing is allocated until [`start`](Self::start).
    pub fn new(options: ViewerOptions) -> Self {
        let camera = Camera::from_options(&options.camera, 1.0);
        let controller = OrbitController::new(&options.orbit);
        Self {
            options,
            scene: Scene::new(),
            camera,
            controller,
            renderer: None,
            video: None,
            fetch: None,
            capture: None,
            frame_loop: FrameLoop::new(),
        }
    }

    /// Builds the scene, camera and renderer, then starts the model load and
    /// the camera request. Neither waits; their results are picked up by
    /// [`frame`](Self::frame).
    ///
    /// Only renderer creation can fail; a missing or denied camera leaves the
    /// background unset.
    pub fn start<F>(&mut self, create_renderer: F, capture: Arc<dyn CaptureDevice>) -> Result<()>
    where
        F: FnOnce() -> RenderResult<R>,
    {
        if self.frame_loop.is_running() {
            return Err(ViewerError::AlreadyStarted);
        }

        let renderer = create_renderer().map_err(|e| ViewerError::RenderError(e.to_string()))?;
        let (width, height) = renderer.size();

        self.scene = Scene::new();
        self.camera = Camera::from_options(&self.options.camera, 1.0);
        self.camera.set_viewport(width, height);
        self.controller = OrbitController::new(&self.options.orbit);
        self.controller.set_viewport(width, height);
        self.renderer = Some(renderer);

        let light = AmbientLight {
            color: self.options.light.color,
            intensity: self.options.light.intensity,
        };
        self.scene.add(SceneNode::ambient_light(AMBIENT_LIGHT_NAME, light));

        let model_path = self.options.model.resolved_path();
        log::info!("loading model {}", model_path.display());
        self.fetch = Some(ModelFetch::spawn(model_path));

        self.capture = Some(CaptureRequest::spawn(capture));

        self.frame_loop.start();
        log::info!("viewer started at {width}x{height}");
        Ok(())
    }

    fn attach_capture(&mut self, result: std::result::Result<MediaStream, CaptureError>) {
        let stream = match result {
            Ok(stream) => stream,
            Err(CaptureError::Unavailable) => {
                log::debug!("no capture device available, background stays unset");
                return;
            }
            Err(e) => {
                log::debug!("camera stream not granted: {e}");
                return;
            }
        };

        let video = Arc::new(VideoElement::new());
        video.set_src_object(stream);
        video.play();

        let source: Arc<dyn FrameSource> = video.clone();
        self.scene.background = Some(Background::Video(VideoTexture::new(source)));
        self.video = Some(video);
        log::info!("camera stream bound to background");
    }

    /// Runs one iteration of the render loop.
    ///
    /// Returns whether another frame should be scheduled; always `false`
    /// after [`stop`](Self::stop).
    pub fn frame(&mut self) -> bool {
        if !self.frame_loop.tick() {
            return false;
        }

        self.poll_model();
        self.poll_capture();
        self.controller.update(&mut self.camera);

        if let Some(renderer) = self.renderer.as_mut() {
            if let Err(e) = renderer.render(&self.scene, &self.camera) {
                log::error!("frame failed: {e}");
            }
        }
        self.frame_loop.is_running()
    }

    fn poll_model(&mut self) {
        let Some(fetch) = self.fetch.as_mut() else {
            return;
        };
        match fetch.poll() {
            FetchPoll::Pending => {}
            FetchPoll::Ready(result) => {
                self.fetch = None;
                self.attach_model(result);
            }
            FetchPoll::Idle => self.fetch = None,
        }
    }

    fn poll_capture(&mut self) {
        let Some(request) = self.capture.as_mut() else {
            return;
        };
        match request.poll() {
            CapturePoll::Pending => {}
            CapturePoll::Ready(result) => {
                self.capture = None;
                self.attach_capture(result);
            }
            CapturePoll::Idle => self.capture = None,
        }
    }

    fn attach_model(&mut self, result: std::result::Result<SceneNode, ModelLoadError>) {
        match result {
            Ok(mut model) => {
                model.set_uniform_scale(self.options.model.scale);
                model.set_position(self.options.model.position);
                log::info!("model '{}' attached ({} nodes)", model.name, model.subtree_len());
                self.scene.add(model);
            }
            Err(e) => log::error!("failed to load model: {e}"),
        }
    }

    /// Blocks until a pending model load finishes and attaches it.
    ///
    /// The window loop never calls this; headless snapshots do.
    pub fn finish_loading(&mut self) {
        if !self.frame_loop.is_running() {
            return;
        }
        if let Some(fetch) = self.fetch.take() {
            if let Some(result) = fetch.wait() {
                self.attach_model(result);
            }
        }
    }

    /// Waits up to `timeout` for the camera request to be answered and binds
    /// a granted stream. The window loop never calls this; headless
    /// snapshots do.
    pub fn await_capture(&mut self, timeout: Duration) {
        if !self.frame_loop.is_running() {
            return;
        }
        let Some(request) = self.capture.as_mut() else {
            return;
        };
        match request.poll_timeout(timeout) {
            CapturePoll::Pending => log::debug!("camera not answered within {timeout:?}"),
            CapturePoll::Ready(result) => {
                self.capture = None;
                self.attach_capture(result);
            }
            CapturePoll::Idle => self.capture = None,
        }
    }

    /// Viewport resize. Ignored after stop and for zero sizes.
    pub fn on_resize(&mut self, width: u32, height: u32) {
        if !self.frame_loop.is_running() || width == 0 || height == 0 {
            return;
        }
        log::debug!("resize to {width}x{height}");
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.resize(width, height);
        }
        self.camera.set_viewport(width, height);
        self.controller.set_viewport(width, height);
    }

    pub fn pointer_down(&mut self, button: PointerButton, position: Vec2) {
        if self.frame_loop.is_running() {
            self.controller.pointer_down(button, position);
        }
    }

    pub fn pointer_move(&mut self, position: Vec2) {
        if self.frame_loop.is_running() {
            self.controller.pointer_move(position, &self.camera);
        }
    }

    pub fn pointer_up(&mut self) {
        self.controller.pointer_up();
    }

    /// Wheel input; positive zooms in.
    pub fn wheel(&mut self, amount: f32) {
        if self.frame_loop.is_running() {
            self.controller.wheel(amount);
        }
    }

    /// Tears everything down. Returns `false` if the viewer was not running.
    ///
    /// Cancels the model load and the camera request, ends the frame loop,
    /// stops every camera track, clears the scene and drops the renderer.
    pub fn stop(&mut self) -> bool {
        if !self.frame_loop.is_running() && self.renderer.is_none() {
            return false;
        }

        self.frame_loop.cancel();
        if let Some(mut fetch) = self.fetch.take() {
            fetch.cancel();
        }
        if let Some(mut request) = self.capture.take() {
            request.cancel();
        }
        if let Some(video) = self.video.take() {
            let stopped = video.release();
            log::debug!("stopped {stopped} camera track(s)");
        }
        self.controller.pointer_up();
        self.scene.clear();
        self.renderer = None;

        log::info!("viewer stopped");
        true
    }

    /// Renders the current view offscreen with the running renderer and
    /// saves it to `path` as PNG or JPEG.
    pub fn save_screenshot(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let Some(renderer) = self.renderer.as_mut() else {
            return Err(ViewerError::NotStarted);
        };
        let (width, height) = renderer.size();
        let pixels = renderer
            .capture_frame(&self.scene, &self.camera)
            .map_err(|e| ViewerError::RenderError(e.to_string()))?;
        ur10cam_render::save_image(path, &pixels, width, height)
            .map_err(|e| ViewerError::RenderError(format!("Failed to save image: {e}")))
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.frame_loop.is_running()
    }

    pub fn options(&self) -> &ViewerOptions {
        &self.options
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn controller(&self) -> &OrbitController {
        &self.controller
    }

    /// The renderer, present between start and stop.
    pub fn renderer(&self) -> Option<&R> {
        self.renderer.as_ref()
    }

    /// The video element bound to the background, if a stream was granted.
    pub fn video(&self) -> Option<&Arc<VideoElement>> {
        self.video.as_ref()
    }

    /// True while the model is still loading.
    #[must_use]
    pub fn model_pending(&self) -> bool {
        self.fetch.as_ref().is_some_and(ModelFetch::is_pending)
    }

    /// True while the camera request is unanswered.
    #[must_use]
    pub fn capture_pending(&self) -> bool {
        self.capture.as_ref().is_some_and(CaptureRequest::is_pending)
    }

    /// A handle on the running flag.
    pub fn frame_loop(&self) -> FrameLoop {
        self.frame_loop.clone()
    }
}

impl<R: SceneRenderer> Drop for Viewer<R> {
    fn drop(&mut self) {
        self.stop();
    }
}
