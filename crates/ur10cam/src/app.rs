//! Application window and event loop management.

use std::path::Path;
use std::sync::Arc;

use glam::Vec2;
use pollster::FutureExt;
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use ur10cam_core::capture::{create_capture_device, CaptureDevice};
use ur10cam_core::{Result, ViewerError, ViewerOptions};
use ur10cam_render::{next_screenshot_path, PointerButton, RenderEngine};

use crate::viewer::Viewer;

/// The windowed application state.
pub struct App {
    window: Option<Arc<Window>>,
    viewer: Viewer<RenderEngine>,
    capture: Arc<dyn CaptureDevice>,
    cursor: Vec2,
    close_requested: bool,
    error: Option<ViewerError>,
}

impl App {
    pub fn new(options: ViewerOptions) -> Self {
        let capture = create_capture_device(&options.capture);
        Self {
            window: None,
            viewer: Viewer::new(options),
            capture,
            cursor: Vec2::ZERO,
            close_requested: false,
            error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: ViewerError) {
        log::error!("{error}");
        self.error = Some(error);
        self.close_requested = true;
        event_loop.exit();
    }

    fn take_screenshot(&mut self) {
        let path = next_screenshot_path(Path::new("."));
        match self.viewer.save_screenshot(&path) {
            Ok(()) => log::info!("Screenshot saved to {}", path.display()),
            Err(e) => log::error!("Screenshot failed: {e}"),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_options = &self.viewer.options().window;
        let window_attributes = Window::default_attributes()
            .with_title(window_options.title.clone())
            .with_inner_size(LogicalSize::new(window_options.width, window_options.height));

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.fail(event_loop, ViewerError::Window(e.to_string()));
                return;
            }
        };

        let surface_window = window.clone();
        let started = self.viewer.start(
            || RenderEngine::new_windowed(surface_window).block_on(),
            self.capture.clone(),
        );
        if let Err(e) = started {
            self.fail(event_loop, e);
            return;
        }

        window.request_redraw();
        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                self.close_requested = true;
            }
            WindowEvent::Resized(size) => {
                self.viewer.on_resize(size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                if self.viewer.is_running() {
                    if let Some(window) = &self.window {
                        window.request_redraw();
                    }
                }
                self.viewer.frame();
            }
            WindowEvent::CursorMoved { position, .. } => {
                #[allow(clippy::cast_possible_truncation)]
                let cursor = Vec2::new(position.x as f32, position.y as f32);
                self.cursor = cursor;
                self.viewer.pointer_move(cursor);
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let button = match button {
                    MouseButton::Left => PointerButton::Primary,
                    MouseButton::Right => PointerButton::Secondary,
                    _ => return,
                };
                match state {
                    ElementState::Pressed => self.viewer.pointer_down(button, self.cursor),
                    ElementState::Released => self.viewer.pointer_up(),
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                #[allow(clippy::cast_possible_truncation)]
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 * 0.1,
                };
                self.viewer.wheel(scroll);
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed {
                    match event.physical_key {
                        PhysicalKey::Code(KeyCode::Escape) => {
                            self.close_requested = true;
                        }
                        PhysicalKey::Code(KeyCode::F12) => {
                            log::info!("Screenshot requested (F12)");
                            self.take_screenshot();
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }

        if self.close_requested {
            event_loop.exit();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.viewer.stop();
        self.window = None;
    }
}

/// Opens the viewer window and runs until it is closed.
pub fn run(options: ViewerOptions) -> Result<()> {
    let event_loop = EventLoop::new().map_err(|e| ViewerError::Window(e.to_string()))?;
    let mut app = App::new(options);

    event_loop
        .run_app(&mut app)
        .map_err(|e| ViewerError::Window(e.to_string()))?;

    app.viewer.stop();
    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
