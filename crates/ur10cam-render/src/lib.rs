//! Rendering backend for ur10cam.
//!
//! This crate provides:
//! - the wgpu [`RenderEngine`] (windowed or headless) drawing the video
//!   background and scene meshes
//! - the perspective [`Camera`] and the [`OrbitController`] that drives it
//! - the [`SceneRenderer`] trait the viewer renders through
//! - screenshot encoding

pub mod camera;
pub mod engine;
pub mod error;
pub mod orbit;
pub mod renderer;
pub mod screenshot;

pub use camera::Camera;
pub use engine::RenderEngine;
pub use error::{RenderError, RenderResult};
pub use orbit::{OrbitController, PointerButton};
pub use renderer::SceneRenderer;
pub use screenshot::{next_screenshot_path, save_image, save_to_buffer, ScreenshotError};
