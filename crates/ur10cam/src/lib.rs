//! ur10cam: a live camera feed with a UR10 robot arm model on top.
//!
//! The window shows the camera stream as a full-viewport background and the
//! arm, loaded from a glTF binary, in front of it. Drag with the left button
//! to orbit, the right button to pan, and scroll to zoom.
//!
//! # Quick Start
//!
//! ```no_run
//! use ur10cam::*;
//!
//! fn main() -> Result<()> {
//!     let _ = env_logger::try_init();
//!     run(ViewerOptions::default())
//! }
//! ```
//!
//! [`Viewer`] is the piece that holds the per-mount state; [`run`] wraps it
//! in a winit event loop and [`headless`] renders without a window.

mod app;
mod frame_loop;
pub mod headless;
mod viewer;

pub use app::{run, App};
pub use frame_loop::FrameLoop;
pub use headless::{render_to_file, render_to_image, snapshot};
pub use viewer::{Viewer, AMBIENT_LIGHT_NAME};

pub use ur10cam_core::{
    capture::{
        create_capture_device, CaptureDevice, CaptureError, CapturePoll, CaptureRequest, Frame,
        FrameSlot, FrameSource, ImageCapture, MediaStream, NoCapture, TestPatternCapture,
        TrackState, VideoElement, VideoTrack,
    },
    error::{Result, ViewerError},
    model::{import_gltf, FetchPoll, ModelFetch, ModelLoadError},
    options::{CaptureBackend, ViewerOptions},
    scene::{
        AmbientLight, Background, FilterMode, MeshData, NodeKind, Scene, SceneNode, Transform,
        VideoTexture,
    },
    Mat4, Quat, Vec2, Vec3, Vec4,
};
pub use ur10cam_render::{
    Camera, OrbitController, PointerButton, RenderEngine, RenderError, RenderResult,
    SceneRenderer,
};
