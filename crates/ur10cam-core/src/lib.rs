//! Core abstractions for ur10cam.
//!
//! This crate holds everything the viewer needs that does not touch the GPU:
//! - [`Scene`] graph with transforms, meshes, an ambient light and a background slot
//! - glTF import and the cancellable background [`ModelFetch`]
//! - Camera capture: [`CaptureDevice`], the asynchronous [`CaptureRequest`],
//!   [`MediaStream`], [`VideoElement`], [`FrameSource`]
//! - [`ViewerOptions`] configuration

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Constructors return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

pub mod capture;
pub mod error;
pub mod model;
pub mod options;
pub mod scene;

pub use capture::{
    create_capture_device, CaptureDevice, CaptureError, CapturePoll, CaptureRequest, Frame,
    FrameSlot, FrameSource, MediaStream, TrackState, VideoElement, VideoTrack,
};
pub use error::{Result, ViewerError};
pub use model::{import_gltf, FetchPoll, ModelFetch, ModelLoadError};
pub use options::{CaptureBackend, ViewerOptions};
pub use scene::{
    AmbientLight, Background, FilterMode, MeshData, NodeKind, Scene, SceneNode, Transform,
    VideoTexture,
};

// Re-export glam types for convenience
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
