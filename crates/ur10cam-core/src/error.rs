//! Error types for ur10cam.

use thiserror::Error;

use crate::capture::CaptureError;
use crate::model::ModelLoadError;

/// The main error type for ur10cam operations.
#[derive(Error, Debug)]
pub enum ViewerError {
    /// The viewer has not been started.
    #[error("viewer not started - call Viewer::start() first")]
    NotStarted,

    /// The viewer is already running.
    #[error("viewer already started")]
    AlreadyStarted,

    /// Loading the model asset failed.
    #[error("model load error: {0}")]
    ModelLoad(#[from] ModelLoadError),

    /// Acquiring a camera stream failed.
    #[error("capture error: {0}")]
    Capture(#[from] CaptureError),

    /// Rendering error.
    #[error("render error: {0}")]
    RenderError(String),

    /// Window or event loop failure.
    #[error("window error: {0}")]
    Window(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// A specialized Result type for ur10cam operations.
pub type Result<T> = std::result::Result<T, ViewerError>;
