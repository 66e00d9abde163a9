//! Rendering error types.

use thiserror::Error;

/// Errors that can occur during rendering operations.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Failed to create wgpu adapter.
    #[error("failed to create graphics adapter")]
    AdapterCreationFailed,

    /// Failed to create wgpu device.
    #[error("failed to create graphics device: {0}")]
    DeviceCreationFailed(#[from] wgpu::RequestDeviceError),

    /// Failed to create surface.
    #[error("failed to create surface: {0}")]
    SurfaceCreationFailed(#[from] wgpu::CreateSurfaceError),

    /// The adapter cannot present to the surface.
    #[error("surface configuration failed")]
    SurfaceConfigurationFailed,

    /// Out of memory.
    #[error("out of memory")]
    OutOfMemory,

    /// Reading back the rendered image failed.
    #[error("frame readback failed")]
    ReadbackFailed,

    /// Operation requires an offscreen target.
    #[error("engine has no offscreen target")]
    NotHeadless,
}

/// A specialized Result type for rendering operations.
pub type RenderResult<T> = std::result::Result<T, RenderError>;
