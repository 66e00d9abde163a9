//! Configuration options for the viewer.

use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Top-level viewer configuration.
///
/// Every field has a default, so a config file only needs to name the values
/// it overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerOptions {
    /// Window settings.
    pub window: WindowOptions,
    /// Initial camera projection and placement.
    pub camera: CameraOptions,
    /// Ambient light.
    pub light: LightOptions,
    /// Model asset and its placement.
    pub model: ModelOptions,
    /// Orbit controller tuning.
    pub orbit: OrbitOptions,
    /// Camera capture source for the background.
    pub capture: CaptureOptions,
}

impl ViewerOptions {
    /// Reads options from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Parses options from a JSON string.
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Window settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowOptions {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            title: "UR10 Webcam".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// Perspective camera settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraOptions {
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    /// Near clipping plane.
    pub near: f32,
    /// Far clipping plane.
    pub far: f32,
    /// Initial camera position. The camera looks at the origin.
    pub position: Vec3,
}

impl Default for CameraOptions {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            near: 0.1,
            far: 1000.0,
            position: Vec3::new(0.0, 0.0, 5.0),
        }
    }
}

/// Ambient light settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightOptions {
    pub color: Vec3,
    pub intensity: f32,
}

impl Default for LightOptions {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            intensity: 1.0,
        }
    }
}

/// Model asset settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelOptions {
    /// Directory the asset path is resolved against.
    pub asset_root: PathBuf,
    /// Model path relative to `asset_root`.
    pub path: PathBuf,
    /// Uniform scale applied to the loaded model.
    pub scale: f32,
    /// Translation applied to the loaded model.
    pub position: Vec3,
}

impl ModelOptions {
    /// Returns the full path of the model file.
    pub fn resolved_path(&self) -> PathBuf {
        self.asset_root.join(&self.path)
    }
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("assets"),
            path: PathBuf::from("model/UR10Rigging_v2.glb"),
            scale: 0.1,
            position: Vec3::new(0.0, -3.0, 0.0),
        }
    }
}

/// Orbit controller settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitOptions {
    /// Keep orbiting with decaying speed after input ends.
    pub enable_damping: bool,
    /// Fraction of the remaining motion applied (and removed) per update.
    pub damping_factor: f32,
    /// Pan in screen space instead of the horizontal plane.
    pub screen_space_panning: bool,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Polar angle limits in radians, measured from the up axis.
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
}

impl Default for OrbitOptions {
    fn default() -> Self {
        Self {
            enable_damping: true,
            damping_factor: 0.25,
            screen_space_panning: false,
            min_distance: 1.0,
            max_distance: 1000.0,
            min_polar_angle: 0.0,
            max_polar_angle: std::f32::consts::FRAC_PI_2,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
        }
    }
}

/// Where background frames come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CaptureBackend {
    /// No capture capability; the background stays unset.
    None,
    /// Synthetic animated frames.
    TestPattern,
    /// A still image file played as a stream.
    Image,
    /// A physical camera. Without the `webcam` feature this behaves like
    /// [`CaptureBackend::None`].
    #[default]
    Webcam,
}

/// Camera capture settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureOptions {
    pub backend: CaptureBackend,
    /// Image file used by [`CaptureBackend::Image`].
    pub image_path: Option<PathBuf>,
    /// Device index used by [`CaptureBackend::Webcam`].
    pub device_index: u32,
    /// Frame size produced by [`CaptureBackend::TestPattern`].
    pub width: u32,
    pub height: u32,
    /// Target frame rate for synthetic sources.
    pub frame_rate: u32,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            backend: CaptureBackend::default(),
            image_path: None,
            device_index: 0,
            width: 640,
            height: 480,
            frame_rate: 30,
        }
    }
}
