//! The seam between the viewer and a concrete renderer.

use ur10cam_core::scene::Scene;

use crate::camera::Camera;
use crate::error::RenderResult;

/// Something that draws a [`Scene`] into a sized surface.
///
/// [`RenderEngine`](crate::RenderEngine) is the wgpu implementation. Dropping
/// the renderer releases its surface.
pub trait SceneRenderer {
    /// Current drawing size in physical pixels.
    fn size(&self) -> (u32, u32);

    /// Resizes the drawing surface. Zero sizes are ignored.
    fn resize(&mut self, width: u32, height: u32);

    /// Draws one frame.
    fn render(&mut self, scene: &Scene, camera: &Camera) -> RenderResult<()>;

    /// Draws one frame offscreen at the current size and reads it back as
    /// tightly packed RGBA rows.
    fn capture_frame(&mut self, scene: &Scene, camera: &Camera) -> RenderResult<Vec<u8>>;
}

impl<R: SceneRenderer + ?Sized> SceneRenderer for Box<R> {
    fn size(&self) -> (u32, u32) {
        (**self).size()
    }

    fn resize(&mut self, width: u32, height: u32) {
        (**self).resize(width, height);
    }

    fn render(&mut self, scene: &Scene, camera: &Camera) -> RenderResult<()> {
        (**self).render(scene, camera)
    }

    fn capture_frame(&mut self, scene: &Scene, camera: &Camera) -> RenderResult<Vec<u8>> {
        (**self).capture_frame(scene, camera)
    }
}
