//! The main rendering engine.

mod background;
mod mesh;

use std::sync::Arc;

use ur10cam_core::scene::{Background, Scene};

use crate::camera::Camera;
use crate::error::{RenderError, RenderResult};
use crate::renderer::SceneRenderer;

pub use background::{BackgroundPass, VIDEO_FORMAT};
pub use mesh::{DrawUniforms, FrameUniforms, MeshPass};

/// Depth buffer format shared by every pipeline.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Offscreen color target: the only target in headless mode, the
/// screenshot target in windowed mode.
struct OffscreenTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

/// The main rendering engine backed by wgpu.
pub struct RenderEngine {
    /// The wgpu instance.
    pub instance: wgpu::Instance,
    /// The wgpu adapter.
    pub adapter: wgpu::Adapter,
    /// The wgpu device.
    pub device: wgpu::Device,
    /// The wgpu queue.
    pub queue: wgpu::Queue,
    /// The render surface (None for headless).
    pub surface: Option<wgpu::Surface<'static>>,
    /// Surface configuration.
    pub surface_config: wgpu::SurfaceConfiguration,
    /// Current render width.
    pub width: u32,
    /// Current render height.
    pub height: u32,
    /// Depth texture.
    pub depth_texture: wgpu::Texture,
    depth_view: wgpu::TextureView,
    offscreen: Option<OffscreenTarget>,
    background: BackgroundPass,
    meshes: MeshPass,
}

impl RenderEngine {
    /// Creates a new windowed render engine.
    pub async fn new_windowed(window: Arc<winit::window::Window>) -> RenderResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..wgpu::InstanceDescriptor::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| RenderError::AdapterCreationFailed)?;

        let (device, queue) = Self::request_device(&adapter, "ur10cam device").await?;

        let size = window.inner_size();
        let width = size.width.max(1);
        let height = size.height.max(1);

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(RenderError::SurfaceConfigurationFailed)?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        log::info!(
            "render engine ready: {} ({:?}), {width}x{height}, {surface_format:?}",
            adapter.get_info().name,
            adapter.get_info().backend
        );

        Ok(Self::assemble(
            instance,
            adapter,
            device,
            queue,
            Some(surface),
            surface_config,
        ))
    }

    /// Creates a new headless render engine.
    pub async fn new_headless(width: u32, height: u32) -> RenderResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..wgpu::InstanceDescriptor::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| RenderError::AdapterCreationFailed)?;

        let (device, queue) = Self::request_device(&adapter, "ur10cam device (headless)").await?;

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let mut engine = Self::assemble(instance, adapter, device, queue, None, surface_config);
        engine.offscreen = Some(engine.create_offscreen_target());
        Ok(engine)
    }

    async fn request_device(
        adapter: &wgpu::Adapter,
        label: &str,
    ) -> RenderResult<(wgpu::Device, wgpu::Queue)> {
        let pair = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some(label),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
            })
            .await?;
        Ok(pair)
    }

    fn assemble(
        instance: wgpu::Instance,
        adapter: wgpu::Adapter,
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface: Option<wgpu::Surface<'static>>,
        surface_config: wgpu::SurfaceConfiguration,
    ) -> Self {
        let width = surface_config.width;
        let height = surface_config.height;
        let (depth_texture, depth_view) = Self::create_depth_texture(&device, width, height);
        let background = BackgroundPass::new(&device, surface_config.format);
        let meshes = MeshPass::new(&device, surface_config.format);

        Self {
            instance,
            adapter,
            device,
            queue,
            surface,
            surface_config,
            width,
            height,
            depth_texture,
            depth_view,
            offscreen: None,
            background,
            meshes,
        }
    }

    /// Returns true if this engine renders into an offscreen texture.
    #[must_use]
    pub fn is_headless(&self) -> bool {
        self.surface.is_none()
    }

    /// Resizes the render target.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        self.width = width;
        self.height = height;
        self.surface_config.width = width;
        self.surface_config.height = height;

        if let Some(ref surface) = self.surface {
            surface.configure(&self.device, &self.surface_config);
        }

        let (depth_texture, depth_view) = Self::create_depth_texture(&self.device, width, height);
        self.depth_texture = depth_texture;
        self.depth_view = depth_view;

        if self.offscreen.is_some() {
            self.offscreen = Some(self.create_offscreen_target());
        }
    }

    fn create_depth_texture(
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> (wgpu::Texture, wgpu::TextureView) {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        (texture, view)
    }

    fn create_offscreen_target(&self) -> OffscreenTarget {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("offscreen color texture"),
            size: wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.surface_config.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        OffscreenTarget { texture, view }
    }

    fn clear_color(scene: &Scene) -> wgpu::Color {
        match &scene.background {
            Some(Background::Color(color)) => wgpu::Color {
                r: f64::from(color.x),
                g: f64::from(color.y),
                b: f64::from(color.z),
                a: 1.0,
            },
            _ => wgpu::Color::BLACK,
        }
    }

    /// Draws one frame of `scene` as seen from `camera`.
    ///
    /// A lost or outdated surface is reconfigured and the frame skipped.
    pub fn render_scene(&mut self, scene: &Scene, camera: &Camera) -> RenderResult<()> {
        let acquired = self.surface.as_ref().map(wgpu::Surface::get_current_texture);
        let output = match acquired {
            None => None,
            Some(Ok(output)) => Some(output),
            Some(Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                log::warn!("surface lost, reconfiguring");
                self.resize(self.width, self.height);
                return Ok(());
            }
            Some(Err(wgpu::SurfaceError::OutOfMemory)) => {
                log::error!("Out of memory");
                return Err(RenderError::OutOfMemory);
            }
            Some(Err(wgpu::SurfaceError::Timeout)) => {
                log::warn!("Surface timeout");
                return Ok(());
            }
            Some(Err(wgpu::SurfaceError::Other)) => {
                log::warn!("Surface error: other");
                return Ok(());
            }
        };

        let target_view = match (&output, &self.offscreen) {
            (Some(output), _) => output
                .texture
                .create_view(&wgpu::TextureViewDescriptor::default()),
            (None, Some(offscreen)) => offscreen.view.clone(),
            (None, None) => return Ok(()),
        };

        self.draw_into(scene, camera, &target_view);
        if let Some(output) = output {
            output.present();
        }
        Ok(())
    }

    /// Draws `scene` into an offscreen target and reads it back.
    ///
    /// A windowed engine creates its screenshot target on first use and keeps
    /// it sized with the window, reusing the device and the uploaded meshes.
    pub fn capture_frame(&mut self, scene: &Scene, camera: &Camera) -> RenderResult<Vec<u8>> {
        let view = match &self.offscreen {
            Some(offscreen) => offscreen.view.clone(),
            None => {
                let target = self.create_offscreen_target();
                let view = target.view.clone();
                self.offscreen = Some(target);
                view
            }
        };
        self.draw_into(scene, camera, &view);
        self.capture_to_buffer()
    }

    fn draw_into(&mut self, scene: &Scene, camera: &Camera, target_view: &wgpu::TextureView) {
        let draw_background = match &scene.background {
            Some(Background::Video(video)) => {
                self.background.prepare(&self.device, &self.queue, video)
            }
            _ => {
                self.background.clear();
                false
            }
        };
        self.meshes.prepare(&self.device, &self.queue, scene, camera);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("scene encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(Self::clear_color(scene)),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            if draw_background {
                self.background.draw(&mut pass);
            }
            self.meshes.draw(&mut pass);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn aligned_bytes_per_row(width: u32) -> u32 {
        let bytes_per_pixel = 4u32; // RGBA8
        let unaligned = width * bytes_per_pixel;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        unaligned.div_ceil(align) * align
    }

    /// Swaps BGRA readbacks into RGBA order. Other layouts are not 4-byte RGBA.
    fn to_rgba(format: wgpu::TextureFormat, pixels: &mut [u8]) -> RenderResult<()> {
        match format {
            wgpu::TextureFormat::Rgba8Unorm | wgpu::TextureFormat::Rgba8UnormSrgb => Ok(()),
            wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb => {
                for px in pixels.chunks_exact_mut(4) {
                    px.swap(0, 2);
                }
                Ok(())
            }
            other => {
                log::error!("cannot read back {other:?} pixels");
                Err(RenderError::ReadbackFailed)
            }
        }
    }

    /// Reads back the offscreen target as tightly packed RGBA rows.
    pub fn capture_to_buffer(&self) -> RenderResult<Vec<u8>> {
        let offscreen = self.offscreen.as_ref().ok_or(RenderError::NotHeadless)?;
        let bytes_per_row = Self::aligned_bytes_per_row(self.width);

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback buffer"),
            size: u64::from(bytes_per_row * self.height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("readback encoder"),
            });

        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &offscreen.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );

        self.queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = self.device.poll(wgpu::PollType::wait_indefinitely());
        rx.recv()
            .map_err(|_| RenderError::ReadbackFailed)?
            .map_err(|_| RenderError::ReadbackFailed)?;

        // Copy data, removing row padding
        let data = buffer_slice.get_mapped_range();
        let row_bytes = (self.width * 4) as usize;
        let mut result = Vec::with_capacity(row_bytes * self.height as usize);
        for row in 0..self.height {
            let start = (row * bytes_per_row) as usize;
            result.extend_from_slice(&data[start..start + row_bytes]);
        }

        drop(data);
        buffer.unmap();

        Self::to_rgba(self.surface_config.format, &mut result)?;
        Ok(result)
    }
}

impl SceneRenderer for RenderEngine {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32) {
        RenderEngine::resize(self, width, height);
    }

    fn render(&mut self, scene: &Scene, camera: &Camera) -> RenderResult<()> {
        self.render_scene(scene, camera)
    }

    fn capture_frame(&mut self, scene: &Scene, camera: &Camera) -> RenderResult<Vec<u8>> {
        RenderEngine::capture_frame(self, scene, camera)
    }
}
