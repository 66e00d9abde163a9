//! Scene mesh pass.

use std::collections::HashMap;
use std::num::NonZeroU64;
use std::sync::Arc;

use glam::Mat4;
use ur10cam_core::scene::{MeshData, Scene};
use wgpu::util::DeviceExt;

use super::DEPTH_FORMAT;
use crate::camera::Camera;

/// Per-frame uniforms shared by every draw.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub ambient: [f32; 4],
}

/// Per-draw uniforms, addressed with a dynamic offset.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawUniforms {
    pub model: [[f32; 4]; 4],
    pub base_color: [f32; 4],
}

const DRAW_UNIFORM_SIZE: u64 = std::mem::size_of::<DrawUniforms>() as u64;

/// Rounds `size` up to the next multiple of `alignment`.
fn align_to(size: u64, alignment: u64) -> u64 {
    size.div_ceil(alignment) * alignment
}

struct GpuMesh {
    // Held so the pointer key cannot be reused while cached.
    _source: Arc<MeshData>,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    used: bool,
}

struct DrawCall {
    mesh: usize,
    offset: u32,
}

/// Draws every mesh in the scene with its world transform and base color.
pub struct MeshPass {
    pipeline: wgpu::RenderPipeline,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    draw_layout: wgpu::BindGroupLayout,
    draw_buffer: wgpu::Buffer,
    draw_bind_group: wgpu::BindGroup,
    draw_capacity: u64,
    draw_stride: u64,
    meshes: HashMap<usize, GpuMesh>,
    draws: Vec<DrawCall>,
}

impl MeshPass {
    pub fn new(device: &wgpu::Device, output_format: wgpu::TextureFormat) -> Self {
        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Mesh Frame Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let draw_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Mesh Draw Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(DRAW_UNIFORM_SIZE),
                },
                count: None,
            }],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Mesh Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/mesh.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Pipeline Layout"),
            bind_group_layouts: &[&frame_layout, &draw_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Mesh Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: 12,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x3],
                }],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: output_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                // Double-sided.
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let frame_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("mesh frame uniforms"),
            contents: bytemuck::cast_slice(&[FrameUniforms {
                view_proj: Mat4::IDENTITY.to_cols_array_2d(),
                ambient: [1.0; 4],
            }]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Mesh Frame Bind Group"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        let draw_stride = align_to(
            DRAW_UNIFORM_SIZE,
            u64::from(device.limits().min_uniform_buffer_offset_alignment),
        );
        let draw_capacity = 16;
        let (draw_buffer, draw_bind_group) =
            Self::create_draw_buffer(device, &draw_layout, draw_capacity * draw_stride);

        Self {
            pipeline,
            frame_buffer,
            frame_bind_group,
            draw_layout,
            draw_buffer,
            draw_bind_group,
            draw_capacity,
            draw_stride,
            meshes: HashMap::new(),
            draws: Vec::new(),
        }
    }

    fn create_draw_buffer(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        size: u64,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("mesh draw uniforms"),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Mesh Draw Bind Group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(DRAW_UNIFORM_SIZE),
                }),
            }],
        });
        (buffer, bind_group)
    }

    fn upload_mesh(device: &wgpu::Device, mesh: &Arc<MeshData>) -> Option<GpuMesh> {
        if mesh.positions.is_empty() || mesh.indices.is_empty() {
            return None;
        }
        let positions: Vec<[f32; 3]> = mesh.positions.iter().map(|p| p.to_array()).collect();
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("mesh vertices"),
            contents: bytemuck::cast_slice(&positions),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("mesh indices"),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Some(GpuMesh {
            _source: Arc::clone(mesh),
            vertex_buffer,
            index_buffer,
            index_count: u32::try_from(mesh.indices.len()).ok()?,
            used: true,
        })
    }

    /// Uploads uniforms and any meshes not yet on the GPU.
    ///
    /// Cached meshes no longer referenced by the scene are released.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        scene: &Scene,
        camera: &Camera,
    ) {
        let frame = FrameUniforms {
            view_proj: camera.view_projection_matrix().to_cols_array_2d(),
            ambient: scene.ambient_radiance().extend(1.0).to_array(),
        };
        queue.write_buffer(&self.frame_buffer, 0, bytemuck::cast_slice(&[frame]));

        for mesh in self.meshes.values_mut() {
            mesh.used = false;
        }
        self.draws.clear();

        let mut uniforms = Vec::new();
        scene.visit_meshes(|mesh, world| {
            let key = Arc::as_ptr(mesh) as usize;
            if let Some(cached) = self.meshes.get_mut(&key) {
                cached.used = true;
            } else if let Some(uploaded) = Self::upload_mesh(device, mesh) {
                self.meshes.insert(key, uploaded);
            } else {
                return;
            }
            uniforms.push(DrawUniforms {
                model: world.to_cols_array_2d(),
                base_color: mesh.base_color.to_array(),
            });
            self.draws.push(DrawCall { mesh: key, offset: 0 });
        });
        self.meshes.retain(|_, mesh| mesh.used);

        let needed = uniforms.len() as u64;
        if needed > self.draw_capacity {
            self.draw_capacity = needed.next_power_of_two();
            let (buffer, bind_group) = Self::create_draw_buffer(
                device,
                &self.draw_layout,
                self.draw_capacity * self.draw_stride,
            );
            self.draw_buffer = buffer;
            self.draw_bind_group = bind_group;
        }

        let stride = usize::try_from(self.draw_stride).unwrap_or(256);
        let mut staging = vec![0u8; uniforms.len() * stride];
        for (i, (draw, uniform)) in self.draws.iter_mut().zip(&uniforms).enumerate() {
            let start = i * stride;
            staging[start..start + std::mem::size_of::<DrawUniforms>()]
                .copy_from_slice(bytemuck::bytes_of(uniform));
            draw.offset = u32::try_from(start).unwrap_or(u32::MAX);
        }
        if !staging.is_empty() {
            queue.write_buffer(&self.draw_buffer, 0, &staging);
        }
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        if self.draws.is_empty() {
            return;
        }
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.frame_bind_group, &[]);
        for draw in &self.draws {
            let Some(mesh) = self.meshes.get(&draw.mesh) else {
                continue;
            };
            pass.set_bind_group(1, &self.draw_bind_group, &[draw.offset]);
            pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..mesh.index_count, 0, 0..1);
        }
    }
}
