//! wgpu implementation of [`Renderer2D`].
//!
//! Draw calls are recorded into a [`DrawList`] during the frame. `prepare`
//! uploads whatever the recorded draws reference and packs their uniforms;
//! `render` replays them into a render pass.
//!
//! ```rust,ignore
//! let mut renderer = WgpuRenderer2D::new(&ctx, RendererSettings::default());
//! renderer.set_view_projection(Mat4::orthographic_rh(0.0, w, 0.0, h, -1.0, 1.0));
//! instance.render(&mut renderer);
//! renderer.render_to_view(&target_view);
//! ```

use std::num::NonZeroU64;
use std::path::Path;

use glam::{Affine2, Mat4, Vec4};
use rustc_hash::FxHashMap;

use super::context::GpuContext;
use super::pipeline::{ActorPipelines, DrawUniforms, GlobalUniforms, PipelineKey};
use super::resources::ResourceManager;
use super::settings::RendererSettings;
use crate::errors::Result;
use crate::renderer::{
    BlendMode, DrawList, GraphicsBuffer, MeshDraw, Renderer2D, TextureFlags, TextureRef,
};

/// Expands a 2D affine transform into the column-major 4x4 the shader expects.
#[must_use]
pub fn affine2_to_mat4(m: &Affine2) -> Mat4 {
    Mat4::from_cols(
        Vec4::new(m.matrix2.x_axis.x, m.matrix2.x_axis.y, 0.0, 0.0),
        Vec4::new(m.matrix2.y_axis.x, m.matrix2.y_axis.y, 0.0, 0.0),
        Vec4::Z,
        Vec4::new(m.translation.x, m.translation.y, 0.0, 1.0),
    )
}

struct PreparedDraw {
    key: PipelineKey,
    vertex_buffer: u64,
    deform_buffer: Option<u64>,
    index_buffer: u64,
    texture: u64,
    uniform_offset: u32,
    indices: std::ops::Range<u32>,
}

/// A growable buffer rewritten wholesale every frame.
struct FrameBuffer {
    buffer: wgpu::Buffer,
    capacity: u64,
    usage: wgpu::BufferUsages,
    label: &'static str,
}

impl FrameBuffer {
    fn new(device: &wgpu::Device, capacity: u64, usage: wgpu::BufferUsages, label: &'static str) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: capacity,
            usage,
            mapped_at_creation: false,
        });
        Self {
            buffer,
            capacity,
            usage,
            label,
        }
    }

    /// Returns `true` if the buffer had to be recreated.
    fn write(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, data: &[u8]) -> bool {
        let mut recreated = false;
        if data.len() as u64 > self.capacity {
            let capacity = (data.len() as u64).next_power_of_two();
            log::debug!("Growing {} from {} to {capacity} bytes", self.label, self.capacity);
            self.buffer.destroy();
            *self = Self::new(device, capacity, self.usage, self.label);
            recreated = true;
        }
        if !data.is_empty() {
            queue.write_buffer(&self.buffer, 0, data);
        }
        recreated
    }
}

pub struct WgpuRenderer2D {
    device: wgpu::Device,
    queue: wgpu::Queue,
    settings: RendererSettings,

    draw_list: DrawList,
    resources: ResourceManager,
    pipelines: ActorPipelines,

    view_projection: Mat4,
    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,

    uniform_stride: u64,
    draw_uniforms: FrameBuffer,
    bones: FrameBuffer,
    draw_bind_group: wgpu::BindGroup,

    texture_bind_groups: FxHashMap<u64, wgpu::BindGroup>,
    prepared: Vec<PreparedDraw>,
}

impl WgpuRenderer2D {
    #[must_use]
    pub fn new(ctx: &GpuContext, settings: RendererSettings) -> Self {
        let device = ctx.device.clone();
        let queue = ctx.queue.clone();

        let pipelines = ActorPipelines::new(&device, settings.color_format, settings.msaa_samples);
        let resources = ResourceManager::new(device.clone(), queue.clone(), settings.max_idle_frames);

        let globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Actor Globals"),
            size: std::mem::size_of::<GlobalUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Actor Globals BindGroup"),
            layout: &pipelines.globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
        });

        let alignment = u64::from(device.limits().min_uniform_buffer_offset_alignment);
        let uniform_stride = (std::mem::size_of::<DrawUniforms>() as u64).next_multiple_of(alignment);

        let draw_uniforms = FrameBuffer::new(
            &device,
            uniform_stride * 64,
            wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            "Actor Draw Uniforms",
        );
        let bones = FrameBuffer::new(
            &device,
            std::mem::size_of::<Mat4>() as u64 * 256,
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            "Actor Bone Matrices",
        );
        let draw_bind_group = Self::create_draw_bind_group(&device, &pipelines, &draw_uniforms, &bones);

        Self {
            device,
            queue,
            settings,
            draw_list: DrawList::new(),
            resources,
            pipelines,
            view_projection: Mat4::IDENTITY,
            globals_buffer,
            globals_bind_group,
            uniform_stride,
            draw_uniforms,
            bones,
            draw_bind_group,
            texture_bind_groups: FxHashMap::default(),
            prepared: Vec::new(),
        }
    }

    fn create_draw_bind_group(
        device: &wgpu::Device,
        pipelines: &ActorPipelines,
        draw_uniforms: &FrameBuffer,
        bones: &FrameBuffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Actor Draw BindGroup"),
            layout: &pipelines.draw_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: &draw_uniforms.buffer,
                        offset: 0,
                        size: NonZeroU64::new(std::mem::size_of::<DrawUniforms>() as u64),
                    }),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: bones.buffer.as_entire_binding(),
                },
            ],
        })
    }

    #[inline]
    pub fn set_view_projection(&mut self, view_projection: Mat4) {
        self.view_projection = view_projection;
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    /// The draws recorded so far this frame.
    #[inline]
    #[must_use]
    pub fn draw_list(&self) -> &DrawList {
        &self.draw_list
    }

    /// Uploads everything the recorded draws reference and packs their uniforms.
    pub fn prepare(&mut self) {
        self.prepared.clear();

        let globals = GlobalUniforms {
            view_projection: self.view_projection.to_cols_array_2d(),
        };
        self.queue
            .write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&globals));

        let stride = self.uniform_stride as usize;
        let mut uniform_bytes = Vec::with_capacity(self.draw_list.commands().len() * stride);
        let mut bone_matrices: Vec<[[f32; 4]; 4]> = Vec::new();

        for command in self.draw_list.commands() {
            let key = PipelineKey {
                variant: command.variant,
                blend_mode: command.blend_mode,
            };
            self.pipelines.ensure(&self.device, key);

            self.resources.prepare_buffer(&command.vertex_buffer);
            self.resources.prepare_buffer(&command.index_buffer);
            if let Some(deform) = &command.deform_buffer {
                self.resources.prepare_buffer(deform);
            }
            self.resources.prepare_texture(&command.texture);

            if !self.texture_bind_groups.contains_key(&command.texture.id)
                && let Some(gpu_tex) = self.resources.get_texture(&command.texture)
            {
                let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Actor Atlas BindGroup"),
                    layout: &self.pipelines.texture_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(&gpu_tex.view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::Sampler(&gpu_tex.sampler),
                        },
                    ],
                });
                self.texture_bind_groups.insert(command.texture.id, bind_group);
            }

            let uniforms = DrawUniforms {
                world: affine2_to_mat4(&command.transform).to_cols_array_2d(),
                color: command.color.to_array(),
                opacity: command.opacity,
                bone_offset: bone_matrices.len() as u32,
                bone_count: command.bone_matrices.len() as u32,
                _pad: 0,
            };
            bone_matrices.extend(
                command
                    .bone_matrices
                    .iter()
                    .map(|bone| affine2_to_mat4(bone).to_cols_array_2d()),
            );

            let uniform_offset = uniform_bytes.len() as u32;
            uniform_bytes.extend_from_slice(bytemuck::bytes_of(&uniforms));
            uniform_bytes.resize(uniform_offset as usize + stride, 0);

            self.prepared.push(PreparedDraw {
                key,
                vertex_buffer: command.vertex_buffer.id(),
                deform_buffer: command.deform_buffer.as_ref().map(GraphicsBuffer::id),
                index_buffer: command.index_buffer.id(),
                texture: command.texture.id,
                uniform_offset,
                indices: command.index_range(),
            });
        }

        if bone_matrices.is_empty() {
            bone_matrices.push(Mat4::IDENTITY.to_cols_array_2d());
        }

        let uniforms_recreated =
            self.draw_uniforms
                .write(&self.device, &self.queue, &uniform_bytes);
        let bones_recreated = self.bones.write(
            &self.device,
            &self.queue,
            bytemuck::cast_slice(&bone_matrices),
        );
        if uniforms_recreated || bones_recreated {
            self.draw_bind_group = Self::create_draw_bind_group(
                &self.device,
                &self.pipelines,
                &self.draw_uniforms,
                &self.bones,
            );
        }
    }

    /// Replays the prepared draws. Call after [`Self::prepare`].
    pub fn render(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_bind_group(0, &self.globals_bind_group, &[]);

        for draw in &self.prepared {
            let Some(pipeline) = self.pipelines.get(draw.key) else {
                continue;
            };
            let (Some(vertex), Some(index), Some(texture_bg)) = (
                self.resources.gpu_buffers.get(&draw.vertex_buffer),
                self.resources.gpu_buffers.get(&draw.index_buffer),
                self.texture_bind_groups.get(&draw.texture),
            ) else {
                log::trace!("Skipping draw with missing GPU resources");
                continue;
            };

            pass.set_pipeline(pipeline);
            pass.set_bind_group(1, &self.draw_bind_group, &[draw.uniform_offset]);
            pass.set_bind_group(2, texture_bg, &[]);
            pass.set_vertex_buffer(0, vertex.buffer.slice(..));
            if let Some(deform_id) = draw.deform_buffer {
                let Some(deform) = self.resources.gpu_buffers.get(&deform_id) else {
                    continue;
                };
                pass.set_vertex_buffer(1, deform.buffer.slice(..));
            }
            pass.set_index_buffer(index.buffer.slice(..), wgpu::IndexFormat::Uint16);
            pass.draw_indexed(draw.indices.clone(), 0, 0..1);
        }
    }

    /// Prepares, clears `view` to the configured color, renders and submits.
    pub fn render_to_view(&mut self, view: &wgpu::TextureView) {
        self.prepare();

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Actor Encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Actor Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.settings.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                ..Default::default()
            });
            self.render(&mut pass);
        }
        self.queue.submit(std::iter::once(encoder.finish()));

        self.finish_frame();
    }

    /// Clears the recorded draws and releases resources idle for too long.
    pub fn finish_frame(&mut self) {
        self.draw_list.clear();
        self.prepared.clear();
        for texture_id in self.resources.next_frame() {
            self.texture_bind_groups.remove(&texture_id);
        }
    }
}

impl Renderer2D for WgpuRenderer2D {
    fn make_texture(&mut self, path: &Path, flags: TextureFlags) -> Result<TextureRef> {
        let texture = self.draw_list.make_texture(path, flags)?;
        self.resources.prepare_texture(&texture);
        Ok(texture)
    }

    fn make_vertex_buffer(&mut self) -> GraphicsBuffer {
        self.draw_list.make_vertex_buffer()
    }

    fn make_index_buffer(&mut self) -> GraphicsBuffer {
        self.draw_list.make_index_buffer()
    }

    fn set_blend_mode(&mut self, mode: BlendMode) {
        self.draw_list.set_blend_mode(mode);
    }

    fn draw_textured(&mut self, mesh: MeshDraw<'_>) {
        self.draw_list.draw_textured(mesh);
    }

    fn draw_textured_and_deformed(&mut self, mesh: MeshDraw<'_>, deform_buffer: &GraphicsBuffer) {
        self.draw_list.draw_textured_and_deformed(mesh, deform_buffer);
    }

    fn draw_textured_skin(&mut self, mesh: MeshDraw<'_>, bone_matrices: &[Affine2]) {
        self.draw_list.draw_textured_skin(mesh, bone_matrices);
    }

    fn draw_textured_skin_and_deformed(
        &mut self,
        mesh: MeshDraw<'_>,
        deform_buffer: &GraphicsBuffer,
        bone_matrices: &[Affine2],
    ) {
        self.draw_list
            .draw_textured_skin_and_deformed(mesh, deform_buffer, bone_matrices);
    }
}
