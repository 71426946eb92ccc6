//! Actor render pipelines, one per (draw variant, blend mode).

use std::borrow::Cow;
use std::num::NonZeroU64;

use rustc_hash::FxHashMap;

use super::shader_gen::ShaderGenerator;
use crate::model::{DEFORM_VERTEX_STRIDE, SKINNED_VERTEX_STRIDE, VERTEX_STRIDE};
use crate::renderer::{BlendMode, DrawVariant};

const FLOAT_SIZE: u64 = std::mem::size_of::<f32>() as u64;

/// Per-draw uniform block, bound with a dynamic offset.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawUniforms {
    pub world: [[f32; 4]; 4],
    pub color: [f32; 4],
    pub opacity: f32,
    /// First entry of this draw's bones in the frame's bone storage buffer.
    pub bone_offset: u32,
    /// Bone indices at or past this count skin with the identity.
    pub bone_count: u32,
    pub _pad: u32,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GlobalUniforms {
    pub view_projection: [[f32; 4]; 4],
}

const BASE_ATTRIBUTES: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
    0 => Float32x2,
    1 => Float32x2,
];

const SKINNED_ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
    0 => Float32x2,
    1 => Float32x2,
    2 => Float32x4,
    3 => Float32x4,
];

const DEFORM_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![
    4 => Float32x2,
];

fn vertex_layouts(variant: DrawVariant) -> Vec<wgpu::VertexBufferLayout<'static>> {
    let mut layouts = Vec::with_capacity(2);
    if variant.is_skinned() {
        layouts.push(wgpu::VertexBufferLayout {
            array_stride: SKINNED_VERTEX_STRIDE as u64 * FLOAT_SIZE,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &SKINNED_ATTRIBUTES,
        });
    } else {
        layouts.push(wgpu::VertexBufferLayout {
            array_stride: VERTEX_STRIDE as u64 * FLOAT_SIZE,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &BASE_ATTRIBUTES,
        });
    }
    if variant.is_deformed() {
        layouts.push(wgpu::VertexBufferLayout {
            array_stride: DEFORM_VERTEX_STRIDE as u64 * FLOAT_SIZE,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &DEFORM_ATTRIBUTES,
        });
    }
    layouts
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub variant: DrawVariant,
    pub blend_mode: BlendMode,
}

pub struct ActorPipelines {
    pub globals_layout: wgpu::BindGroupLayout,
    pub draw_layout: wgpu::BindGroupLayout,
    pub texture_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,

    color_format: wgpu::TextureFormat,
    sample_count: u32,

    shaders: FxHashMap<DrawVariant, wgpu::ShaderModule>,
    pipelines: FxHashMap<PipelineKey, wgpu::RenderPipeline>,
}

impl ActorPipelines {
    pub fn new(device: &wgpu::Device, color_format: wgpu::TextureFormat, sample_count: u32) -> Self {
        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Actor Globals Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(std::mem::size_of::<GlobalUniforms>() as u64),
                },
                count: None,
            }],
        });

        let draw_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Actor Draw Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: NonZeroU64::new(std::mem::size_of::<DrawUniforms>() as u64),
                    },
                    count: None,
                },
                // Bone matrices for every skinned draw of the frame
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Actor Atlas Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Actor Pipeline Layout"),
            bind_group_layouts: &[Some(&globals_layout), Some(&draw_layout), Some(&texture_layout)],
            immediate_size: 0,
        });

        Self {
            globals_layout,
            draw_layout,
            texture_layout,
            pipeline_layout,
            color_format,
            sample_count,
            shaders: FxHashMap::default(),
            pipelines: FxHashMap::default(),
        }
    }

    /// Builds the pipeline for `key` on first request.
    pub fn ensure(&mut self, device: &wgpu::Device, key: PipelineKey) {
        if self.pipelines.contains_key(&key) {
            return;
        }

        let shader = self.shaders.entry(key.variant).or_insert_with(|| {
            let source = ShaderGenerator::generate_actor_shader(key.variant)
                .expect("Actor shader template must render");
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Actor Shader"),
                source: wgpu::ShaderSource::Wgsl(Cow::Owned(source)),
            })
        });

        let buffers = vertex_layouts(key.variant);
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Actor Pipeline"),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some("vs_main"),
                buffers: &buffers,
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.color_format,
                    blend: Some(key.blend_mode.to_wgpu()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: self.sample_count,
                ..Default::default()
            },
            multiview_mask: None,
            cache: None,
        });

        log::debug!("Created actor pipeline {key:?}");
        self.pipelines.insert(key, pipeline);
    }

    #[must_use]
    pub fn get(&self, key: PipelineKey) -> Option<&wgpu::RenderPipeline> {
        self.pipelines.get(&key)
    }
}
