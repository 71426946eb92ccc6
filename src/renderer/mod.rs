//! Renderer Abstraction
//!
//! [`Renderer2D`] is the seam between actors and a concrete GPU backend. An
//! actor only ever asks the renderer for buffers and textures, switches the
//! blend mode, and issues one of four textured draw calls per image:
//!
//! | Skinned | Deform buffer | Call                                          |
//! |---------|---------------|-----------------------------------------------|
//! | no      | no            | [`Renderer2D::draw_textured`]                 |
//! | no      | yes           | [`Renderer2D::draw_textured_and_deformed`]    |
//! | yes     | no            | [`Renderer2D::draw_textured_skin`]            |
//! | yes     | yes           | [`Renderer2D::draw_textured_skin_and_deformed`] |
//!
//! Two implementations ship with the crate: [`DrawList`], which records the
//! calls (headless hosts, tests), and [`crate::gpu::WgpuRenderer2D`].

pub mod buffer;
pub mod draw_list;
pub mod texture;

use std::path::Path;

use bitflags::bitflags;
use glam::Affine2;
use serde::{Deserialize, Serialize};

use crate::errors::Result;

pub use buffer::GraphicsBuffer;
pub use draw_list::{DrawCommand, DrawList, DrawVariant};
pub use texture::{Texture, TextureRef, TextureSampler};

/// How an image is composited onto what is already drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    #[default]
    Normal,
    Additive,
    Multiply,
    Screen,
}

impl BlendMode {
    pub const ALL: [BlendMode; 4] = [
        BlendMode::Normal,
        BlendMode::Additive,
        BlendMode::Multiply,
        BlendMode::Screen,
    ];

    #[must_use]
    pub fn to_wgpu(self) -> wgpu::BlendState {
        use wgpu::{BlendComponent, BlendFactor, BlendOperation};

        // Colors leave the fragment shader with alpha already multiplied in.
        let color = match self {
            BlendMode::Normal => BlendComponent {
                src_factor: BlendFactor::One,
                dst_factor: BlendFactor::OneMinusSrcAlpha,
                operation: BlendOperation::Add,
            },
            BlendMode::Additive => BlendComponent {
                src_factor: BlendFactor::One,
                dst_factor: BlendFactor::One,
                operation: BlendOperation::Add,
            },
            BlendMode::Multiply => BlendComponent {
                src_factor: BlendFactor::Dst,
                dst_factor: BlendFactor::OneMinusSrcAlpha,
                operation: BlendOperation::Add,
            },
            BlendMode::Screen => BlendComponent {
                src_factor: BlendFactor::One,
                dst_factor: BlendFactor::OneMinusSrc,
                operation: BlendOperation::Add,
            },
        };

        wgpu::BlendState {
            color,
            alpha: BlendComponent {
                src_factor: BlendFactor::One,
                dst_factor: BlendFactor::OneMinusSrcAlpha,
                operation: BlendOperation::Add,
            },
        }
    }
}

/// Upload frequency hint for a [`GraphicsBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferHint {
    /// Written once after creation.
    Static,
    /// Rewritten as often as every frame.
    Dynamic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Vertex,
    Index,
}

bitflags! {
    /// Options for [`Renderer2D::make_texture`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureFlags: u32 {
        const MIP_MAP       = 1 << 0;
        const CLAMP_TO_EDGE = 1 << 1;
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0, 1.0);

    #[must_use]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    #[must_use]
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Arguments shared by every draw call variant.
#[derive(Debug, Clone, Copy)]
pub struct MeshDraw<'a> {
    pub transform: Affine2,
    pub vertex_buffer: &'a GraphicsBuffer,
    pub index_buffer: &'a GraphicsBuffer,
    /// First index to draw, counted in indices (not bytes).
    pub index_offset: u32,
    pub index_count: u32,
    pub opacity: f32,
    pub color: Color,
    pub texture: &'a TextureRef,
}

pub trait Renderer2D {
    /// Loads an atlas image.
    fn make_texture(&mut self, path: &Path, flags: TextureFlags) -> Result<TextureRef>;

    fn make_vertex_buffer(&mut self) -> GraphicsBuffer;

    fn make_index_buffer(&mut self) -> GraphicsBuffer;

    fn set_blend_mode(&mut self, mode: BlendMode);

    fn draw_textured(&mut self, mesh: MeshDraw<'_>);

    /// `deform_buffer` holds one x,y pair per vertex, replacing the base positions.
    fn draw_textured_and_deformed(&mut self, mesh: MeshDraw<'_>, deform_buffer: &GraphicsBuffer);

    /// `bone_matrices[i]` is the influence of bone index `i` in the vertex data.
    fn draw_textured_skin(&mut self, mesh: MeshDraw<'_>, bone_matrices: &[Affine2]);

    fn draw_textured_skin_and_deformed(
        &mut self,
        mesh: MeshDraw<'_>,
        deform_buffer: &GraphicsBuffer,
        bone_matrices: &[Affine2],
    );
}
