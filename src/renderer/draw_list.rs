use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use glam::Affine2;

use super::{
    BlendMode, BufferKind, Color, GraphicsBuffer, MeshDraw, Renderer2D, Texture, TextureFlags,
    TextureRef,
};
use crate::errors::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawVariant {
    Textured,
    TexturedAndDeformed,
    TexturedSkin,
    TexturedSkinAndDeformed,
}

impl DrawVariant {
    pub const ALL: [DrawVariant; 4] = [
        DrawVariant::Textured,
        DrawVariant::TexturedAndDeformed,
        DrawVariant::TexturedSkin,
        DrawVariant::TexturedSkinAndDeformed,
    ];

    #[inline]
    #[must_use]
    pub fn is_skinned(self) -> bool {
        matches!(
            self,
            DrawVariant::TexturedSkin | DrawVariant::TexturedSkinAndDeformed
        )
    }

    #[inline]
    #[must_use]
    pub fn is_deformed(self) -> bool {
        matches!(
            self,
            DrawVariant::TexturedAndDeformed | DrawVariant::TexturedSkinAndDeformed
        )
    }
}

/// One recorded draw call, owning clones of every handle it references.
#[derive(Debug, Clone)]
pub struct DrawCommand {
    pub variant: DrawVariant,
    pub blend_mode: BlendMode,
    pub transform: Affine2,
    pub vertex_buffer: GraphicsBuffer,
    pub deform_buffer: Option<GraphicsBuffer>,
    pub index_buffer: GraphicsBuffer,
    pub index_offset: u32,
    pub index_count: u32,
    pub opacity: f32,
    pub color: Color,
    pub texture: TextureRef,
    pub bone_matrices: Vec<Affine2>,
}

impl DrawCommand {
    #[inline]
    #[must_use]
    pub fn index_range(&self) -> Range<u32> {
        self.index_offset..self.index_offset + self.index_count
    }
}

/// Headless [`Renderer2D`]: every call is recorded in submission order.
///
/// GPU backends drive their frame from the recorded commands; tests
/// inspect them directly.
#[derive(Debug, Default)]
pub struct DrawList {
    blend_mode: BlendMode,
    commands: Vec<DrawCommand>,
    buffers_created: usize,
    textures_loaded: usize,
}

impl DrawList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    #[inline]
    #[must_use]
    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    #[inline]
    #[must_use]
    pub fn buffers_created(&self) -> usize {
        self.buffers_created
    }

    #[inline]
    #[must_use]
    pub fn textures_loaded(&self) -> usize {
        self.textures_loaded
    }

    /// Drops the recorded commands. The blend mode carries over.
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    fn record(
        &mut self,
        variant: DrawVariant,
        mesh: MeshDraw<'_>,
        deform_buffer: Option<&GraphicsBuffer>,
        bone_matrices: &[Affine2],
    ) {
        self.commands.push(DrawCommand {
            variant,
            blend_mode: self.blend_mode,
            transform: mesh.transform,
            vertex_buffer: mesh.vertex_buffer.clone(),
            deform_buffer: deform_buffer.cloned(),
            index_buffer: mesh.index_buffer.clone(),
            index_offset: mesh.index_offset,
            index_count: mesh.index_count,
            opacity: mesh.opacity,
            color: mesh.color,
            texture: Arc::clone(mesh.texture),
            bone_matrices: bone_matrices.to_vec(),
        });
    }
}

impl Renderer2D for DrawList {
    fn make_texture(&mut self, path: &Path, flags: TextureFlags) -> Result<TextureRef> {
        let texture = Texture::load(path, flags)?;
        log::debug!(
            "Loaded texture {} ({}x{}, {} mips)",
            texture.label,
            texture.width,
            texture.height,
            texture.mip_level_count()
        );
        self.textures_loaded += 1;
        Ok(Arc::new(texture))
    }

    fn make_vertex_buffer(&mut self) -> GraphicsBuffer {
        self.buffers_created += 1;
        GraphicsBuffer::new(BufferKind::Vertex, None)
    }

    fn make_index_buffer(&mut self) -> GraphicsBuffer {
        self.buffers_created += 1;
        GraphicsBuffer::new(BufferKind::Index, None)
    }

    fn set_blend_mode(&mut self, mode: BlendMode) {
        self.blend_mode = mode;
    }

    fn draw_textured(&mut self, mesh: MeshDraw<'_>) {
        self.record(DrawVariant::Textured, mesh, None, &[]);
    }

    fn draw_textured_and_deformed(&mut self, mesh: MeshDraw<'_>, deform_buffer: &GraphicsBuffer) {
        self.record(DrawVariant::TexturedAndDeformed, mesh, Some(deform_buffer), &[]);
    }

    fn draw_textured_skin(&mut self, mesh: MeshDraw<'_>, bone_matrices: &[Affine2]) {
        self.record(DrawVariant::TexturedSkin, mesh, None, bone_matrices);
    }

    fn draw_textured_skin_and_deformed(
        &mut self,
        mesh: MeshDraw<'_>,
        deform_buffer: &GraphicsBuffer,
        bone_matrices: &[Affine2],
    ) {
        self.record(
            DrawVariant::TexturedSkinAndDeformed,
            mesh,
            Some(deform_buffer),
            bone_matrices,
        );
    }
}
