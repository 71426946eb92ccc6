use glam::{Affine2, Vec2};
use serde::{Deserialize, Serialize};

use crate::errors::{Actor2dError, Result};
use crate::renderer::BlendMode;

/// Floats per vertex for images without bones: x, y, u, v.
pub const VERTEX_STRIDE: usize = 4;
/// Floats per vertex for skinned images: x, y, u, v, 4 bone indices, 4 bone weights.
pub const SKINNED_VERTEX_STRIDE: usize = 12;
/// Floats per vertex in a deform buffer: x, y.
pub const DEFORM_VERTEX_STRIDE: usize = 2;

/// A textured mesh node as exposed by the animation runtime.
///
/// Mesh data (`vertices`, `triangles`, skinning) is shared by every instance
/// of an actor. The pose fields are written by the animation runtime each
/// frame and are never serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorImage {
    pub name: String,

    pub vertices: Vec<f32>,
    pub triangles: Vec<u16>,

    #[serde(default)]
    pub connected_bone_count: usize,
    #[serde(default)]
    pub texture_index: Option<usize>,
    #[serde(default)]
    pub blend_mode: BlendMode,
    #[serde(default)]
    pub does_animation_vertex_deform: bool,

    // === Pose ===
    #[serde(skip)]
    pub world_transform: Affine2,
    #[serde(skip, default = "full_opacity")]
    pub render_opacity: f32,
    /// Bone index 0 in the vertex data refers to the first entry.
    #[serde(skip)]
    pub bone_influence_matrices: Vec<Affine2>,
    /// Absolute x,y per vertex, replacing base positions while deforming.
    #[serde(default)]
    pub deformed_vertices: Vec<f32>,

    #[serde(skip)]
    pub(crate) index_offset: u32,
}

fn full_opacity() -> f32 {
    1.0
}

impl ActorImage {
    /// Creates an image without bones, vertices laid out as x, y, u, v.
    pub fn new(name: impl Into<String>, vertices: Vec<f32>, triangles: Vec<u16>) -> Self {
        Self {
            name: name.into(),
            vertices,
            triangles,
            connected_bone_count: 0,
            texture_index: None,
            blend_mode: BlendMode::Normal,
            does_animation_vertex_deform: false,
            world_transform: Affine2::IDENTITY,
            render_opacity: 1.0,
            bone_influence_matrices: Vec::new(),
            deformed_vertices: Vec::new(),
            index_offset: 0,
        }
    }

    /// Creates a skinned image. Vertices use [`SKINNED_VERTEX_STRIDE`].
    pub fn skinned(
        name: impl Into<String>,
        vertices: Vec<f32>,
        triangles: Vec<u16>,
        connected_bone_count: usize,
    ) -> Self {
        let mut image = Self::new(name, vertices, triangles);
        image.connected_bone_count = connected_bone_count;
        image.bone_influence_matrices = vec![Affine2::IDENTITY; connected_bone_count + 1];
        image
    }

    #[must_use]
    pub fn with_texture(mut self, index: usize) -> Self {
        self.texture_index = Some(index);
        self
    }

    #[must_use]
    pub fn with_blend_mode(mut self, mode: BlendMode) -> Self {
        self.blend_mode = mode;
        self
    }

    /// Marks the image as vertex-deformed by animation and seeds the deformed
    /// positions from the base mesh.
    #[must_use]
    pub fn with_vertex_deform(mut self) -> Self {
        self.does_animation_vertex_deform = true;
        self.reset_deformed_vertices();
        self
    }

    #[inline]
    #[must_use]
    pub fn is_skinned(&self) -> bool {
        self.connected_bone_count > 0
    }

    #[inline]
    #[must_use]
    pub fn vertex_stride(&self) -> usize {
        if self.is_skinned() {
            SKINNED_VERTEX_STRIDE
        } else {
            VERTEX_STRIDE
        }
    }

    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / self.vertex_stride()
    }

    #[inline]
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len() / 3
    }

    #[inline]
    #[must_use]
    pub fn index_count(&self) -> usize {
        self.triangle_count() * 3
    }

    /// Offset of this image's first index in the actor's shared index buffer.
    #[inline]
    #[must_use]
    pub fn index_offset(&self) -> u32 {
        self.index_offset
    }

    /// Base (bind pose) position of vertex `i`.
    #[must_use]
    pub fn vertex_position(&self, i: usize) -> Vec2 {
        let base = i * self.vertex_stride();
        Vec2::new(self.vertices[base], self.vertices[base + 1])
    }

    /// Position of vertex `i` after vertex deformation, if the image deforms.
    #[must_use]
    pub fn deformed_position(&self, i: usize) -> Vec2 {
        if self.does_animation_vertex_deform && self.deformed_vertices.len() >= (i + 1) * 2 {
            Vec2::new(self.deformed_vertices[i * 2], self.deformed_vertices[i * 2 + 1])
        } else {
            self.vertex_position(i)
        }
    }

    /// Bone indices and weights of vertex `i`, `None` for images without bones.
    #[must_use]
    pub fn vertex_influences(&self, i: usize) -> Option<([f32; 4], [f32; 4])> {
        if !self.is_skinned() {
            return None;
        }
        let base = i * SKINNED_VERTEX_STRIDE + 4;
        let v = &self.vertices[base..base + 8];
        Some(([v[0], v[1], v[2], v[3]], [v[4], v[5], v[6], v[7]]))
    }

    /// Copies the base x,y of every vertex into the deformed positions.
    pub fn reset_deformed_vertices(&mut self) {
        let stride = self.vertex_stride();
        self.deformed_vertices = self
            .vertices
            .chunks_exact(stride)
            .flat_map(|v| [v[0], v[1]])
            .collect();
    }

    /// Checks the mesh data against its layout.
    pub fn validate(&self) -> Result<()> {
        let stride = self.vertex_stride();
        if self.vertices.len() % stride != 0 {
            return Err(self.invalid(format!(
                "{} floats is not a multiple of the vertex stride {stride}",
                self.vertices.len()
            )));
        }
        if self.triangles.len() % 3 != 0 {
            return Err(self.invalid(format!(
                "{} triangle indices is not a multiple of 3",
                self.triangles.len()
            )));
        }

        let vertex_count = self.vertex_count();
        if let Some(&bad) = self
            .triangles
            .iter()
            .find(|&&index| usize::from(index) >= vertex_count)
        {
            return Err(self.invalid(format!(
                "triangle index {bad} out of range for {vertex_count} vertices"
            )));
        }

        if self.does_animation_vertex_deform
            && self.deformed_vertices.len() != vertex_count * DEFORM_VERTEX_STRIDE
        {
            return Err(self.invalid(format!(
                "expected {} deformed floats, found {}",
                vertex_count * DEFORM_VERTEX_STRIDE,
                self.deformed_vertices.len()
            )));
        }

        Ok(())
    }

    fn invalid(&self, reason: String) -> Actor2dError {
        Actor2dError::InvalidVertexData {
            image: self.name.clone(),
            reason,
        }
    }
}
