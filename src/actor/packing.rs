//! Packing of per-image mesh data into the shared actor streams.

use crate::errors::{Actor2dError, Result};
use crate::model::ActorImage;

/// CPU-side contents of an actor's static buffers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackedMesh {
    /// Images without bones, 4 floats per vertex.
    pub vertices: Vec<f32>,
    /// Skinned images, 12 floats per vertex.
    pub skinned_vertices: Vec<f32>,
    /// Triangles of every image, rebased into the stream the image lives in.
    pub indices: Vec<u16>,
    /// Per image, the position of its first index in `indices`.
    pub index_offsets: Vec<u32>,
}

impl PackedMesh {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.skinned_vertices.is_empty() && self.indices.is_empty()
    }
}

/// Appends every image, in order, to the stream matching its stride.
///
/// Images that deform through animation still get their full-stride base
/// vertices here; their deformed positions live in per-instance buffers.
pub fn pack_mesh(images: &[ActorImage]) -> Result<PackedMesh> {
    let mut packed = PackedMesh::default();
    packed.index_offsets.reserve(images.len());

    for image in images {
        image.validate()?;

        let stride = image.vertex_stride();
        let stream = if image.is_skinned() {
            &mut packed.skinned_vertices
        } else {
            &mut packed.vertices
        };

        let first_vertex = stream.len() / stride;
        let vertex_count = image.vertex_count();
        if vertex_count > 0 && first_vertex + vertex_count - 1 > usize::from(u16::MAX) {
            return Err(Actor2dError::VertexIndexOverflow {
                image: image.name.clone(),
                required: first_vertex + vertex_count - 1,
            });
        }
        stream.extend_from_slice(&image.vertices);

        packed.index_offsets.push(packed.indices.len() as u32);
        if image.triangles.is_empty() {
            continue;
        }
        let base = u16::try_from(first_vertex).map_err(|_| Actor2dError::VertexIndexOverflow {
            image: image.name.clone(),
            required: first_vertex,
        })?;
        packed
            .indices
            .extend(image.triangles.iter().map(|&index| index + base));
    }

    Ok(packed)
}
