use std::sync::Arc;

use glam::Vec2;

use crate::actor::Actor;
use crate::actor::bounds::{Aabb2, skin_position};
use crate::errors::{Actor2dError, Result};
use crate::model::{ActorImage, DEFORM_VERTEX_STRIDE};
use crate::renderer::{BufferHint, Color, GraphicsBuffer, MeshDraw, Renderer2D, TextureRef};

/// A live playback of an [`Actor`].
///
/// Holds its own copy of every image node so the animation runtime can pose
/// each instance independently. Only the pose is read back from that copy
/// (world transform, opacity, blend mode, bone matrices, deformed vertices);
/// mesh layout always comes from the actor, whose buffers were packed from it.
///
/// Images that vertex-deform get a dynamic buffer of their own; everything
/// else is drawn from the actor's static buffers.
#[derive(Debug)]
pub struct ActorInstance {
    actor: Arc<Actor>,
    images: Vec<ActorImage>,
    deform_buffers: Vec<Option<GraphicsBuffer>>,
}

/// Everything needed to draw one image.
struct DrawableImage<'a> {
    mesh: &'a ActorImage,
    pose: &'a ActorImage,
    texture: &'a TextureRef,
    vertex_buffer: &'a GraphicsBuffer,
    index_buffer: &'a GraphicsBuffer,
    deform_buffer: Option<&'a GraphicsBuffer>,
}

impl DrawableImage<'_> {
    /// World position of vertex `i` as the draw places it.
    fn world_position(&self, i: usize) -> Vec2 {
        let mut position = match self.deform_buffer {
            Some(_) => self
                .pose
                .deformed_vertices
                .get(i * DEFORM_VERTEX_STRIDE..(i + 1) * DEFORM_VERTEX_STRIDE)
                .map_or_else(|| self.mesh.vertex_position(i), |v| Vec2::new(v[0], v[1])),
            None => self.mesh.vertex_position(i),
        };
        if let Some((bones, weights)) = self.mesh.vertex_influences(i) {
            position = skin_position(position, bones, weights, &self.pose.bone_influence_matrices);
        }
        self.pose.world_transform.transform_point2(position)
    }
}

impl ActorInstance {
    pub(crate) fn new(actor: Arc<Actor>) -> Self {
        let images = actor.images().to_vec();
        let deform_buffers = vec![None; images.len()];
        Self {
            actor,
            images,
            deform_buffers,
        }
    }

    /// Creates the per-instance deform buffers.
    pub fn initialize<R: Renderer2D + ?Sized>(&mut self, renderer: &mut R) -> Result<()> {
        let meshes = self.actor.images();
        for ((mesh, pose), slot) in meshes
            .iter()
            .zip(&self.images)
            .zip(self.deform_buffers.iter_mut())
        {
            if !mesh.does_animation_vertex_deform {
                continue;
            }
            let buffer = renderer.make_vertex_buffer();
            upload_deform(mesh, pose, &buffer)?;
            *slot = Some(buffer);
        }
        Ok(())
    }

    /// Re-uploads the deformed vertices of image `index`.
    pub fn update_vertex_deform(&self, index: usize) -> Result<()> {
        let pose = self.image(index)?;
        let mesh = &self.actor.images()[index];
        let buffer = self.deform_buffers[index]
            .as_ref()
            .ok_or_else(|| Actor2dError::MissingDeformBuffer(mesh.name.clone()))?;
        upload_deform(mesh, pose, buffer)
    }

    /// Re-uploads every deform buffer.
    pub fn update_vertex_deforms(&self) -> Result<()> {
        for ((mesh, pose), buffer) in self
            .actor
            .images()
            .iter()
            .zip(&self.images)
            .zip(&self.deform_buffers)
        {
            if let Some(buffer) = buffer {
                upload_deform(mesh, pose, buffer)?;
            }
        }
        Ok(())
    }

    /// Replaces the deformed positions of image `index` and uploads them if
    /// the instance has been initialized.
    pub fn set_deformed_vertices(&mut self, index: usize, vertices: &[f32]) -> Result<()> {
        let actor = Arc::clone(&self.actor);
        let pose = self.image_mut(index)?;
        let mesh = &actor.images()[index];
        let expected = mesh.vertex_count() * DEFORM_VERTEX_STRIDE;
        if vertices.len() != expected {
            return Err(Actor2dError::InvalidVertexData {
                image: mesh.name.clone(),
                reason: format!("expected {expected} deformed floats, found {}", vertices.len()),
            });
        }
        pose.deformed_vertices.clear();
        pose.deformed_vertices.extend_from_slice(vertices);

        if self.deform_buffers[index].is_some() {
            self.update_vertex_deform(index)?;
        }
        Ok(())
    }

    /// Issues one draw call per image, in draw order.
    pub fn render<R: Renderer2D + ?Sized>(&self, renderer: &mut R) {
        for index in 0..self.images.len() {
            let Some(image) = self.drawable(index) else {
                continue;
            };

            renderer.set_blend_mode(image.pose.blend_mode);

            let mesh = MeshDraw {
                transform: image.pose.world_transform,
                vertex_buffer: image.vertex_buffer,
                index_buffer: image.index_buffer,
                index_offset: image.mesh.index_offset(),
                index_count: image.mesh.index_count() as u32,
                opacity: image.pose.render_opacity,
                color: Color::WHITE,
                texture: image.texture,
            };
            let bones = &image.pose.bone_influence_matrices;

            match (image.mesh.is_skinned(), image.deform_buffer) {
                (true, Some(deform)) => {
                    renderer.draw_textured_skin_and_deformed(mesh, deform, bones);
                }
                (true, None) => renderer.draw_textured_skin(mesh, bones),
                (false, Some(deform)) => renderer.draw_textured_and_deformed(mesh, deform),
                (false, None) => renderer.draw_textured(mesh),
            }
        }
    }

    /// World-space bounds of every image [`Self::render`] draws.
    #[must_use]
    pub fn compute_bounds(&self) -> Option<Aabb2> {
        (0..self.images.len())
            .filter_map(|index| self.drawable(index))
            .filter_map(|image| {
                Aabb2::from_points((0..image.mesh.vertex_count()).map(|i| image.world_position(i)))
            })
            .reduce(|a, b| a.union(&b))
    }

    /// `None` for images `render` skips: no atlas assigned, atlas failed to
    /// load, no triangles, or no buffer for the image's vertex layout.
    fn drawable(&self, index: usize) -> Option<DrawableImage<'_>> {
        let index_buffer = self.actor.index_buffer()?;
        let mesh = self.actor.images().get(index)?;
        let pose = self.images.get(index)?;

        let texture_index = mesh.texture_index?;
        let Some(texture) = self.actor.texture(texture_index) else {
            log::trace!("Skipping '{}': atlas {texture_index} not loaded", mesh.name);
            return None;
        };
        if mesh.index_count() == 0 {
            return None;
        }
        let vertex_buffer = if mesh.is_skinned() {
            self.actor.skinned_vertex_buffer()
        } else {
            self.actor.vertex_buffer()
        }?;

        Some(DrawableImage {
            mesh,
            pose,
            texture,
            vertex_buffer,
            index_buffer,
            deform_buffer: self.deform_buffers.get(index).and_then(Option::as_ref),
        })
    }

    #[inline]
    #[must_use]
    pub fn actor(&self) -> &Arc<Actor> {
        &self.actor
    }

    #[inline]
    #[must_use]
    pub fn images(&self) -> &[ActorImage] {
        &self.images
    }

    pub fn image(&self, index: usize) -> Result<&ActorImage> {
        let count = self.images.len();
        self.images
            .get(index)
            .ok_or(Actor2dError::ImageIndexOutOfBounds { index, count })
    }

    /// Pose access for the animation runtime. Edits to mesh fields
    /// (`vertices`, `triangles`, skinning, atlas) have no effect on drawing.
    pub fn image_mut(&mut self, index: usize) -> Result<&mut ActorImage> {
        let count = self.images.len();
        self.images
            .get_mut(index)
            .ok_or(Actor2dError::ImageIndexOutOfBounds { index, count })
    }

    #[must_use]
    pub fn deform_buffer(&self, index: usize) -> Option<&GraphicsBuffer> {
        self.deform_buffers.get(index).and_then(Option::as_ref)
    }
}

fn upload_deform(mesh: &ActorImage, pose: &ActorImage, buffer: &GraphicsBuffer) -> Result<()> {
    let expected = mesh.vertex_count() * DEFORM_VERTEX_STRIDE;
    if pose.deformed_vertices.len() != expected {
        return Err(Actor2dError::InvalidVertexData {
            image: mesh.name.clone(),
            reason: format!(
                "expected {expected} deformed floats, found {}",
                pose.deformed_vertices.len()
            ),
        });
    }
    buffer.set_data(&pose.deformed_vertices, BufferHint::Dynamic);
    Ok(())
}
