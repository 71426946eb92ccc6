//! Actors
//!
//! An [`Actor`] is the shared, load-once side of a character: its mesh data,
//! atlas textures and the static buffers every instance draws from. Live
//! playback happens on [`ActorInstance`]s, which own whatever GPU data
//! differs per character (the vertex deform buffers).
//!
//! ```rust,ignore
//! let mut actor = Actor::new(ActorModel::load("assets/hero.json")?);
//! actor.initialize(&mut renderer)?;
//! let actor = Arc::new(actor);
//!
//! let mut hero = actor.make_instance();
//! hero.initialize(&mut renderer)?;
//! // ... animation runtime writes the pose ...
//! hero.render(&mut renderer);
//! ```

pub mod bounds;
pub mod instance;
pub mod packing;

use std::sync::Arc;

use crate::errors::{Actor2dError, Result};
use crate::model::{ActorImage, ActorModel};
use crate::renderer::{BufferHint, GraphicsBuffer, Renderer2D, TextureFlags, TextureRef};

pub use bounds::Aabb2;
pub use instance::ActorInstance;
pub use packing::{PackedMesh, pack_mesh};

/// Atlas loading options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorSettings {
    /// Appended to the atlas base name, dot included.
    pub atlas_extension: String,
    pub texture_flags: TextureFlags,
}

impl Default for ActorSettings {
    fn default() -> Self {
        Self {
            atlas_extension: ".png".to_string(),
            texture_flags: TextureFlags::MIP_MAP | TextureFlags::CLAMP_TO_EDGE,
        }
    }
}

/// Shared per-character data, initialized once against a renderer.
#[derive(Debug)]
pub struct Actor {
    model: ActorModel,
    settings: ActorSettings,

    textures: Vec<Option<TextureRef>>,
    vertex_buffer: Option<GraphicsBuffer>,
    skinned_vertex_buffer: Option<GraphicsBuffer>,
    index_buffer: Option<GraphicsBuffer>,
    initialized: bool,
}

impl Actor {
    #[must_use]
    pub fn new(model: ActorModel) -> Self {
        Self::with_settings(model, ActorSettings::default())
    }

    #[must_use]
    pub fn with_settings(model: ActorModel, settings: ActorSettings) -> Self {
        Self {
            model,
            settings,
            textures: Vec::new(),
            vertex_buffer: None,
            skinned_vertex_buffer: None,
            index_buffer: None,
            initialized: false,
        }
    }

    /// Loads the atlases and builds the static buffers.
    ///
    /// An atlas that fails to decode or is missing is logged and left empty;
    /// images using it are skipped at render time.
    pub fn initialize<R: Renderer2D + ?Sized>(&mut self, renderer: &mut R) -> Result<()> {
        if self.initialized {
            return Err(Actor2dError::AlreadyInitialized);
        }

        let packed = pack_mesh(&self.model.images)?;

        let mut textures = Vec::with_capacity(self.model.texture_count);
        for index in 0..self.model.texture_count {
            let filename = self
                .model
                .atlas_filename(index, &self.settings.atlas_extension);
            match renderer.make_texture(&filename, self.settings.texture_flags) {
                Ok(texture) => textures.push(Some(texture)),
                Err(err) if err.is_bitmap_error() => {
                    log::error!("{err}");
                    textures.push(None);
                }
                Err(err) => return Err(err),
            }
        }

        for (image, &offset) in self.model.images.iter_mut().zip(&packed.index_offsets) {
            image.index_offset = offset;
        }

        if !packed.vertices.is_empty() {
            let buffer = renderer.make_vertex_buffer();
            buffer.set_data(&packed.vertices, BufferHint::Static);
            self.vertex_buffer = Some(buffer);
        }
        if !packed.skinned_vertices.is_empty() {
            let buffer = renderer.make_vertex_buffer();
            buffer.set_data(&packed.skinned_vertices, BufferHint::Static);
            self.skinned_vertex_buffer = Some(buffer);
        }
        if !packed.indices.is_empty() {
            let buffer = renderer.make_index_buffer();
            buffer.set_data(&packed.indices, BufferHint::Static);
            self.index_buffer = Some(buffer);
        }

        log::debug!(
            "Initialized actor {}: {} images, {} plain / {} skinned floats, {} indices",
            self.model.base_filename.display(),
            self.model.images.len(),
            packed.vertices.len(),
            packed.skinned_vertices.len(),
            packed.indices.len()
        );

        self.textures = textures;
        self.initialized = true;
        Ok(())
    }

    /// Releases textures and buffers. The actor may be initialized again.
    pub fn dispose(&mut self) {
        self.textures.clear();
        self.vertex_buffer = None;
        self.skinned_vertex_buffer = None;
        self.index_buffer = None;
        self.initialized = false;
    }

    /// Creates a playback instance sharing this actor's data.
    #[must_use]
    pub fn make_instance(self: &Arc<Self>) -> ActorInstance {
        ActorInstance::new(Arc::clone(self))
    }

    #[inline]
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    #[inline]
    #[must_use]
    pub fn model(&self) -> &ActorModel {
        &self.model
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &ActorSettings {
        &self.settings
    }

    #[inline]
    #[must_use]
    pub fn images(&self) -> &[ActorImage] {
        &self.model.images
    }

    #[must_use]
    pub fn index_offset(&self, image: usize) -> Option<u32> {
        self.model.images.get(image).map(ActorImage::index_offset)
    }

    /// The atlas at `index`, `None` if out of range or if it failed to load.
    #[must_use]
    pub fn texture(&self, index: usize) -> Option<&TextureRef> {
        self.textures.get(index).and_then(Option::as_ref)
    }

    #[must_use]
    pub fn textures(&self) -> &[Option<TextureRef>] {
        &self.textures
    }

    #[inline]
    #[must_use]
    pub fn vertex_buffer(&self) -> Option<&GraphicsBuffer> {
        self.vertex_buffer.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn skinned_vertex_buffer(&self) -> Option<&GraphicsBuffer> {
        self.skinned_vertex_buffer.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn index_buffer(&self) -> Option<&GraphicsBuffer> {
        self.index_buffer.as_ref()
    }
}
