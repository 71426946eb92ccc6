use std::ffi::OsString;
use std::path::{Path, PathBuf};

use glam::Affine2;
use serde::{Deserialize, Serialize};

use super::image::ActorImage;
use crate::errors::Result;

/// Mesh data of one character, as exported by the animation runtime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActorModel {
    /// Atlas path without extension, e.g. `assets/hero` for `assets/hero.png`.
    #[serde(default)]
    pub base_filename: PathBuf,
    #[serde(default)]
    pub texture_count: usize,
    /// Image nodes in draw order.
    #[serde(default)]
    pub images: Vec<ActorImage>,
}

impl ActorModel {
    #[must_use]
    pub fn new(base_filename: impl Into<PathBuf>, texture_count: usize) -> Self {
        Self {
            base_filename: base_filename.into(),
            texture_count,
            images: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_image(mut self, image: ActorImage) -> Self {
        self.images.push(image);
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut model: ActorModel = serde_json::from_str(json)?;
        model.finish_load()?;
        Ok(model)
    }

    pub fn from_json_slice(json: &[u8]) -> Result<Self> {
        let mut model: ActorModel = serde_json::from_slice(json)?;
        model.finish_load()?;
        Ok(model)
    }

    /// Reads a JSON mesh dump. An empty `base_filename` defaults to the
    /// file's own path without extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let mut model = Self::from_json_slice(&bytes)?;
        if model.base_filename.as_os_str().is_empty() {
            model.base_filename = path.with_extension("");
        }
        log::debug!(
            "Loaded actor model {} ({} images, {} atlases)",
            path.display(),
            model.images.len(),
            model.texture_count
        );
        Ok(model)
    }

    #[inline]
    #[must_use]
    pub fn max_texture_index(&self) -> Option<usize> {
        self.texture_count.checked_sub(1)
    }

    /// Path of atlas `index`: `{base}{ext}` for a single atlas, otherwise
    /// `{base}{index}{ext}`.
    #[must_use]
    pub fn atlas_filename(&self, index: usize, extension: &str) -> PathBuf {
        let mut name = OsString::from(self.base_filename.as_os_str());
        if self.texture_count > 1 {
            name.push(index.to_string());
        }
        name.push(extension);
        PathBuf::from(name)
    }

    /// Fills the pose defaults JSON does not carry and validates every image.
    fn finish_load(&mut self) -> Result<()> {
        for image in &mut self.images {
            if image.is_skinned() && image.bone_influence_matrices.is_empty() {
                image.bone_influence_matrices =
                    vec![Affine2::IDENTITY; image.connected_bone_count + 1];
            }
            if image.does_animation_vertex_deform && image.deformed_vertices.is_empty() {
                image.reset_deformed_vertices();
            }
            image.validate()?;
        }
        Ok(())
    }
}
