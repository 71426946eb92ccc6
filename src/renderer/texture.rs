use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use image::RgbaImage;
use image::imageops::FilterType;

use super::TextureFlags;
use crate::errors::{Actor2dError, Result};

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureSampler {
    pub address_mode_u: wgpu::AddressMode,
    pub address_mode_v: wgpu::AddressMode,
    pub mag_filter: wgpu::FilterMode,
    pub min_filter: wgpu::FilterMode,
    pub mipmap_filter: wgpu::MipmapFilterMode,
}

impl Default for TextureSampler {
    fn default() -> Self {
        Self {
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
        }
    }
}

impl TextureSampler {
    #[must_use]
    pub fn from_flags(flags: TextureFlags) -> Self {
        let mut sampler = Self::default();
        if flags.contains(TextureFlags::CLAMP_TO_EDGE) {
            sampler.address_mode_u = wgpu::AddressMode::ClampToEdge;
            sampler.address_mode_v = wgpu::AddressMode::ClampToEdge;
        }
        if flags.contains(TextureFlags::MIP_MAP) {
            sampler.mipmap_filter = wgpu::MipmapFilterMode::Linear;
        }
        sampler
    }
}

/// A decoded RGBA8 atlas, with its full mip chain when requested.
#[derive(Debug)]
pub struct Texture {
    pub id: u64,
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub flags: TextureFlags,
    pub sampler: TextureSampler,
    /// Level 0 first. Each level is tightly packed RGBA8.
    pub mips: Vec<Vec<u8>>,
}

pub type TextureRef = Arc<Texture>;

impl Texture {
    /// Builds a texture from already decoded pixels.
    #[must_use]
    pub fn from_rgba(label: &str, image: RgbaImage, flags: TextureFlags) -> Self {
        let (width, height) = image.dimensions();
        let mips = if flags.contains(TextureFlags::MIP_MAP) {
            build_mip_chain(image)
        } else {
            vec![image.into_raw()]
        };

        Self {
            id: NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed),
            label: label.to_string(),
            width,
            height,
            flags,
            sampler: TextureSampler::from_flags(flags),
            mips,
        }
    }

    /// Decodes an image file. Failures are classified as decode errors,
    /// unknown formats, or missing files.
    pub fn load(path: impl AsRef<Path>, flags: TextureFlags) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Actor2dError::MissingFile {
                message: "file not found".to_string(),
                filename: path.to_path_buf(),
            });
        }

        let reader = image::ImageReader::open(path)
            .map_err(|e| Actor2dError::MissingFile {
                message: e.to_string(),
                filename: path.to_path_buf(),
            })?
            .with_guessed_format()
            .map_err(|e| Actor2dError::MissingFile {
                message: e.to_string(),
                filename: path.to_path_buf(),
            })?;

        if reader.format().is_none() {
            return Err(Actor2dError::UnknownBitmapFormat(path.display().to_string()));
        }

        let img = reader
            .decode()
            .map_err(|e| Actor2dError::from_image_error(e, path))?;

        Ok(Self::from_rgba(
            &path.display().to_string(),
            img.into_rgba8(),
            flags,
        ))
    }

    #[inline]
    #[must_use]
    pub fn mip_level_count(&self) -> u32 {
        self.mips.len() as u32
    }

    /// Size in pixels of a mip level.
    #[must_use]
    pub fn mip_size(&self, level: u32) -> (u32, u32) {
        ((self.width >> level).max(1), (self.height >> level).max(1))
    }
}

fn build_mip_chain(base: RgbaImage) -> Vec<Vec<u8>> {
    let (mut width, mut height) = base.dimensions();
    let mut levels = Vec::new();
    let mut current = base;

    loop {
        if width == 1 && height == 1 {
            levels.push(current.into_raw());
            break;
        }
        width = (width / 2).max(1);
        height = (height / 2).max(1);
        let next = image::imageops::resize(&current, width, height, FilterType::Triangle);
        levels.push(current.into_raw());
        current = next;
    }

    levels
}
