//! GPU Resource Manager
//!
//! Mirrors CPU-side [`GraphicsBuffer`]s and [`Texture`]s onto wgpu resources,
//! keyed by their ids. Buffers are re-uploaded whenever their version moves
//! past the last uploaded one; resources no draw has touched for
//! `max_idle_frames` are dropped.

use std::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::FxHashMap;
use wgpu::util::DeviceExt;

use crate::renderer::{GraphicsBuffer, Texture};

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(0);

pub fn generate_resource_id() -> u64 {
    NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Pads `data` to the copy alignment wgpu requires for buffer writes.
fn aligned_bytes(data: &[u8]) -> std::borrow::Cow<'_, [u8]> {
    let align = wgpu::COPY_BUFFER_ALIGNMENT as usize;
    if data.len() % align == 0 && !data.is_empty() {
        std::borrow::Cow::Borrowed(data)
    } else {
        let padded_len = data.len().div_ceil(align).max(1) * align;
        let mut padded = data.to_vec();
        padded.resize(padded_len, 0);
        std::borrow::Cow::Owned(padded)
    }
}

// ============================================================================
// GPU resource wrappers
// ============================================================================

pub struct GpuBuffer {
    /// Changes whenever the underlying `wgpu::Buffer` is recreated.
    pub id: u64,
    pub buffer: wgpu::Buffer,
    pub size: u64,
    pub usage: wgpu::BufferUsages,
    pub label: String,
    pub last_used_frame: u64,
    pub last_uploaded_version: u64,
}

impl GpuBuffer {
    pub fn new(device: &wgpu::Device, data: &[u8], usage: wgpu::BufferUsages, label: &str) -> Self {
        let contents = aligned_bytes(data);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: &contents,
            usage,
        });

        Self {
            id: generate_resource_id(),
            buffer,
            size: contents.len() as u64,
            usage,
            label: label.to_string(),
            last_used_frame: 0,
            last_uploaded_version: 0,
        }
    }

    /// Writes `data`, recreating the buffer when it no longer fits.
    /// Returns `true` if the buffer was recreated.
    pub fn write(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, data: &[u8]) -> bool {
        let contents = aligned_bytes(data);
        if contents.len() as u64 > self.size {
            log::debug!(
                "Resizing buffer {:?} from {} to {}",
                self.label,
                self.size,
                contents.len()
            );
            self.buffer.destroy();
            *self = Self {
                last_used_frame: self.last_used_frame,
                last_uploaded_version: self.last_uploaded_version,
                ..Self::new(device, &contents, self.usage, &self.label)
            };
            return true;
        }
        queue.write_buffer(&self.buffer, 0, &contents);
        false
    }
}

pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
    pub mip_level_count: u32,
    pub last_used_frame: u64,
}

impl GpuTexture {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, source: &Texture) -> Self {
        let mip_level_count = source.mip_level_count().max(1);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&source.label),
            size: wgpu::Extent3d {
                width: source.width,
                height: source.height,
                depth_or_array_layers: 1,
            },
            mip_level_count,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (level, data) in source.mips.iter().enumerate() {
            let level = level as u32;
            let (width, height) = source.mip_size(level);
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: level,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                data,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(width * 4),
                    rows_per_image: Some(height),
                },
                wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&source.label),
            address_mode_u: source.sampler.address_mode_u,
            address_mode_v: source.sampler.address_mode_v,
            mag_filter: source.sampler.mag_filter,
            min_filter: source.sampler.min_filter,
            mipmap_filter: source.sampler.mipmap_filter,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            width: source.width,
            height: source.height,
            mip_level_count,
            last_used_frame: 0,
        }
    }
}

// ============================================================================
// ResourceManager
// ============================================================================

pub struct ResourceManager {
    device: wgpu::Device,
    queue: wgpu::Queue,
    frame_index: u64,
    max_idle_frames: u64,

    pub(crate) gpu_buffers: FxHashMap<u64, GpuBuffer>,
    pub(crate) gpu_textures: FxHashMap<u64, GpuTexture>,
}

impl ResourceManager {
    #[must_use]
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, max_idle_frames: u64) -> Self {
        Self {
            device,
            queue,
            frame_index: 0,
            max_idle_frames,
            gpu_buffers: FxHashMap::default(),
            gpu_textures: FxHashMap::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Creates or refreshes the GPU copy of `buffer` and returns its GPU id.
    pub fn prepare_buffer(&mut self, buffer: &GraphicsBuffer) -> u64 {
        let version = buffer.version();
        let gpu_buf = self.gpu_buffers.entry(buffer.id()).or_insert_with(|| {
            let data = buffer.read_data();
            let mut gpu_buf =
                GpuBuffer::new(&self.device, &data, buffer.wgpu_usage(), buffer.label());
            gpu_buf.last_uploaded_version = version;
            gpu_buf
        });

        if version > gpu_buf.last_uploaded_version {
            let data = buffer.read_data();
            gpu_buf.write(&self.device, &self.queue, &data);
            gpu_buf.last_uploaded_version = version;
        }

        gpu_buf.last_used_frame = self.frame_index;
        gpu_buf.id
    }

    /// Uploads `texture` on first use. Atlas textures never change afterwards.
    pub fn prepare_texture(&mut self, texture: &Texture) {
        let gpu_tex = self
            .gpu_textures
            .entry(texture.id)
            .or_insert_with(|| GpuTexture::new(&self.device, &self.queue, texture));
        gpu_tex.last_used_frame = self.frame_index;
    }

    #[must_use]
    pub fn get_buffer(&self, buffer: &GraphicsBuffer) -> Option<&GpuBuffer> {
        self.gpu_buffers.get(&buffer.id())
    }

    #[must_use]
    pub fn get_texture(&self, texture: &Texture) -> Option<&GpuTexture> {
        self.gpu_textures.get(&texture.id)
    }

    /// Advances the frame counter and releases idle resources.
    /// Returns the ids of the textures that were released.
    pub fn next_frame(&mut self) -> Vec<u64> {
        self.frame_index += 1;
        let frame = self.frame_index;
        let max_idle = self.max_idle_frames;

        self.gpu_buffers.retain(|_, buf| {
            let keep = frame - buf.last_used_frame <= max_idle;
            if !keep {
                buf.buffer.destroy();
            }
            keep
        });

        let mut released = Vec::new();
        self.gpu_textures.retain(|&id, tex| {
            let keep = frame - tex.last_used_frame <= max_idle;
            if !keep {
                released.push(id);
            }
            keep
        });

        released
    }
}
