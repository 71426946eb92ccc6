use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytemuck::Pod;
use parking_lot::{RwLock, RwLockReadGuard};

use super::{BufferHint, BufferKind};

// Global buffer id generator
static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(0);

/// CPU-side copy of a vertex or index buffer.
///
/// The renderer that created the buffer owns the GPU counterpart and
/// re-uploads it whenever `version` moves past what it last uploaded.
#[derive(Debug)]
pub struct BufferData {
    pub id: u64,
    pub label: String,
    pub kind: BufferKind,
    hint: RwLock<BufferHint>,
    version: AtomicU64,
    data: RwLock<Vec<u8>>,
}

/// Shared handle to a [`BufferData`]. Clones refer to the same buffer.
#[derive(Debug, Clone)]
pub struct GraphicsBuffer(Arc<BufferData>);

impl PartialEq for GraphicsBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for GraphicsBuffer {}

impl std::hash::Hash for GraphicsBuffer {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl GraphicsBuffer {
    #[must_use]
    pub fn new(kind: BufferKind, label: Option<&str>) -> Self {
        let default_label = match kind {
            BufferKind::Vertex => "VertexBuffer",
            BufferKind::Index => "IndexBuffer",
        };
        Self(Arc::new(BufferData {
            id: NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed),
            label: label.unwrap_or(default_label).to_string(),
            kind,
            hint: RwLock::new(BufferHint::Static),
            version: AtomicU64::new(0),
            data: RwLock::new(Vec::new()),
        }))
    }

    /// Replaces the buffer contents and bumps the version.
    pub fn set_data<T: Pod>(&self, data: &[T], hint: BufferHint) {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        {
            let mut inner = self.0.data.write();
            if inner.len() != bytes.len() {
                inner.resize(bytes.len(), 0);
            }
            inner.copy_from_slice(bytes);
        }
        *self.0.hint.write() = hint;
        self.0.version.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.0.id
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> BufferKind {
        self.0.kind
    }

    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.0.label
    }

    #[inline]
    #[must_use]
    pub fn hint(&self) -> BufferHint {
        *self.0.hint.read()
    }

    /// Lock-free read of the data version. Zero means no data was ever set.
    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.0.version.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn len_bytes(&self) -> usize {
        self.0.data.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len_bytes() == 0
    }

    pub fn read_data(&self) -> RwLockReadGuard<'_, Vec<u8>> {
        self.0.data.read()
    }

    /// Copies the contents out as `f32`s. Only meaningful for vertex buffers.
    #[must_use]
    pub fn to_f32_vec(&self) -> Vec<f32> {
        bytemuck::pod_collect_to_vec(self.read_data().as_slice())
    }

    /// Copies the contents out as `u16`s. Only meaningful for index buffers.
    #[must_use]
    pub fn to_u16_vec(&self) -> Vec<u16> {
        bytemuck::pod_collect_to_vec(self.read_data().as_slice())
    }

    #[must_use]
    pub fn wgpu_usage(&self) -> wgpu::BufferUsages {
        match self.0.kind {
            BufferKind::Vertex => wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            BufferKind::Index => wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        }
    }
}
