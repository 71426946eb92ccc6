//! Error Types
//!
//! This module defines the error types used throughout the crate.
//!
//! # Overview
//!
//! The main error type [`Actor2dError`] covers all failure modes including:
//! - Atlas loading failures (decode, unknown format, missing file)
//! - Mesh packing errors (16-bit index overflow, malformed vertex data)
//! - Instance bookkeeping errors (bad image index, missing deform buffer)
//! - GPU initialization failures
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, Actor2dError>`.
//!
//! ```rust,ignore
//! use actor2d::errors::{Actor2dError, Result};
//!
//! fn load_actor() -> Result<()> {
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for the crate.
#[derive(Error, Debug)]
pub enum Actor2dError {
    // ========================================================================
    // Atlas / Bitmap Errors
    // ========================================================================
    /// The bitmap was recognized but could not be decoded.
    #[error("Decode bitmap error: {0}")]
    DecodeBitmap(String),

    /// The bitmap format is not one the image decoder understands.
    #[error("Unknown format error: {0}")]
    UnknownBitmapFormat(String),

    /// The atlas file does not exist or could not be opened.
    #[error("Missing file error: {message} {}", filename.display())]
    MissingFile {
        /// Reason reported by the file system
        message: String,
        /// The file that was requested
        filename: PathBuf,
    },

    // ========================================================================
    // Mesh Packing Errors
    // ========================================================================
    /// A vertex stream grew past what 16-bit indices can address.
    #[error(
        "Image '{image}' needs vertex index {required} which exceeds the 16-bit index limit ({})",
        u16::MAX
    )]
    VertexIndexOverflow {
        /// Name of the offending image node
        image: String,
        /// Largest rebased index the image would need
        required: usize,
    },

    /// An image node carries vertex or triangle data that does not match its layout.
    #[error("Invalid vertex data in image '{image}': {reason}")]
    InvalidVertexData {
        /// Name of the offending image node
        image: String,
        /// What is wrong with it
        reason: String,
    },

    // ========================================================================
    // Actor / Instance Errors
    // ========================================================================
    /// The actor already owns GPU buffers; call `dispose` first.
    #[error("Actor is already initialized")]
    AlreadyInitialized,

    /// Image index out of bounds.
    #[error("Image index out of bounds: {index} (image count: {count})")]
    ImageIndexOutOfBounds {
        /// The invalid index
        index: usize,
        /// Number of images on the actor
        count: usize,
    },

    /// The image does not vertex-deform, or the instance was not initialized.
    #[error("Image '{0}' has no deform buffer")]
    MissingDeformBuffer(String),

    // ========================================================================
    // GPU Errors
    // ========================================================================
    /// Failed to request a compatible GPU adapter.
    #[error("Failed to request WGPU adapter: {0}")]
    AdapterRequestFailed(String),

    /// Failed to create the GPU device.
    #[error("Failed to create WGPU device: {0}")]
    DeviceCreateFailed(#[from] wgpu::RequestDeviceError),

    // ========================================================================
    // I/O & Parsing Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl Actor2dError {
    /// Classifies an `image` crate failure for the atlas at `path`.
    pub fn from_image_error(err: image::ImageError, path: impl Into<PathBuf>) -> Self {
        match err {
            image::ImageError::Unsupported(e) => Actor2dError::UnknownBitmapFormat(e.to_string()),
            image::ImageError::IoError(e) => Actor2dError::MissingFile {
                message: e.to_string(),
                filename: path.into(),
            },
            other => Actor2dError::DecodeBitmap(other.to_string()),
        }
    }

    /// Returns `true` for the failures an atlas load may report.
    #[must_use]
    pub fn is_bitmap_error(&self) -> bool {
        matches!(
            self,
            Actor2dError::DecodeBitmap(_)
                | Actor2dError::UnknownBitmapFormat(_)
                | Actor2dError::MissingFile { .. }
        )
    }
}

/// Alias for `Result<T, Actor2dError>`.
pub type Result<T> = std::result::Result<T, Actor2dError>;
