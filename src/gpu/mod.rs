//! wgpu Backend
//!
//! A [`Renderer2D`](crate::renderer::Renderer2D) that draws actors with wgpu.
//!
//! - [`GpuContext`]: device and queue
//! - [`ResourceManager`]: CPU buffer/texture to GPU resource mirroring
//! - [`ActorPipelines`]: one pipeline per draw variant and blend mode
//! - [`ShaderGenerator`]: variant-specific WGSL from a single template
//! - [`WgpuRenderer2D`]: records draws, then prepares and replays them

pub mod context;
pub mod pipeline;
pub mod renderer;
pub mod resources;
pub mod settings;
pub mod shader_gen;

pub use context::GpuContext;
pub use pipeline::{ActorPipelines, DrawUniforms, GlobalUniforms, PipelineKey};
pub use renderer::{WgpuRenderer2D, affine2_to_mat4};
pub use resources::{GpuBuffer, GpuTexture, ResourceManager};
pub use settings::RendererSettings;
pub use shader_gen::{ShaderDefines, ShaderGenerator};
