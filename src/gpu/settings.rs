//! Renderer Settings
//!
//! Plain configuration data for [`super::GpuContext`] and
//! [`super::WgpuRenderer2D`].
//!
//! ```rust,ignore
//! let settings = RendererSettings {
//!     msaa_samples: 4,
//!     clear_color: wgpu::Color::WHITE,
//!     ..Default::default()
//! };
//! ```

#[derive(Debug, Clone)]
pub struct RendererSettings {
    pub power_preference: wgpu::PowerPreference,
    pub required_features: wgpu::Features,
    pub required_limits: wgpu::Limits,

    /// Format of the color target the actors are drawn into.
    pub color_format: wgpu::TextureFormat,
    /// MSAA sample count of the color target. 1 disables multisampling.
    pub msaa_samples: u32,
    pub clear_color: wgpu::Color,

    /// GPU buffers and textures not referenced by any draw for this many
    /// frames are released.
    pub max_idle_frames: u64,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            power_preference: wgpu::PowerPreference::HighPerformance,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            color_format: wgpu::TextureFormat::Bgra8UnormSrgb,
            msaa_samples: 1,
            clear_color: wgpu::Color::TRANSPARENT,
            max_idle_frames: 120,
        }
    }
}
