#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod actor;
pub mod errors;
pub mod gpu;
pub mod model;
pub mod renderer;

pub use actor::{Aabb2, Actor, ActorInstance, ActorSettings};
pub use errors::{Actor2dError, Result};
pub use gpu::{GpuContext, RendererSettings, WgpuRenderer2D};
pub use model::{ActorImage, ActorModel};
pub use renderer::{
    BlendMode, Color, DrawCommand, DrawList, DrawVariant, GraphicsBuffer, MeshDraw, Renderer2D,
    TextureFlags, TextureRef,
};
