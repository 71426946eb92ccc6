//! Animation-side mesh data.
//!
//! These types mirror what the skeletal animation runtime exposes per image
//! node. The runtime owns playback; it writes the pose fields of
//! [`ActorImage`] and this crate turns the result into buffers and draws.

pub mod actor_model;
pub mod image;

pub use actor_model::ActorModel;
pub use image::{ActorImage, DEFORM_VERTEX_STRIDE, SKINNED_VERTEX_STRIDE, VERTEX_STRIDE};
