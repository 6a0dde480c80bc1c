//! Scene graph
//!
//! A flat collection of drawables keyed by slotmap handles. Drawables
//! are drawn twice per frame under different pipelines (shadow, then
//! lighting); the [`drawable::DrawContext`] carries everything that
//! differs between the two.

pub mod drawable;
pub mod entities;
pub mod mesh;
pub mod primitives;
mod scene;

pub use drawable::{DrawContext, Drawable};
pub use entities::{BouncingMesh, Group, OrbitingSphere, SpinningMesh};
pub use mesh::Mesh;
pub use primitives::MeshData;
pub use scene::{DrawableKey, Scene};
