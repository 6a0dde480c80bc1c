//! Drawable trait and per-pass draw context

use glam::Mat4;
use std::sync::Arc;

use crate::error::Result;
use crate::gpu::{CommandList, Pipeline};
use crate::textures::TextureRegistry;

/// Everything a drawable needs to record its draws for one pass
///
/// Both scene passes place the model matrix at the same push-constant
/// offset, so the same draw code runs under either pipeline. The shadow
/// pass carries no texture registry: its draws are depth-only and bind
/// the position stream alone.
pub struct DrawContext<'a> {
    /// Pipeline the pass has bound
    pub pipeline: &'a Arc<dyn Pipeline>,

    /// Byte offset of the model matrix within the pipeline's push block
    pub model_push_offset: u32,

    /// Registry resolving texture names to binding groups; `None` for
    /// depth-only passes
    pub textures: Option<&'a TextureRegistry>,
}

/// Anything the scene can tick and draw
pub trait Drawable: Send + Sync {
    /// Advance animation state
    ///
    /// # Arguments
    ///
    /// * `delta_seconds` - Time since the previous tick
    fn tick(&mut self, _delta_seconds: f32) {}

    /// Record draw commands
    ///
    /// # Arguments
    ///
    /// * `cmd` - Command list, inside an open rendering scope
    /// * `ctx` - Pass context (pipeline, push offset, textures)
    /// * `parent` - Transform of the enclosing node
    fn draw(&self, cmd: &dyn CommandList, ctx: &DrawContext, parent: Mat4) -> Result<()>;
}
