//! Command list abstraction
//!
//! Records GPU work for one frame: layout transitions, dynamic
//! rendering scopes, pipeline/resource binds, push constants and draws.
//! The recording API mirrors dynamic rendering: there are no render
//! pass or framebuffer objects, a pass is just `begin_rendering` ..
//! `end_rendering` with attachments named inline.

use std::sync::Arc;

use super::binding_group::BindingGroup;
use super::buffer::Buffer;
use super::pipeline::Pipeline;
use super::texture::{Extent2d, GpuImage};
use super::transition::ImageTransition;
use crate::error::Result;

// ===== VIEWPORT / SCISSOR =====

/// Viewport rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Full-extent viewport with the standard 0..1 depth range
    pub fn from_extent(extent: Extent2d) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// Scissor rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect2D {
    /// Full-extent scissor
    pub fn from_extent(extent: Extent2d) -> Self {
        Self {
            x: 0,
            y: 0,
            width: extent.width,
            height: extent.height,
        }
    }
}

// ===== ATTACHMENTS =====

/// Multisample resolve mode for a color attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveMode {
    /// No resolve
    None,
    /// Sample-average resolve into the resolve target
    Average,
}

/// One color attachment of a rendering scope
pub struct ColorAttachment<'a> {
    /// Image rendered into (the MSAA image when multisampling)
    pub target: &'a dyn GpuImage,

    /// Single-sample resolve destination, when resolving
    pub resolve: Option<&'a dyn GpuImage>,

    /// Resolve mode (must be `None` iff `resolve` is `None`)
    pub resolve_mode: ResolveMode,

    /// Clear color applied on load
    pub clear: [f32; 4],
}

/// Depth attachment of a rendering scope
///
/// Depth is never resolved; with MSAA the depth image simply carries the
/// pass sample count and is discarded after the pass.
pub struct DepthAttachment<'a> {
    /// Depth image rendered into
    pub target: &'a dyn GpuImage,

    /// Clear depth applied on load
    pub clear: f32,
}

/// Description of one rendering scope
pub struct RenderingDesc<'a> {
    /// Render area extent
    pub extent: Extent2d,

    /// Color attachment (None for depth-only passes)
    pub color: Option<ColorAttachment<'a>>,

    /// Depth attachment (None for passes without depth)
    pub depth: Option<DepthAttachment<'a>>,
}

// ===== TRAIT =====

/// Recorded command stream for one frame
///
/// Commands must be recorded between `begin` and `end`. All binds are
/// relative to the most natural Vulkan mapping: binding groups bind at
/// explicit set indices against a pipeline's layout, push constants
/// write at explicit byte offsets into the pipeline's block.
pub trait CommandList: Send + Sync {
    /// Begin recording
    fn begin(&self) -> Result<()>;

    /// End recording
    fn end(&self) -> Result<()>;

    /// Transition a batch of images in one barrier dependency
    ///
    /// # Arguments
    ///
    /// * `transitions` - All transitions of the batch; the backend emits
    ///   a single dependency containing one barrier per entry
    fn transition_images(&self, transitions: &[ImageTransition]) -> Result<()>;

    /// Begin a dynamic rendering scope
    fn begin_rendering(&self, desc: &RenderingDesc) -> Result<()>;

    /// End the current rendering scope
    fn end_rendering(&self) -> Result<()>;

    /// Set the viewport
    fn set_viewport(&self, viewport: Viewport) -> Result<()>;

    /// Set the scissor rectangle
    fn set_scissor(&self, scissor: Rect2D) -> Result<()>;

    /// Bind a graphics pipeline
    fn bind_pipeline(&self, pipeline: &Arc<dyn Pipeline>) -> Result<()>;

    /// Bind a binding group at a set index of the given pipeline's layout
    fn bind_binding_group(
        &self,
        pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
        group: &Arc<dyn BindingGroup>,
    ) -> Result<()>;

    /// Write push constants at a byte offset into the bound pipeline's block
    fn push_constants(&self, pipeline: &Arc<dyn Pipeline>, offset: u32, data: &[u8]) -> Result<()>;

    /// Bind vertex buffers starting at `first_binding`
    fn bind_vertex_buffers(&self, first_binding: u32, buffers: &[&Arc<dyn Buffer>]) -> Result<()>;

    /// Bind a u32 index buffer
    fn bind_index_buffer(&self, buffer: &Arc<dyn Buffer>) -> Result<()>;

    /// Non-indexed draw
    fn draw(&self, vertex_count: u32, first_vertex: u32) -> Result<()>;

    /// Indexed draw
    fn draw_indexed(&self, index_count: u32) -> Result<()>;
}
