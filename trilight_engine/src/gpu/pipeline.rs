//! Graphics pipeline abstraction
//!
//! Pipelines are described entirely up front: shaders (GLSL source,
//! translated by the backend), vertex layout, fixed-function state, the
//! binding group layouts in set order, and one push-constant block
//! shared by both stages.

use std::any::Any;
use std::sync::Arc;

use super::binding_group::BindingGroupLayout;
use super::texture::{SampleCount, TextureFormat};

// ===== SHADERS =====

/// Shader stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// One shader of a pipeline, as GLSL source
#[derive(Debug, Clone)]
pub struct ShaderDesc {
    /// Stage this shader runs in
    pub stage: ShaderStage,

    /// GLSL source text
    pub source: &'static str,

    /// Entry point name ("main" for all engine shaders)
    pub entry_point: &'static str,
}

// ===== VERTEX LAYOUT =====

/// One vertex attribute
#[derive(Debug, Clone, Copy)]
pub struct VertexAttribute {
    /// Shader location
    pub location: u32,

    /// Attribute format (one of the R32* float formats)
    pub format: TextureFormat,

    /// Byte offset within the binding's stride
    pub offset: u32,
}

/// One vertex buffer binding
#[derive(Debug, Clone)]
pub struct VertexBinding {
    /// Binding index
    pub binding: u32,

    /// Stride in bytes between consecutive vertices
    pub stride: u32,

    /// Attributes read from this binding
    pub attributes: Vec<VertexAttribute>,
}

/// Full vertex input layout
///
/// Empty bindings are valid: the full-screen post-process pipeline reads
/// no vertex data at all.
#[derive(Debug, Clone, Default)]
pub struct VertexLayout {
    pub bindings: Vec<VertexBinding>,
}

// ===== FIXED-FUNCTION STATE =====

/// Primitive topology
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveTopology {
    TriangleList,
}

/// Face culling mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    None,
    Back,
}

/// Depth bias applied during depth-only rendering
#[derive(Debug, Clone, Copy)]
pub struct DepthBias {
    /// Constant bias factor
    pub constant: f32,

    /// Slope-scaled bias factor
    pub slope: f32,
}

/// Depth test/write state
#[derive(Debug, Clone, Copy)]
pub struct DepthState {
    /// Enable depth testing (compare op is always Less)
    pub test: bool,

    /// Enable depth writes
    pub write: bool,

    /// Optional depth bias (shadow rendering)
    pub bias: Option<DepthBias>,
}

impl DepthState {
    /// Depth fully disabled
    pub const DISABLED: Self = Self {
        test: false,
        write: false,
        bias: None,
    };

    /// Standard test + write, no bias
    pub const READ_WRITE: Self = Self {
        test: true,
        write: true,
        bias: None,
    };
}

/// Color blend mode for the single color attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    /// Blending disabled, source overwrites
    Disabled,
    /// Standard alpha blending (src_alpha, one_minus_src_alpha)
    Alpha,
}

// ===== PIPELINE DESCRIPTION =====

/// Full description of a graphics pipeline
#[derive(Clone)]
pub struct PipelineDesc {
    /// Debug name
    pub name: String,

    /// Shader stages (vertex required, fragment optional for depth-only)
    pub shaders: Vec<ShaderDesc>,

    /// Vertex input layout
    pub vertex_layout: VertexLayout,

    /// Primitive topology
    pub topology: PrimitiveTopology,

    /// Face culling
    pub cull_mode: CullMode,

    /// Depth state
    pub depth: DepthState,

    /// Color blending
    pub blend: BlendMode,

    /// Rasterization sample count
    pub sample_count: SampleCount,

    /// Color attachment format (None for depth-only pipelines)
    pub color_format: Option<TextureFormat>,

    /// Depth attachment format (None when depth is unused)
    pub depth_format: Option<TextureFormat>,

    /// Binding group layouts in set-index order
    pub binding_group_layouts: Vec<Arc<dyn BindingGroupLayout>>,

    /// Size in bytes of the push-constant block (0 for none),
    /// visible to both stages
    pub push_constant_size: u32,
}

/// Compiled graphics pipeline
pub trait Pipeline: Send + Sync {
    /// Size in bytes of the pipeline's push-constant block
    fn push_constant_size(&self) -> u32;

    /// Downcast support for backends
    fn as_any(&self) -> &dyn Any;
}
