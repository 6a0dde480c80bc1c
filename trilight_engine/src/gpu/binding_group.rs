//! Binding group (descriptor set) abstraction
//!
//! A `BindingGroupLayout` describes the shape of one shader resource set;
//! a `BindingGroup` is a concrete set of resources matching a layout.
//! Pipelines take layouts at creation; command lists bind groups at
//! record time.

use std::any::Any;

use super::buffer::Buffer;
use super::texture::Texture;

// ===== SHADER STAGES =====

/// Shader stages a binding is visible to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderStageFlags {
    pub vertex: bool,
    pub fragment: bool,
}

impl ShaderStageFlags {
    /// Visible to the vertex stage only
    pub const VERTEX: Self = Self {
        vertex: true,
        fragment: false,
    };

    /// Visible to the fragment stage only
    pub const FRAGMENT: Self = Self {
        vertex: false,
        fragment: true,
    };

    /// Visible to both stages
    pub const VERTEX_FRAGMENT: Self = Self {
        vertex: true,
        fragment: true,
    };
}

// ===== LAYOUT DESCRIPTION =====

/// Kind of resource bound at a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingType {
    /// Uniform buffer
    UniformBuffer,
    /// Combined image + sampler
    CombinedImageSampler,
}

/// One binding slot within a layout
#[derive(Debug, Clone)]
pub struct BindingSlotDesc {
    /// Binding index within the set
    pub binding: u32,

    /// Resource kind
    pub binding_type: BindingType,

    /// Array size (1 for non-array bindings)
    pub count: u32,

    /// Stages the binding is visible to
    pub stage_flags: ShaderStageFlags,
}

/// Description of a binding group layout
#[derive(Debug, Clone)]
pub struct BindingGroupLayoutDesc {
    /// Debug name
    pub name: String,

    /// Slots in this layout
    pub entries: Vec<BindingSlotDesc>,
}

// ===== RESOURCES =====

/// Resource placed in one slot when creating a binding group
///
/// The variant must match the slot's `BindingType`; array slots take
/// `SampledTextureArray` with exactly `count` elements.
pub enum BindingResource<'a> {
    /// A whole uniform buffer
    UniformBuffer(&'a dyn Buffer),

    /// A single sampled texture
    SampledTexture(&'a dyn Texture),

    /// An array of sampled textures (for array bindings)
    SampledTextureArray(Vec<&'a dyn Texture>),
}

// ===== TRAITS =====

/// Layout of one shader resource set
pub trait BindingGroupLayout: Send + Sync {
    /// Creation-time description
    fn desc(&self) -> &BindingGroupLayoutDesc;

    /// Downcast support for backends
    fn as_any(&self) -> &dyn Any;
}

/// Concrete set of resources matching a layout
pub trait BindingGroup: Send + Sync {
    /// Downcast support for backends
    fn as_any(&self) -> &dyn Any;
}
