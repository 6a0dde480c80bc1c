//! GPU abstraction layer
//!
//! Backend-agnostic traits and descriptor types for GPU resources.
//! Concrete backends (Vulkan, mock) implement the traits; the passes in
//! `crate::passes` only ever see `Arc<dyn ...>` handles, which keeps
//! them constructible and testable without a GPU.

pub mod binding_group;
pub mod buffer;
pub mod command_list;
pub mod device;
pub mod pipeline;
pub mod texture;
pub mod transition;

#[cfg(test)]
pub mod mock_device;

pub use binding_group::{
    BindingGroup, BindingGroupLayout, BindingGroupLayoutDesc, BindingResource, BindingSlotDesc,
    BindingType, ShaderStageFlags,
};
pub use buffer::{Buffer, BufferDesc, BufferUsage};
pub use command_list::{
    ColorAttachment, CommandList, DepthAttachment, Rect2D, RenderingDesc, ResolveMode, Viewport,
};
pub use device::Device;
pub use pipeline::{
    BlendMode, CullMode, DepthBias, DepthState, Pipeline, PipelineDesc, PrimitiveTopology,
    ShaderDesc, ShaderStage, VertexAttribute, VertexBinding, VertexLayout,
};
pub use texture::{
    Extent2d, GpuImage, SampleCount, Texture, TextureDesc, TextureFormat, TextureUsage,
};
pub use transition::{ImageAccess, ImageTransition};
