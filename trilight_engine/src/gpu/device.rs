//! GPU device abstraction
//!
//! The device is a pure resource factory. Frame pacing, swapchain
//! ownership and submission live in the backend crates, behind their own
//! concrete types; the passes only need to create resources.

use std::sync::Arc;

use super::binding_group::{BindingGroup, BindingGroupLayout, BindingGroupLayoutDesc, BindingResource};
use super::buffer::{Buffer, BufferDesc};
use super::pipeline::{Pipeline, PipelineDesc};
use super::texture::{Texture, TextureDesc};
use crate::error::Result;

/// GPU resource factory
pub trait Device: Send + Sync {
    /// Create a texture
    fn create_texture(&self, desc: &TextureDesc) -> Result<Arc<dyn Texture>>;

    /// Create a texture and upload initial pixel data
    ///
    /// # Arguments
    ///
    /// * `desc` - Texture description; usage must include `SAMPLED`
    /// * `data` - Tightly packed pixels, `extent * format.size_bytes()` bytes
    ///
    /// The upload includes the transition to `ShaderRead`: the texture
    /// is immediately sampleable and never appears in a pass's
    /// transition batches.
    fn create_texture_with_data(
        &self,
        desc: &TextureDesc,
        data: &[u8],
    ) -> Result<Arc<dyn Texture>>;

    /// Create a buffer
    fn create_buffer(&self, desc: &BufferDesc) -> Result<Arc<dyn Buffer>>;

    /// Create a binding group layout
    fn create_binding_group_layout(
        &self,
        desc: &BindingGroupLayoutDesc,
    ) -> Result<Arc<dyn BindingGroupLayout>>;

    /// Create a binding group from a layout and matching resources
    ///
    /// # Arguments
    ///
    /// * `layout` - Layout the group instantiates
    /// * `resources` - One resource per layout slot, in slot order
    fn create_binding_group(
        &self,
        layout: &Arc<dyn BindingGroupLayout>,
        resources: &[BindingResource],
    ) -> Result<Arc<dyn BindingGroup>>;

    /// Create a graphics pipeline
    fn create_pipeline(&self, desc: &PipelineDesc) -> Result<Arc<dyn Pipeline>>;
}
