/*!
# Trilight - Vulkan Renderer Backend

Vulkan implementation of the Trilight GPU abstraction.

Built on the Ash bindings with gpu-allocator for memory management and
naga for GLSL-to-SPIR-V translation at pipeline creation. Targets
Vulkan 1.3 and records passes through dynamic rendering; all layout
transitions go through `synchronization2` barriers.

Enable the `vulkan-validation` feature to compile in the Khronos
validation layer and a debug messenger that routes messages into the
engine log.
*/

mod vulkan_binding_group;
mod vulkan_buffer;
mod vulkan_command_list;
mod vulkan_device;
mod vulkan_pipeline;
mod vulkan_shader;
mod vulkan_swapchain;
mod vulkan_texture;

#[cfg(feature = "vulkan-validation")]
mod vulkan_debug;

pub use vulkan_command_list::VulkanCommandList;
pub use vulkan_device::VulkanDevice;
pub use vulkan_swapchain::VulkanSurfaceImage;
pub use vulkan_texture::VulkanTexture;
