//! Vulkan command list implementation
//!
//! Records into one primary command buffer using Vulkan 1.3 dynamic
//! rendering and synchronization2. One `transition_images` batch becomes
//! exactly one `vkCmdPipelineBarrier2` dependency.

use ash::vk;
use std::sync::Arc;

use trilight_engine::trilight::gpu::{
    BindingGroup, Buffer, CommandList, GpuImage, ImageAccess, ImageTransition, Pipeline, Rect2D,
    RenderingDesc, ResolveMode, Viewport,
};
use trilight_engine::trilight::{Error, Result};

use crate::vulkan_binding_group::VulkanBindingGroup;
use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_device::DeviceShared;
use crate::vulkan_pipeline::VulkanPipeline;
use crate::vulkan_swapchain::VulkanSurfaceImage;
use crate::vulkan_texture::{vk_aspect, VulkanTexture};

pub struct VulkanCommandList {
    shared: Arc<DeviceShared>,
    pub(crate) command_buffer: vk::CommandBuffer,
}

impl VulkanCommandList {
    pub(crate) fn new(shared: Arc<DeviceShared>, command_buffer: vk::CommandBuffer) -> Self {
        Self {
            shared,
            command_buffer,
        }
    }
}

// ===== ACCESS MAPPING =====

fn stage_access_layout(
    access: ImageAccess,
) -> (vk::PipelineStageFlags2, vk::AccessFlags2, vk::ImageLayout) {
    match access {
        ImageAccess::Undefined => (
            vk::PipelineStageFlags2::TOP_OF_PIPE,
            vk::AccessFlags2::NONE,
            vk::ImageLayout::UNDEFINED,
        ),
        ImageAccess::ColorAttachment => (
            vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
            vk::AccessFlags2::COLOR_ATTACHMENT_WRITE,
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        ),
        ImageAccess::DepthAttachment => (
            vk::PipelineStageFlags2::EARLY_FRAGMENT_TESTS
                | vk::PipelineStageFlags2::LATE_FRAGMENT_TESTS,
            vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE,
            vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        ),
        ImageAccess::ShaderRead => (
            vk::PipelineStageFlags2::FRAGMENT_SHADER,
            vk::AccessFlags2::SHADER_READ,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        ),
        ImageAccess::Present => (
            vk::PipelineStageFlags2::BOTTOM_OF_PIPE,
            vk::AccessFlags2::NONE,
            vk::ImageLayout::PRESENT_SRC_KHR,
        ),
    }
}

/// Raw image + view for either a texture or a swapchain image
fn image_handles(image: &dyn GpuImage) -> Result<(vk::Image, vk::ImageView)> {
    let any = image.as_any();
    if let Some(texture) = any.downcast_ref::<VulkanTexture>() {
        return Ok((texture.image, texture.view));
    }
    if let Some(surface) = any.downcast_ref::<VulkanSurfaceImage>() {
        return Ok((surface.image, surface.view));
    }
    Err(Error::InvalidResource(
        "command list got a non-Vulkan image".to_string(),
    ))
}

fn downcast_pipeline<'a>(pipeline: &'a Arc<dyn Pipeline>) -> Result<&'a VulkanPipeline> {
    pipeline
        .as_any()
        .downcast_ref::<VulkanPipeline>()
        .ok_or_else(|| Error::InvalidResource("command list got a non-Vulkan pipeline".to_string()))
}

impl CommandList for VulkanCommandList {
    fn begin(&self) -> Result<()> {
        let begin_info = vk::CommandBufferBeginInfo::default();
        unsafe {
            self.shared
                .device
                .begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(|e| Error::BackendError(format!("vkBeginCommandBuffer failed: {e}")))
        }
    }

    fn end(&self) -> Result<()> {
        unsafe {
            self.shared
                .device
                .end_command_buffer(self.command_buffer)
                .map_err(|e| Error::BackendError(format!("vkEndCommandBuffer failed: {e}")))
        }
    }

    fn transition_images(&self, transitions: &[ImageTransition]) -> Result<()> {
        let mut barriers = Vec::with_capacity(transitions.len());
        for transition in transitions {
            let (image, _) = image_handles(transition.image)?;
            let (src_stage, src_access, old_layout) = stage_access_layout(transition.from);
            let (dst_stage, dst_access, new_layout) = stage_access_layout(transition.to);
            barriers.push(
                vk::ImageMemoryBarrier2::default()
                    .src_stage_mask(src_stage)
                    .src_access_mask(src_access)
                    .dst_stage_mask(dst_stage)
                    .dst_access_mask(dst_access)
                    .old_layout(old_layout)
                    .new_layout(new_layout)
                    .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .image(image)
                    .subresource_range(
                        vk::ImageSubresourceRange::default()
                            .aspect_mask(vk_aspect(transition.image.format()))
                            .base_mip_level(0)
                            .level_count(1)
                            .base_array_layer(0)
                            .layer_count(1),
                    ),
            );
        }

        let dependency = vk::DependencyInfo::default().image_memory_barriers(&barriers);
        unsafe {
            self.shared
                .device
                .cmd_pipeline_barrier2(self.command_buffer, &dependency);
        }
        Ok(())
    }

    fn begin_rendering(&self, desc: &RenderingDesc) -> Result<()> {
        let mut color_attachments = Vec::new();
        if let Some(color) = &desc.color {
            let (_, view) = image_handles(color.target)?;
            let mut attachment = vk::RenderingAttachmentInfo::default()
                .image_view(view)
                .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                .load_op(vk::AttachmentLoadOp::CLEAR)
                .store_op(vk::AttachmentStoreOp::STORE)
                .clear_value(vk::ClearValue {
                    color: vk::ClearColorValue {
                        float32: color.clear,
                    },
                });
            if let Some(resolve) = color.resolve {
                let (_, resolve_view) = image_handles(resolve)?;
                attachment = attachment
                    .resolve_mode(match color.resolve_mode {
                        ResolveMode::None => vk::ResolveModeFlags::NONE,
                        ResolveMode::Average => vk::ResolveModeFlags::AVERAGE,
                    })
                    .resolve_image_view(resolve_view)
                    .resolve_image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
            }
            color_attachments.push(attachment);
        }

        let depth_attachment = match &desc.depth {
            Some(depth) => {
                let (_, view) = image_handles(depth.target)?;
                Some(
                    vk::RenderingAttachmentInfo::default()
                        .image_view(view)
                        .image_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
                        .load_op(vk::AttachmentLoadOp::CLEAR)
                        .store_op(vk::AttachmentStoreOp::STORE)
                        .clear_value(vk::ClearValue {
                            depth_stencil: vk::ClearDepthStencilValue {
                                depth: depth.clear,
                                stencil: 0,
                            },
                        }),
                )
            }
            None => None,
        };

        let mut rendering_info = vk::RenderingInfo::default()
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: vk::Extent2D {
                    width: desc.extent.width,
                    height: desc.extent.height,
                },
            })
            .layer_count(1)
            .color_attachments(&color_attachments);
        if let Some(depth) = &depth_attachment {
            rendering_info = rendering_info.depth_attachment(depth);
        }

        unsafe {
            self.shared
                .device
                .cmd_begin_rendering(self.command_buffer, &rendering_info);
        }
        Ok(())
    }

    fn end_rendering(&self) -> Result<()> {
        unsafe {
            self.shared.device.cmd_end_rendering(self.command_buffer);
        }
        Ok(())
    }

    fn set_viewport(&self, viewport: Viewport) -> Result<()> {
        let vk_viewport = vk::Viewport {
            x: viewport.x,
            y: viewport.y,
            width: viewport.width,
            height: viewport.height,
            min_depth: viewport.min_depth,
            max_depth: viewport.max_depth,
        };
        unsafe {
            self.shared
                .device
                .cmd_set_viewport(self.command_buffer, 0, &[vk_viewport]);
        }
        Ok(())
    }

    fn set_scissor(&self, scissor: Rect2D) -> Result<()> {
        let rect = vk::Rect2D {
            offset: vk::Offset2D {
                x: scissor.x,
                y: scissor.y,
            },
            extent: vk::Extent2D {
                width: scissor.width,
                height: scissor.height,
            },
        };
        unsafe {
            self.shared
                .device
                .cmd_set_scissor(self.command_buffer, 0, &[rect]);
        }
        Ok(())
    }

    fn bind_pipeline(&self, pipeline: &Arc<dyn Pipeline>) -> Result<()> {
        let pipeline = downcast_pipeline(pipeline)?;
        unsafe {
            self.shared.device.cmd_bind_pipeline(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                pipeline.pipeline,
            );
        }
        Ok(())
    }

    fn bind_binding_group(
        &self,
        pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
        group: &Arc<dyn BindingGroup>,
    ) -> Result<()> {
        let pipeline = downcast_pipeline(pipeline)?;
        let group = group
            .as_any()
            .downcast_ref::<VulkanBindingGroup>()
            .ok_or_else(|| {
                Error::InvalidResource("command list got a non-Vulkan binding group".to_string())
            })?;
        unsafe {
            self.shared.device.cmd_bind_descriptor_sets(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                pipeline.layout,
                set_index,
                &[group.set],
                &[],
            );
        }
        Ok(())
    }

    fn push_constants(&self, pipeline: &Arc<dyn Pipeline>, offset: u32, data: &[u8]) -> Result<()> {
        let vulkan_pipeline = downcast_pipeline(pipeline)?;
        if offset + data.len() as u32 > pipeline.push_constant_size() {
            return Err(Error::InvalidResource(format!(
                "push of {} bytes at offset {} overruns a {}-byte block",
                data.len(),
                offset,
                pipeline.push_constant_size()
            )));
        }
        unsafe {
            self.shared.device.cmd_push_constants(
                self.command_buffer,
                vulkan_pipeline.layout,
                vulkan_pipeline.push_constant_stages,
                offset,
                data,
            );
        }
        Ok(())
    }

    fn bind_vertex_buffers(&self, first_binding: u32, buffers: &[&Arc<dyn Buffer>]) -> Result<()> {
        let mut raw = Vec::with_capacity(buffers.len());
        for buffer in buffers {
            let buffer = buffer
                .as_any()
                .downcast_ref::<VulkanBuffer>()
                .ok_or_else(|| {
                    Error::InvalidResource("command list got a non-Vulkan buffer".to_string())
                })?;
            raw.push(buffer.buffer);
        }
        let offsets = vec![0u64; raw.len()];
        unsafe {
            self.shared.device.cmd_bind_vertex_buffers(
                self.command_buffer,
                first_binding,
                &raw,
                &offsets,
            );
        }
        Ok(())
    }

    fn bind_index_buffer(&self, buffer: &Arc<dyn Buffer>) -> Result<()> {
        let buffer = buffer
            .as_any()
            .downcast_ref::<VulkanBuffer>()
            .ok_or_else(|| {
                Error::InvalidResource("command list got a non-Vulkan buffer".to_string())
            })?;
        unsafe {
            self.shared.device.cmd_bind_index_buffer(
                self.command_buffer,
                buffer.buffer,
                0,
                vk::IndexType::UINT32,
            );
        }
        Ok(())
    }

    fn draw(&self, vertex_count: u32, first_vertex: u32) -> Result<()> {
        unsafe {
            self.shared
                .device
                .cmd_draw(self.command_buffer, vertex_count, 1, first_vertex, 0);
        }
        Ok(())
    }

    fn draw_indexed(&self, index_count: u32) -> Result<()> {
        unsafe {
            self.shared
                .device
                .cmd_draw_indexed(self.command_buffer, index_count, 1, 0, 0, 0);
        }
        Ok(())
    }
}

impl Drop for VulkanCommandList {
    fn drop(&mut self) {
        unsafe {
            self.shared
                .device
                .free_command_buffers(self.shared.command_pool, &[self.command_buffer]);
        }
    }
}
