//! Vulkan graphics pipeline implementation
//!
//! Pipelines are built for dynamic rendering: no render pass object, the
//! attachment formats go into `PipelineRenderingCreateInfo`. Viewport and
//! scissor are dynamic state, set per pass.

use ash::vk;
use std::any::Any;
use std::ffi::CString;
use std::sync::Arc;

use trilight_engine::trilight::gpu::{
    BlendMode, CullMode, PipelineDesc, PrimitiveTopology, ShaderStage,
};
use trilight_engine::trilight::{Error, Result};

use crate::vulkan_binding_group::VulkanBindingGroupLayout;
use crate::vulkan_device::DeviceShared;
use crate::vulkan_shader::compile_glsl;
use crate::vulkan_texture::{vk_format, vk_sample_count};

pub struct VulkanPipeline {
    shared: Arc<DeviceShared>,
    push_constant_size: u32,
    pub(crate) pipeline: vk::Pipeline,
    pub(crate) layout: vk::PipelineLayout,
    pub(crate) push_constant_stages: vk::ShaderStageFlags,
}

impl VulkanPipeline {
    pub(crate) fn new(shared: Arc<DeviceShared>, desc: &PipelineDesc) -> Result<Self> {
        let device = &shared.device;

        // Pipeline layout: set layouts in order plus one push block.
        let set_layouts: Vec<vk::DescriptorSetLayout> = desc
            .binding_group_layouts
            .iter()
            .map(|layout| {
                layout
                    .as_any()
                    .downcast_ref::<VulkanBindingGroupLayout>()
                    .map(|l| l.layout)
                    .ok_or_else(|| {
                        Error::InvalidResource(format!(
                            "pipeline '{}' got a non-Vulkan binding group layout",
                            desc.name
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let entry_points: Vec<CString> = desc
            .shaders
            .iter()
            .map(|shader| {
                CString::new(shader.entry_point).map_err(|_| {
                    Error::InvalidResource(format!(
                        "pipeline '{}' has an entry point with an interior NUL",
                        desc.name
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let push_constant_stages = vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT;
        let push_ranges = [vk::PushConstantRange::default()
            .stage_flags(push_constant_stages)
            .offset(0)
            .size(desc.push_constant_size.max(4))];

        let mut layout_info = vk::PipelineLayoutCreateInfo::default().set_layouts(&set_layouts);
        if desc.push_constant_size > 0 {
            layout_info = layout_info.push_constant_ranges(&push_ranges);
        }
        let layout = unsafe {
            device
                .create_pipeline_layout(&layout_info, None)
                .map_err(|e| {
                    Error::BackendError(format!(
                        "vkCreatePipelineLayout failed for '{}': {e}",
                        desc.name
                    ))
                })?
        };

        // Shader modules from GLSL via naga.
        let mut modules: Vec<vk::ShaderModule> = Vec::with_capacity(desc.shaders.len());
        let mut stages: Vec<vk::PipelineShaderStageCreateInfo> = Vec::with_capacity(desc.shaders.len());
        for (shader, entry_point) in desc.shaders.iter().zip(&entry_points) {
            let words = match compile_glsl(shader) {
                Ok(words) => words,
                Err(e) => {
                    destroy_modules(device, &modules);
                    unsafe { device.destroy_pipeline_layout(layout, None) };
                    return Err(e);
                }
            };
            let module_info = vk::ShaderModuleCreateInfo::default().code(&words);
            let module = unsafe {
                match device.create_shader_module(&module_info, None) {
                    Ok(module) => module,
                    Err(e) => {
                        destroy_modules(device, &modules);
                        device.destroy_pipeline_layout(layout, None);
                        return Err(Error::BackendError(format!(
                            "vkCreateShaderModule failed for '{}': {e}",
                            desc.name
                        )));
                    }
                }
            };
            modules.push(module);
            stages.push(
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(match shader.stage {
                        ShaderStage::Vertex => vk::ShaderStageFlags::VERTEX,
                        ShaderStage::Fragment => vk::ShaderStageFlags::FRAGMENT,
                    })
                    .module(module)
                    .name(entry_point),
            );
        }

        // Vertex input from the layout description.
        let binding_descs: Vec<vk::VertexInputBindingDescription> = desc
            .vertex_layout
            .bindings
            .iter()
            .map(|b| {
                vk::VertexInputBindingDescription::default()
                    .binding(b.binding)
                    .stride(b.stride)
                    .input_rate(vk::VertexInputRate::VERTEX)
            })
            .collect();
        let attribute_descs: Vec<vk::VertexInputAttributeDescription> = desc
            .vertex_layout
            .bindings
            .iter()
            .flat_map(|b| {
                b.attributes.iter().map(|a| {
                    vk::VertexInputAttributeDescription::default()
                        .location(a.location)
                        .binding(b.binding)
                        .format(vk_format(a.format))
                        .offset(a.offset)
                })
            })
            .collect();
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&binding_descs)
            .vertex_attribute_descriptions(&attribute_descs);

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(match desc.topology {
                PrimitiveTopology::TriangleList => vk::PrimitiveTopology::TRIANGLE_LIST,
            });

        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);

        let mut rasterization = vk::PipelineRasterizationStateCreateInfo::default()
            .polygon_mode(vk::PolygonMode::FILL)
            .cull_mode(match desc.cull_mode {
                CullMode::None => vk::CullModeFlags::NONE,
                CullMode::Back => vk::CullModeFlags::BACK,
            })
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
            .line_width(1.0);
        if let Some(bias) = desc.depth.bias {
            rasterization = rasterization
                .depth_bias_enable(true)
                .depth_bias_constant_factor(bias.constant)
                .depth_bias_slope_factor(bias.slope);
        }

        let multisample = vk::PipelineMultisampleStateCreateInfo::default()
            .rasterization_samples(vk_sample_count(desc.sample_count));

        let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(desc.depth.test)
            .depth_write_enable(desc.depth.write)
            .depth_compare_op(vk::CompareOp::LESS);

        let blend_attachment = match desc.blend {
            BlendMode::Disabled => vk::PipelineColorBlendAttachmentState::default()
                .blend_enable(false)
                .color_write_mask(vk::ColorComponentFlags::RGBA),
            BlendMode::Alpha => vk::PipelineColorBlendAttachmentState::default()
                .blend_enable(true)
                .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
                .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
                .color_blend_op(vk::BlendOp::ADD)
                .src_alpha_blend_factor(vk::BlendFactor::ONE)
                .dst_alpha_blend_factor(vk::BlendFactor::ZERO)
                .alpha_blend_op(vk::BlendOp::ADD)
                .color_write_mask(vk::ColorComponentFlags::RGBA),
        };
        let blend_attachments = if desc.color_format.is_some() {
            vec![blend_attachment]
        } else {
            Vec::new()
        };
        let color_blend =
            vk::PipelineColorBlendStateCreateInfo::default().attachments(&blend_attachments);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state =
            vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let color_formats: Vec<vk::Format> =
            desc.color_format.iter().map(|f| vk_format(*f)).collect();
        let mut rendering_info = vk::PipelineRenderingCreateInfo::default()
            .color_attachment_formats(&color_formats);
        if let Some(depth_format) = desc.depth_format {
            rendering_info = rendering_info.depth_attachment_format(vk_format(depth_format));
        }

        let create_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization)
            .multisample_state(&multisample)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blend)
            .dynamic_state(&dynamic_state)
            .layout(layout)
            .push_next(&mut rendering_info);

        let pipeline = unsafe {
            match device.create_graphics_pipelines(
                vk::PipelineCache::null(),
                &[create_info],
                None,
            ) {
                Ok(pipelines) => pipelines[0],
                Err((_, e)) => {
                    destroy_modules(device, &modules);
                    device.destroy_pipeline_layout(layout, None);
                    return Err(Error::BackendError(format!(
                        "vkCreateGraphicsPipelines failed for '{}': {e}",
                        desc.name
                    )));
                }
            }
        };

        destroy_modules(device, &modules);

        Ok(Self {
            shared,
            push_constant_size: desc.push_constant_size,
            pipeline,
            layout,
            push_constant_stages,
        })
    }
}

fn destroy_modules(device: &ash::Device, modules: &[vk::ShaderModule]) {
    for module in modules {
        unsafe { device.destroy_shader_module(*module, None) };
    }
}

impl trilight_engine::trilight::gpu::Pipeline for VulkanPipeline {
    fn push_constant_size(&self) -> u32 {
        self.push_constant_size
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanPipeline {
    fn drop(&mut self) {
        unsafe {
            self.shared.device.destroy_pipeline(self.pipeline, None);
            self.shared.device.destroy_pipeline_layout(self.layout, None);
        }
    }
}
