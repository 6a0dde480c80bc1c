//! Post-process pass: full-screen composite onto the swapchain image
//!
//! Draws a single full-screen triangle that samples the lit image and
//! applies the selected post effect, then hands the swapchain image to
//! the presentation engine. The pass needs no vertex buffers and no
//! depth attachment; blending is enabled so overlays drawn after the
//! composite can alpha-blend on top.

use std::sync::Arc;

use crate::error::Result;
use crate::gpu::{
    BindingGroup, BindingGroupLayout, BindingGroupLayoutDesc, BindingResource, BindingSlotDesc,
    BindingType, BlendMode, ColorAttachment, CommandList, CullMode, DepthState, Device, GpuImage,
    ImageAccess, ImageTransition, Pipeline, PipelineDesc, PrimitiveTopology, Rect2D, RenderingDesc,
    ResolveMode, SampleCount, ShaderDesc, ShaderStage, ShaderStageFlags, Texture, TextureFormat,
    VertexLayout, Viewport,
};

/// Post effect selection, pushed to the fragment shader
///
/// Modes: 1 grayscale, 2 invert, 3 vignette; any other value passes the
/// lit image through unchanged.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PostProcessOptions {
    pub mode: u32,
}

impl Default for PostProcessOptions {
    fn default() -> Self {
        Self { mode: 4 }
    }
}

/// Full-screen composite pass
pub struct PostProcessPass {
    pipeline: Arc<dyn Pipeline>,
    input_layout: Arc<dyn BindingGroupLayout>,
    input_group: Arc<dyn BindingGroup>,
    options: PostProcessOptions,
}

impl PostProcessPass {
    /// Create the pass against the swapchain color format
    ///
    /// # Arguments
    ///
    /// * `device` - Resource factory
    /// * `color_format` - Format of the presentation images
    /// * `input` - Lit image to sample (the lighting pass color output)
    pub fn new(
        device: &Arc<dyn Device>,
        color_format: TextureFormat,
        input: &Arc<dyn Texture>,
    ) -> Result<Self> {
        let input_layout = device.create_binding_group_layout(&BindingGroupLayoutDesc {
            name: "post_process_input".to_string(),
            entries: vec![BindingSlotDesc {
                binding: 0,
                binding_type: BindingType::CombinedImageSampler,
                count: 1,
                stage_flags: ShaderStageFlags::FRAGMENT,
            }],
        })?;
        let input_group = device.create_binding_group(
            &input_layout,
            &[BindingResource::SampledTexture(input.as_ref())],
        )?;

        let pipeline = device.create_pipeline(&PipelineDesc {
            name: "post_process".to_string(),
            shaders: vec![
                ShaderDesc {
                    stage: ShaderStage::Vertex,
                    source: include_str!("shaders/post_process.vert"),
                    entry_point: "main",
                },
                ShaderDesc {
                    stage: ShaderStage::Fragment,
                    source: include_str!("shaders/post_process.frag"),
                    entry_point: "main",
                },
            ],
            vertex_layout: VertexLayout::default(),
            topology: PrimitiveTopology::TriangleList,
            cull_mode: CullMode::None,
            depth: DepthState::DISABLED,
            blend: BlendMode::Alpha,
            sample_count: SampleCount::X1,
            color_format: Some(color_format),
            depth_format: None,
            binding_group_layouts: vec![input_layout.clone()],
            push_constant_size: std::mem::size_of::<PostProcessOptions>() as u32,
        })?;

        Ok(Self {
            pipeline,
            input_layout,
            input_group,
            options: PostProcessOptions::default(),
        })
    }

    /// Select the post effect for subsequent frames
    pub fn set_options(&mut self, options: PostProcessOptions) {
        self.options = options;
    }

    /// Point the pass at a different lit image (e.g. after a resize)
    pub fn set_input(&mut self, device: &Arc<dyn Device>, input: &Arc<dyn Texture>) -> Result<()> {
        self.input_group = device.create_binding_group(
            &self.input_layout,
            &[BindingResource::SampledTexture(input.as_ref())],
        )?;
        Ok(())
    }

    /// Record the composite onto the presentation image
    ///
    /// Transitions the image to the color-attachment state, draws the
    /// full-screen triangle, runs `extra_draws` for overlays inside the
    /// same rendering scope, then transitions the image for present.
    ///
    /// # Arguments
    ///
    /// * `cmd` - Command list to record into
    /// * `present_image` - The acquired swapchain image
    /// * `extra_draws` - Overlay callback, invoked inside the scope
    pub fn do_pass<F>(
        &self,
        cmd: &dyn CommandList,
        present_image: &dyn GpuImage,
        mut extra_draws: F,
    ) -> Result<()>
    where
        F: FnMut(&dyn CommandList) -> Result<()>,
    {
        cmd.transition_images(&[ImageTransition::new(
            present_image,
            ImageAccess::Undefined,
            ImageAccess::ColorAttachment,
        )])?;

        let extent = present_image.extent();
        cmd.begin_rendering(&RenderingDesc {
            extent,
            color: Some(ColorAttachment {
                target: present_image,
                resolve: None,
                resolve_mode: ResolveMode::None,
                clear: [0.0, 0.0, 0.0, 1.0],
            }),
            depth: None,
        })?;

        cmd.set_viewport(Viewport::from_extent(extent))?;
        cmd.set_scissor(Rect2D::from_extent(extent))?;
        cmd.bind_pipeline(&self.pipeline)?;
        cmd.bind_binding_group(&self.pipeline, 0, &self.input_group)?;
        cmd.push_constants(&self.pipeline, 0, bytemuck::bytes_of(&self.options))?;
        cmd.draw(3, 0)?;

        extra_draws(cmd)?;

        cmd.end_rendering()?;

        cmd.transition_images(&[ImageTransition::new(
            present_image,
            ImageAccess::ColorAttachment,
            ImageAccess::Present,
        )])
    }

    pub fn options(&self) -> PostProcessOptions {
        self.options
    }

    pub fn pipeline(&self) -> &Arc<dyn Pipeline> {
        &self.pipeline
    }
}

#[cfg(test)]
#[path = "post_process_pass_tests.rs"]
mod post_process_pass_tests;
