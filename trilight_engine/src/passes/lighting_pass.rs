//! Lighting pass: the lit, shadowed scene
//!
//! Renders every mesh with per-light diffuse shading and shadow-map
//! lookups into an offscreen color target. With multisampling enabled
//! the pass rasterizes into MSAA images and average-resolves color into
//! the single-sample output during `end_rendering`; depth is never
//! resolved. The resolved color output ends the pass in the
//! shader-readable state, ready for the post-process pass.

use std::sync::Arc;

use crate::engine_info;
use crate::error::Result;
use crate::gpu::{
    BindingGroupLayout, BlendMode, ColorAttachment, CommandList, CullMode, DepthAttachment,
    DepthState, Device, Extent2d, ImageAccess, ImageTransition, Pipeline, PipelineDesc,
    PrimitiveTopology, Rect2D, RenderingDesc, ResolveMode, SampleCount, ShaderDesc, ShaderStage,
    Texture, TextureDesc, TextureFormat, TextureUsage, Viewport,
};
use crate::scene::mesh::mesh_vertex_layout;

/// Set indices of the lighting pipeline, in layout order
pub const MESH_SET_INDEX: u32 = 0;
pub const LIGHT_SET_INDEX: u32 = 1;
pub const SHADOW_SET_INDEX: u32 = 2;

/// Offscreen scene pass with optional MSAA
pub struct LightingPass {
    pipeline: Arc<dyn Pipeline>,
    model_push_offset: u32,
    color_output: Arc<dyn Texture>,
    depth_output: Arc<dyn Texture>,
    /// Present only when `sample_count` > 1
    msaa_targets: Option<(Arc<dyn Texture>, Arc<dyn Texture>)>,
    extent: Extent2d,
}

impl LightingPass {
    /// Create the pass: pipeline plus color/depth targets
    ///
    /// # Arguments
    ///
    /// * `device` - Resource factory
    /// * `mesh_set_layout` - Set 0, per-mesh sampled textures
    /// * `light_set_layout` - Set 1, the light uniform buffer
    /// * `shadow_set_layout` - Set 2, the shadow-map sampler array
    /// * `color_format` - Format of the color output
    /// * `sample_count` - Rasterization sample count; above X1 the pass
    ///   renders to MSAA images and resolves
    /// * `extent` - Target size in pixels
    pub fn new(
        device: &Arc<dyn Device>,
        mesh_set_layout: &Arc<dyn BindingGroupLayout>,
        light_set_layout: &Arc<dyn BindingGroupLayout>,
        shadow_set_layout: &Arc<dyn BindingGroupLayout>,
        color_format: TextureFormat,
        sample_count: SampleCount,
        extent: Extent2d,
    ) -> Result<Self> {
        // Push block: [camera projection + view][model matrix]
        let camera_block_size = 128;
        let model_push_offset = camera_block_size;
        let push_constant_size = camera_block_size + 64;

        let pipeline = device.create_pipeline(&PipelineDesc {
            name: "lighting".to_string(),
            shaders: vec![
                ShaderDesc {
                    stage: ShaderStage::Vertex,
                    source: include_str!("shaders/lighting.vert"),
                    entry_point: "main",
                },
                ShaderDesc {
                    stage: ShaderStage::Fragment,
                    source: include_str!("shaders/lighting.frag"),
                    entry_point: "main",
                },
            ],
            vertex_layout: mesh_vertex_layout(),
            topology: PrimitiveTopology::TriangleList,
            cull_mode: CullMode::None,
            depth: DepthState::READ_WRITE,
            blend: BlendMode::Alpha,
            sample_count,
            color_format: Some(color_format),
            depth_format: Some(TextureFormat::D32Sfloat),
            binding_group_layouts: vec![
                mesh_set_layout.clone(),
                light_set_layout.clone(),
                shadow_set_layout.clone(),
            ],
            push_constant_size,
        })?;

        let color_output = device.create_texture(&TextureDesc {
            name: "lighting_color".to_string(),
            extent,
            format: color_format,
            usage: TextureUsage::COLOR_ATTACHMENT | TextureUsage::SAMPLED | TextureUsage::TRANSFER_SRC,
            sample_count: SampleCount::X1,
        })?;
        let depth_output = device.create_texture(&TextureDesc {
            name: "lighting_depth".to_string(),
            extent,
            format: TextureFormat::D32Sfloat,
            usage: TextureUsage::DEPTH_ATTACHMENT,
            sample_count: SampleCount::X1,
        })?;

        let msaa_targets = if sample_count.as_u32() > 1 {
            let color_msaa = device.create_texture(&TextureDesc {
                name: "lighting_color_msaa".to_string(),
                extent,
                format: color_format,
                usage: TextureUsage::COLOR_ATTACHMENT,
                sample_count,
            })?;
            let depth_msaa = device.create_texture(&TextureDesc {
                name: "lighting_depth_msaa".to_string(),
                extent,
                format: TextureFormat::D32Sfloat,
                usage: TextureUsage::DEPTH_ATTACHMENT,
                sample_count,
            })?;
            Some((color_msaa, depth_msaa))
        } else {
            None
        };

        engine_info!(
            "trilight::LightingPass",
            "created {}x{} targets at {} samples",
            extent.width,
            extent.height,
            sample_count.as_u32()
        );

        Ok(Self {
            pipeline,
            model_push_offset,
            color_output,
            depth_output,
            msaa_targets,
            extent,
        })
    }

    /// Transition the targets and open the rendering scope
    ///
    /// Clears color to opaque black and depth to 1.0. The caller binds
    /// sets, pushes the camera block and draws the scene before
    /// `end_pass`.
    pub fn begin_pass(&self, cmd: &dyn CommandList) -> Result<()> {
        let mut transitions = vec![
            ImageTransition::new(
                self.color_output.as_ref(),
                ImageAccess::Undefined,
                ImageAccess::ColorAttachment,
            ),
            ImageTransition::new(
                self.depth_output.as_ref(),
                ImageAccess::Undefined,
                ImageAccess::DepthAttachment,
            ),
        ];
        if let Some((color_msaa, depth_msaa)) = &self.msaa_targets {
            transitions.push(ImageTransition::new(
                color_msaa.as_ref(),
                ImageAccess::Undefined,
                ImageAccess::ColorAttachment,
            ));
            transitions.push(ImageTransition::new(
                depth_msaa.as_ref(),
                ImageAccess::Undefined,
                ImageAccess::DepthAttachment,
            ));
        }
        cmd.transition_images(&transitions)?;

        let (color, depth) = match &self.msaa_targets {
            Some((color_msaa, depth_msaa)) => (
                ColorAttachment {
                    target: color_msaa.as_ref(),
                    resolve: Some(self.color_output.as_ref()),
                    resolve_mode: ResolveMode::Average,
                    clear: [0.0, 0.0, 0.0, 1.0],
                },
                DepthAttachment {
                    target: depth_msaa.as_ref(),
                    clear: 1.0,
                },
            ),
            None => (
                ColorAttachment {
                    target: self.color_output.as_ref(),
                    resolve: None,
                    resolve_mode: ResolveMode::None,
                    clear: [0.0, 0.0, 0.0, 1.0],
                },
                DepthAttachment {
                    target: self.depth_output.as_ref(),
                    clear: 1.0,
                },
            ),
        };

        cmd.begin_rendering(&RenderingDesc {
            extent: self.extent,
            color: Some(color),
            depth: Some(depth),
        })?;

        cmd.set_viewport(Viewport::from_extent(self.extent))?;
        cmd.set_scissor(Rect2D::from_extent(self.extent))?;
        cmd.bind_pipeline(&self.pipeline)
    }

    /// Close the rendering scope and make the color output sampleable
    pub fn end_pass(&self, cmd: &dyn CommandList) -> Result<()> {
        cmd.end_rendering()?;
        cmd.transition_images(&[ImageTransition::new(
            self.color_output.as_ref(),
            ImageAccess::ColorAttachment,
            ImageAccess::ShaderRead,
        )])
    }

    /// Pipeline scene draws run under during this pass
    pub fn pipeline(&self) -> &Arc<dyn Pipeline> {
        &self.pipeline
    }

    /// Byte offset of the model matrix within the push block
    pub fn model_push_offset(&self) -> u32 {
        self.model_push_offset
    }

    /// Resolved single-sample color output
    pub fn color_output(&self) -> &Arc<dyn Texture> {
        &self.color_output
    }

    #[cfg(test)]
    pub(crate) fn msaa_targets(&self) -> Option<(&Arc<dyn Texture>, &Arc<dyn Texture>)> {
        self.msaa_targets.as_ref().map(|(c, d)| (c, d))
    }
}

#[cfg(test)]
#[path = "lighting_pass_tests.rs"]
mod lighting_pass_tests;
