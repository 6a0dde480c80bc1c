//! Shadow pass: one depth map per light
//!
//! Renders scene depth from each light's point of view into a dedicated
//! D32 texture, then exposes all maps as one combined-image-sampler
//! array for the lighting pass. Transitions bracket the whole pass: one
//! batch moves every map to the depth-attachment state, one batch moves
//! them all to shader-readable.

use std::sync::Arc;

use crate::engine_info;
use crate::error::Result;
use crate::gpu::{
    BindingGroup, BindingGroupLayout, BindingGroupLayoutDesc, BindingResource, BindingSlotDesc,
    BindingType, BlendMode, CommandList, CullMode, DepthAttachment, DepthBias, DepthState, Device,
    Extent2d, ImageAccess, ImageTransition, Pipeline, PipelineDesc, PrimitiveTopology, Rect2D,
    RenderingDesc, SampleCount, ShaderDesc, ShaderStage, ShaderStageFlags, Texture, TextureDesc,
    TextureFormat, TextureUsage, Viewport,
};
use crate::passes::light_rig::{LightMatrices, LightRig, LIGHT_COUNT};
use crate::scene::mesh::position_vertex_layout;

/// Side length of the square shadow maps, in pixels
pub const SHADOW_RESOLUTION: u32 = 2 * 1024;

/// Depth bias baked into the shadow pipeline
const DEPTH_BIAS: DepthBias = DepthBias {
    constant: 0.5,
    slope: 1.75,
};

/// Depth-only pass rendering one shadow map per light
pub struct ShadowPass {
    depth_maps: Vec<Arc<dyn Texture>>,
    pipeline: Arc<dyn Pipeline>,
    model_push_offset: u32,
    shadow_map_layout: Arc<dyn BindingGroupLayout>,
    shadow_map_group: Arc<dyn BindingGroup>,
    extent: Extent2d,
}

impl ShadowPass {
    /// Create the pass: depth maps, pipeline, and the sampled-array set
    ///
    /// The pipeline is depth-only: position-only vertex input and no
    /// descriptor sets, so scene draws under it bind nothing but the
    /// position stream.
    pub fn new(device: &Arc<dyn Device>) -> Result<Self> {
        let extent = Extent2d::new(SHADOW_RESOLUTION, SHADOW_RESOLUTION);

        let mut depth_maps = Vec::with_capacity(LIGHT_COUNT);
        for i in 0..LIGHT_COUNT {
            depth_maps.push(device.create_texture(&TextureDesc {
                name: format!("shadow_map_{}", i),
                extent,
                format: TextureFormat::D32Sfloat,
                usage: TextureUsage::DEPTH_ATTACHMENT | TextureUsage::SAMPLED,
                sample_count: SampleCount::X1,
            })?);
        }

        // Push block: [light projection + view][model matrix]
        let light_block_size = std::mem::size_of::<LightMatrices>() as u32;
        let model_push_offset = light_block_size;
        let push_constant_size = light_block_size + 64;

        let pipeline = device.create_pipeline(&PipelineDesc {
            name: "shadow".to_string(),
            shaders: vec![
                ShaderDesc {
                    stage: ShaderStage::Vertex,
                    source: include_str!("shaders/shadow.vert"),
                    entry_point: "main",
                },
                ShaderDesc {
                    stage: ShaderStage::Fragment,
                    source: include_str!("shaders/shadow.frag"),
                    entry_point: "main",
                },
            ],
            vertex_layout: position_vertex_layout(),
            topology: PrimitiveTopology::TriangleList,
            cull_mode: CullMode::None,
            depth: DepthState {
                test: true,
                write: true,
                bias: Some(DEPTH_BIAS),
            },
            blend: BlendMode::Disabled,
            sample_count: SampleCount::X1,
            color_format: None,
            depth_format: Some(TextureFormat::D32Sfloat),
            binding_group_layouts: vec![],
            push_constant_size,
        })?;

        let shadow_map_layout = device.create_binding_group_layout(&BindingGroupLayoutDesc {
            name: "shadow_maps".to_string(),
            entries: vec![BindingSlotDesc {
                binding: 0,
                binding_type: BindingType::CombinedImageSampler,
                count: LIGHT_COUNT as u32,
                stage_flags: ShaderStageFlags::FRAGMENT,
            }],
        })?;
        let shadow_map_group = device.create_binding_group(
            &shadow_map_layout,
            &[BindingResource::SampledTextureArray(
                depth_maps.iter().map(|t| t.as_ref() as &dyn Texture).collect(),
            )],
        )?;

        engine_info!(
            "trilight::ShadowPass",
            "created {} shadow maps at {}x{}",
            LIGHT_COUNT,
            SHADOW_RESOLUTION,
            SHADOW_RESOLUTION
        );

        Ok(Self {
            depth_maps,
            pipeline,
            model_push_offset,
            shadow_map_layout,
            shadow_map_group,
            extent,
        })
    }

    /// Record the whole shadow pass
    ///
    /// Transitions every map to the depth-attachment state in one batch,
    /// renders the scene once per light, then moves all maps to
    /// shader-readable in a second batch.
    ///
    /// # Arguments
    ///
    /// * `cmd` - Command list to record into
    /// * `rig` - Light rig providing per-light matrices
    /// * `draw_scene` - Scene draw callback, invoked once per light with
    ///   the shadow pipeline bound and the light block already pushed
    pub fn do_pass<F>(&self, cmd: &dyn CommandList, rig: &LightRig, mut draw_scene: F) -> Result<()>
    where
        F: FnMut(&dyn CommandList) -> Result<()>,
    {
        let to_attachment: Vec<ImageTransition> = self
            .depth_maps
            .iter()
            .map(|map| {
                ImageTransition::new(
                    map.as_ref(),
                    ImageAccess::Undefined,
                    ImageAccess::DepthAttachment,
                )
            })
            .collect();
        cmd.transition_images(&to_attachment)?;

        for light_index in 0..rig.count() {
            cmd.begin_rendering(&RenderingDesc {
                extent: self.extent,
                color: None,
                depth: Some(DepthAttachment {
                    target: self.depth_maps[light_index].as_ref(),
                    clear: 1.0,
                }),
            })?;

            cmd.set_viewport(Viewport::from_extent(self.extent))?;
            cmd.set_scissor(Rect2D::from_extent(self.extent))?;
            cmd.bind_pipeline(&self.pipeline)?;

            let matrices = rig.matrices(light_index);
            cmd.push_constants(&self.pipeline, 0, bytemuck::bytes_of(&matrices))?;

            draw_scene(cmd)?;

            cmd.end_rendering()?;
        }

        let to_read: Vec<ImageTransition> = self
            .depth_maps
            .iter()
            .map(|map| {
                ImageTransition::new(
                    map.as_ref(),
                    ImageAccess::DepthAttachment,
                    ImageAccess::ShaderRead,
                )
            })
            .collect();
        cmd.transition_images(&to_read)
    }

    /// Bind the shadow-map sampler array at the given set index
    pub fn bind(
        &self,
        cmd: &dyn CommandList,
        pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
    ) -> Result<()> {
        cmd.bind_binding_group(pipeline, set_index, &self.shadow_map_group)
    }

    /// Pipeline scene draws run under during this pass
    pub fn pipeline(&self) -> &Arc<dyn Pipeline> {
        &self.pipeline
    }

    /// Byte offset of the model matrix within the push block
    pub fn model_push_offset(&self) -> u32 {
        self.model_push_offset
    }

    /// Layout of the shadow-map set, for lighting pipeline creation
    pub fn shadow_map_layout(&self) -> &Arc<dyn BindingGroupLayout> {
        &self.shadow_map_layout
    }

    pub fn depth_maps(&self) -> &[Arc<dyn Texture>] {
        &self.depth_maps
    }
}

#[cfg(test)]
#[path = "shadow_pass_tests.rs"]
mod shadow_pass_tests;
