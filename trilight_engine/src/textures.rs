//! Texture registry
//!
//! Owns every scene texture together with its ready-made binding group,
//! keyed by name. All groups share one layout (a single combined image
//! sampler at binding 0), which both scene pipelines take as set 0.
//! Registered textures are uploaded shader-readable, so they never take
//! part in per-frame transition batches.

use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::engine_debug;
use crate::error::{Error, Result};
use crate::gpu::{
    BindingGroup, BindingGroupLayout, BindingGroupLayoutDesc, BindingResource, BindingSlotDesc,
    BindingType, Device, Extent2d, SampleCount, ShaderStageFlags, Texture, TextureDesc,
    TextureFormat, TextureUsage,
};

struct RegistryEntry {
    texture: Arc<dyn Texture>,
    group: Arc<dyn BindingGroup>,
}

/// Named scene textures with per-texture binding groups
pub struct TextureRegistry {
    device: Arc<dyn Device>,
    layout: Arc<dyn BindingGroupLayout>,
    entries: FxHashMap<String, RegistryEntry>,
}

impl TextureRegistry {
    pub fn new(device: &Arc<dyn Device>) -> Result<Self> {
        let layout = device.create_binding_group_layout(&BindingGroupLayoutDesc {
            name: "mesh_texture".to_string(),
            entries: vec![BindingSlotDesc {
                binding: 0,
                binding_type: BindingType::CombinedImageSampler,
                count: 1,
                stage_flags: ShaderStageFlags::FRAGMENT,
            }],
        })?;

        Ok(Self {
            device: device.clone(),
            layout,
            entries: FxHashMap::default(),
        })
    }

    /// Register a texture from raw RGBA8 pixels
    ///
    /// # Arguments
    ///
    /// * `name` - Registry key; re-registering a name replaces the entry
    /// * `width` / `height` - Size in pixels
    /// * `pixels` - Tightly packed RGBA8 data
    pub fn register(&mut self, name: &str, width: u32, height: u32, pixels: &[u8]) -> Result<()> {
        let texture = self.device.create_texture_with_data(
            &TextureDesc {
                name: name.to_string(),
                extent: Extent2d::new(width, height),
                format: TextureFormat::Rgba8Unorm,
                usage: TextureUsage::SAMPLED | TextureUsage::TRANSFER_DST,
                sample_count: SampleCount::X1,
            },
            pixels,
        )?;
        let group = self.device.create_binding_group(
            &self.layout,
            &[BindingResource::SampledTexture(texture.as_ref())],
        )?;

        self.entries
            .insert(name.to_string(), RegistryEntry { texture, group });
        engine_debug!("trilight::TextureRegistry", "registered '{}' ({}x{})", name, width, height);
        Ok(())
    }

    /// Register a solid white 1x1 texture
    pub fn register_white(&mut self, name: &str) -> Result<()> {
        self.register(name, 1, 1, &[255, 255, 255, 255])
    }

    /// Register a two-tone checkerboard
    ///
    /// # Arguments
    ///
    /// * `size` - Side length in pixels
    /// * `cells` - Checker cells per side
    pub fn register_checker(&mut self, name: &str, size: u32, cells: u32) -> Result<()> {
        let cell = (size / cells.max(1)).max(1);
        let mut pixels = Vec::with_capacity((size * size * 4) as usize);
        for y in 0..size {
            for x in 0..size {
                let dark = ((x / cell) + (y / cell)) % 2 == 0;
                let value = if dark { 60 } else { 220 };
                pixels.extend_from_slice(&[value, value, value, 255]);
            }
        }
        self.register(name, size, size, &pixels)
    }

    /// Binding group of a registered texture
    pub fn group(&self, name: &str) -> Result<&Arc<dyn BindingGroup>> {
        self.entries
            .get(name)
            .map(|entry| &entry.group)
            .ok_or_else(|| Error::ResourceNotFound(name.to_string()))
    }

    /// Texture handle of a registered texture
    pub fn texture(&self, name: &str) -> Result<&Arc<dyn Texture>> {
        self.entries
            .get(name)
            .map(|entry| &entry.texture)
            .ok_or_else(|| Error::ResourceNotFound(name.to_string()))
    }

    /// Shared set 0 layout, for pipeline creation
    pub fn layout(&self) -> &Arc<dyn BindingGroupLayout> {
        &self.layout
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "textures_tests.rs"]
mod textures_tests;
