//! Vulkan descriptor set layouts and descriptor sets

use ash::vk;
use std::any::Any;
use std::sync::Arc;

use trilight_engine::trilight::gpu::{
    BindingGroup, BindingGroupLayout, BindingGroupLayoutDesc, BindingResource, BindingType,
    ShaderStageFlags,
};
use trilight_engine::trilight::{Error, Result};

use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_device::DeviceShared;
use crate::vulkan_texture::VulkanTexture;

pub(crate) fn vk_stage_flags(stage_flags: ShaderStageFlags) -> vk::ShaderStageFlags {
    let mut flags = vk::ShaderStageFlags::empty();
    if stage_flags.vertex {
        flags |= vk::ShaderStageFlags::VERTEX;
    }
    if stage_flags.fragment {
        flags |= vk::ShaderStageFlags::FRAGMENT;
    }
    flags
}

pub(crate) fn vk_descriptor_type(binding_type: BindingType) -> vk::DescriptorType {
    match binding_type {
        BindingType::UniformBuffer => vk::DescriptorType::UNIFORM_BUFFER,
        BindingType::CombinedImageSampler => vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
    }
}

// ===== LAYOUT =====

pub struct VulkanBindingGroupLayout {
    shared: Arc<DeviceShared>,
    desc: BindingGroupLayoutDesc,
    pub(crate) layout: vk::DescriptorSetLayout,
}

impl VulkanBindingGroupLayout {
    pub(crate) fn new(shared: Arc<DeviceShared>, desc: &BindingGroupLayoutDesc) -> Result<Self> {
        let bindings: Vec<vk::DescriptorSetLayoutBinding> = desc
            .entries
            .iter()
            .map(|entry| {
                vk::DescriptorSetLayoutBinding::default()
                    .binding(entry.binding)
                    .descriptor_type(vk_descriptor_type(entry.binding_type))
                    .descriptor_count(entry.count)
                    .stage_flags(vk_stage_flags(entry.stage_flags))
            })
            .collect();

        let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
        let layout = unsafe {
            shared
                .device
                .create_descriptor_set_layout(&create_info, None)
                .map_err(|e| {
                    Error::BackendError(format!(
                        "vkCreateDescriptorSetLayout failed for '{}': {e}",
                        desc.name
                    ))
                })?
        };

        Ok(Self {
            shared,
            desc: desc.clone(),
            layout,
        })
    }
}

impl BindingGroupLayout for VulkanBindingGroupLayout {
    fn desc(&self) -> &BindingGroupLayoutDesc {
        &self.desc
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanBindingGroupLayout {
    fn drop(&mut self) {
        unsafe {
            self.shared
                .device
                .destroy_descriptor_set_layout(self.layout, None);
        }
    }
}

// ===== GROUP =====

/// A descriptor set allocated from the device pool, fully written at
/// creation. The pool is created without FREE_DESCRIPTOR_SET; sets are
/// reclaimed when the pool is destroyed with the device.
pub struct VulkanBindingGroup {
    pub(crate) set: vk::DescriptorSet,
}

impl VulkanBindingGroup {
    pub(crate) fn new(
        shared: &Arc<DeviceShared>,
        layout: &VulkanBindingGroupLayout,
        resources: &[BindingResource],
    ) -> Result<Self> {
        if resources.len() != layout.desc.entries.len() {
            return Err(Error::InvalidResource(format!(
                "binding group for '{}' got {} resources for {} slots",
                layout.desc.name,
                resources.len(),
                layout.desc.entries.len()
            )));
        }

        let layouts = [layout.layout];
        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(shared.descriptor_pool)
            .set_layouts(&layouts);
        let set = unsafe {
            shared
                .device
                .allocate_descriptor_sets(&alloc_info)
                .map_err(|e| {
                    Error::BackendError(format!(
                        "vkAllocateDescriptorSets failed for '{}': {e}",
                        layout.desc.name
                    ))
                })?[0]
        };

        // Per-write payloads must stay alive until update_descriptor_sets.
        let mut buffer_infos: Vec<Vec<vk::DescriptorBufferInfo>> = Vec::new();
        let mut image_infos: Vec<Vec<vk::DescriptorImageInfo>> = Vec::new();

        for (slot, resource) in layout.desc.entries.iter().zip(resources.iter()) {
            match resource {
                BindingResource::UniformBuffer(buffer) => {
                    let buffer = downcast_buffer(buffer.as_any(), &layout.desc.name)?;
                    buffer_infos.push(vec![vk::DescriptorBufferInfo::default()
                        .buffer(buffer.buffer)
                        .offset(0)
                        .range(vk::WHOLE_SIZE)]);
                    image_infos.push(Vec::new());
                }
                BindingResource::SampledTexture(texture) => {
                    let texture = downcast_texture(texture.as_any(), &layout.desc.name)?;
                    image_infos.push(vec![sampled_image_info(texture)]);
                    buffer_infos.push(Vec::new());
                }
                BindingResource::SampledTextureArray(textures) => {
                    if textures.len() != slot.count as usize {
                        return Err(Error::InvalidResource(format!(
                            "array binding {} of '{}' expects {} textures, got {}",
                            slot.binding,
                            layout.desc.name,
                            slot.count,
                            textures.len()
                        )));
                    }
                    let infos = textures
                        .iter()
                        .map(|t| {
                            downcast_texture(t.as_any(), &layout.desc.name)
                                .map(sampled_image_info)
                        })
                        .collect::<Result<Vec<_>>>()?;
                    image_infos.push(infos);
                    buffer_infos.push(Vec::new());
                }
            }
        }

        let writes: Vec<vk::WriteDescriptorSet> = layout
            .desc
            .entries
            .iter()
            .enumerate()
            .map(|(i, slot)| {
                let write = vk::WriteDescriptorSet::default()
                    .dst_set(set)
                    .dst_binding(slot.binding)
                    .descriptor_type(vk_descriptor_type(slot.binding_type));
                match slot.binding_type {
                    BindingType::UniformBuffer => write.buffer_info(&buffer_infos[i]),
                    BindingType::CombinedImageSampler => write.image_info(&image_infos[i]),
                }
            })
            .collect();

        unsafe {
            shared.device.update_descriptor_sets(&writes, &[]);
        }

        Ok(Self { set })
    }
}

impl BindingGroup for VulkanBindingGroup {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn sampled_image_info(texture: &VulkanTexture) -> vk::DescriptorImageInfo {
    vk::DescriptorImageInfo::default()
        .sampler(texture.sampler)
        .image_view(texture.view)
        .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
}

fn downcast_buffer<'a>(any: &'a dyn Any, group: &str) -> Result<&'a VulkanBuffer> {
    any.downcast_ref::<VulkanBuffer>().ok_or_else(|| {
        Error::InvalidResource(format!("binding group '{group}' got a non-Vulkan buffer"))
    })
}

fn downcast_texture<'a>(any: &'a dyn Any, group: &str) -> Result<&'a VulkanTexture> {
    any.downcast_ref::<VulkanTexture>().ok_or_else(|| {
        Error::InvalidResource(format!("binding group '{group}' got a non-Vulkan texture"))
    })
}
