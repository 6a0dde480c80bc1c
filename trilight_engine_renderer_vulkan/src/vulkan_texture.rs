//! Vulkan texture implementation

use ash::vk;
use gpu_allocator::vulkan::Allocation;
use std::any::Any;
use std::sync::{Arc, Mutex};

use trilight_engine::trilight::gpu::{
    Extent2d, GpuImage, SampleCount, Texture, TextureDesc, TextureFormat, TextureUsage,
};

use crate::vulkan_device::DeviceShared;

// ===== FORMAT MAPPING =====

pub(crate) fn vk_format(format: TextureFormat) -> vk::Format {
    match format {
        TextureFormat::Rgba8Srgb => vk::Format::R8G8B8A8_SRGB,
        TextureFormat::Rgba8Unorm => vk::Format::R8G8B8A8_UNORM,
        TextureFormat::Bgra8Unorm => vk::Format::B8G8R8A8_UNORM,
        TextureFormat::D32Sfloat => vk::Format::D32_SFLOAT,
        TextureFormat::R32Sfloat => vk::Format::R32_SFLOAT,
        TextureFormat::R32g32Sfloat => vk::Format::R32G32_SFLOAT,
        TextureFormat::R32g32b32Sfloat => vk::Format::R32G32B32_SFLOAT,
        TextureFormat::R32g32b32a32Sfloat => vk::Format::R32G32B32A32_SFLOAT,
    }
}

pub(crate) fn vk_sample_count(sample_count: SampleCount) -> vk::SampleCountFlags {
    match sample_count {
        SampleCount::X1 => vk::SampleCountFlags::TYPE_1,
        SampleCount::X2 => vk::SampleCountFlags::TYPE_2,
        SampleCount::X4 => vk::SampleCountFlags::TYPE_4,
        SampleCount::X8 => vk::SampleCountFlags::TYPE_8,
    }
}

pub(crate) fn vk_usage(usage: TextureUsage) -> vk::ImageUsageFlags {
    let mut flags = vk::ImageUsageFlags::empty();
    if usage.contains(TextureUsage::SAMPLED) {
        flags |= vk::ImageUsageFlags::SAMPLED;
    }
    if usage.contains(TextureUsage::COLOR_ATTACHMENT) {
        flags |= vk::ImageUsageFlags::COLOR_ATTACHMENT;
    }
    if usage.contains(TextureUsage::DEPTH_ATTACHMENT) {
        flags |= vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT;
    }
    if usage.contains(TextureUsage::TRANSFER_SRC) {
        flags |= vk::ImageUsageFlags::TRANSFER_SRC;
    }
    if usage.contains(TextureUsage::TRANSFER_DST) {
        flags |= vk::ImageUsageFlags::TRANSFER_DST;
    }
    flags
}

pub(crate) fn vk_aspect(format: TextureFormat) -> vk::ImageAspectFlags {
    if format.is_depth() {
        vk::ImageAspectFlags::DEPTH
    } else {
        vk::ImageAspectFlags::COLOR
    }
}

// ===== TEXTURE =====

/// Image + view + sampler backed by a dedicated allocation
pub struct VulkanTexture {
    shared: Arc<DeviceShared>,
    id: u64,
    desc: TextureDesc,
    pub(crate) image: vk::Image,
    pub(crate) view: vk::ImageView,
    pub(crate) sampler: vk::Sampler,
    allocation: Mutex<Option<Allocation>>,
}

impl VulkanTexture {
    pub(crate) fn new(
        shared: Arc<DeviceShared>,
        id: u64,
        desc: TextureDesc,
        image: vk::Image,
        view: vk::ImageView,
        sampler: vk::Sampler,
        allocation: Allocation,
    ) -> Self {
        Self {
            shared,
            id,
            desc,
            image,
            view,
            sampler,
            allocation: Mutex::new(Some(allocation)),
        }
    }
}

impl GpuImage for VulkanTexture {
    fn image_id(&self) -> u64 {
        self.id
    }

    fn extent(&self) -> Extent2d {
        self.desc.extent
    }

    fn format(&self) -> TextureFormat {
        self.desc.format
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Texture for VulkanTexture {
    fn desc(&self) -> &TextureDesc {
        &self.desc
    }
}

impl Drop for VulkanTexture {
    fn drop(&mut self) {
        unsafe {
            self.shared.device.destroy_sampler(self.sampler, None);
            self.shared.device.destroy_image_view(self.view, None);
            self.shared.device.destroy_image(self.image, None);
        }
        if let Some(allocation) = self.allocation.lock().unwrap().take() {
            self.shared.free_allocation(allocation);
        }
    }
}
