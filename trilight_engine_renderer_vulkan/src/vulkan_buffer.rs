//! Vulkan buffer implementation
//!
//! All buffers live in host-visible memory and stay persistently mapped,
//! so `update` is a plain memcpy. Vertex and index data in this engine is
//! small and uploaded once; uniform data is rewritten every frame.

use ash::vk;
use gpu_allocator::vulkan::Allocation;
use std::any::Any;
use std::sync::{Arc, Mutex};

use trilight_engine::trilight::gpu::{Buffer, BufferDesc, BufferUsage};
use trilight_engine::trilight::{Error, Result};

use crate::vulkan_device::DeviceShared;

pub(crate) fn vk_buffer_usage(usage: BufferUsage) -> vk::BufferUsageFlags {
    match usage {
        BufferUsage::Vertex => vk::BufferUsageFlags::VERTEX_BUFFER,
        BufferUsage::Index => vk::BufferUsageFlags::INDEX_BUFFER,
        BufferUsage::Uniform => vk::BufferUsageFlags::UNIFORM_BUFFER,
    }
}

pub struct VulkanBuffer {
    shared: Arc<DeviceShared>,
    desc: BufferDesc,
    pub(crate) buffer: vk::Buffer,
    allocation: Mutex<Option<Allocation>>,
}

impl VulkanBuffer {
    pub(crate) fn new(
        shared: Arc<DeviceShared>,
        desc: BufferDesc,
        buffer: vk::Buffer,
        allocation: Allocation,
    ) -> Self {
        Self {
            shared,
            desc,
            buffer,
            allocation: Mutex::new(Some(allocation)),
        }
    }
}

impl Buffer for VulkanBuffer {
    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        if offset + data.len() as u64 > self.desc.size {
            return Err(Error::InvalidResource(format!(
                "update of {} bytes at offset {} overruns buffer '{}' ({} bytes)",
                data.len(),
                offset,
                self.desc.name,
                self.desc.size
            )));
        }

        let mut guard = self.allocation.lock().unwrap();
        let allocation = guard
            .as_mut()
            .ok_or_else(|| Error::BackendError("buffer allocation already freed".to_string()))?;
        let mapped = allocation
            .mapped_slice_mut()
            .ok_or_else(|| Error::BackendError("buffer memory is not host mapped".to_string()))?;
        mapped[offset as usize..offset as usize + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn size(&self) -> u64 {
        self.desc.size
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanBuffer {
    fn drop(&mut self) {
        unsafe {
            self.shared.device.destroy_buffer(self.buffer, None);
        }
        if let Some(allocation) = self.allocation.lock().unwrap().take() {
            self.shared.free_allocation(allocation);
        }
    }
}
