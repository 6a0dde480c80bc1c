//! Swapchain ownership and surface images

use ash::vk;
use std::any::Any;
use std::sync::Arc;

use trilight_engine::trilight::gpu::{Extent2d, GpuImage, TextureFormat};
use trilight_engine::trilight::{Error, Result};

use crate::vulkan_device::DeviceShared;

/// One swapchain image, handed out per acquired frame
///
/// The image and view are owned by the swapchain; this is a lightweight
/// handle that stays valid until the swapchain is recreated.
pub struct VulkanSurfaceImage {
    pub(crate) image: vk::Image,
    pub(crate) view: vk::ImageView,
    pub(crate) index: u32,
    id: u64,
    extent: Extent2d,
    format: TextureFormat,
}

impl GpuImage for VulkanSurfaceImage {
    fn image_id(&self) -> u64 {
        self.id
    }

    fn extent(&self) -> Extent2d {
        self.extent
    }

    fn format(&self) -> TextureFormat {
        self.format
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub(crate) struct VulkanSwapchain {
    shared: Arc<DeviceShared>,
    swapchain_device: ash::khr::swapchain::Device,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    views: Vec<vk::ImageView>,
    image_ids: Vec<u64>,
    format: TextureFormat,
    extent: Extent2d,
}

impl VulkanSwapchain {
    pub(crate) fn new(
        shared: Arc<DeviceShared>,
        surface_instance: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
        window_extent: Extent2d,
    ) -> Result<Self> {
        let capabilities = unsafe {
            surface_instance
                .get_physical_device_surface_capabilities(shared.physical_device, surface)
                .map_err(|e| Error::BackendError(format!("surface capability query failed: {e}")))?
        };
        let formats = unsafe {
            surface_instance
                .get_physical_device_surface_formats(shared.physical_device, surface)
                .map_err(|e| Error::BackendError(format!("surface format query failed: {e}")))?
        };

        let (surface_format, format) = formats
            .iter()
            .find_map(|f| match f.format {
                vk::Format::B8G8R8A8_UNORM => Some((*f, TextureFormat::Bgra8Unorm)),
                vk::Format::R8G8B8A8_UNORM => Some((*f, TextureFormat::Rgba8Unorm)),
                _ => None,
            })
            .ok_or_else(|| {
                Error::BackendError("no 8-bit UNORM surface format available".to_string())
            })?;

        let extent = if capabilities.current_extent.width != u32::MAX {
            Extent2d::new(
                capabilities.current_extent.width,
                capabilities.current_extent.height,
            )
        } else {
            window_extent
        };

        let mut image_count = capabilities.min_image_count + 1;
        if capabilities.max_image_count > 0 {
            image_count = image_count.min(capabilities.max_image_count);
        }

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(vk::Extent2D {
                width: extent.width,
                height: extent.height,
            })
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(vk::PresentModeKHR::FIFO)
            .clipped(true);

        let swapchain_device =
            ash::khr::swapchain::Device::new(&shared.instance, &shared.device);
        let swapchain = unsafe {
            swapchain_device
                .create_swapchain(&create_info, None)
                .map_err(|e| Error::BackendError(format!("vkCreateSwapchainKHR failed: {e}")))?
        };

        let images = unsafe {
            swapchain_device
                .get_swapchain_images(swapchain)
                .map_err(|e| Error::BackendError(format!("swapchain image query failed: {e}")))?
        };

        let mut views = Vec::with_capacity(images.len());
        let mut image_ids = Vec::with_capacity(images.len());
        for image in &images {
            let view_info = vk::ImageViewCreateInfo::default()
                .image(*image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(surface_format.format)
                .subresource_range(
                    vk::ImageSubresourceRange::default()
                        .aspect_mask(vk::ImageAspectFlags::COLOR)
                        .base_mip_level(0)
                        .level_count(1)
                        .base_array_layer(0)
                        .layer_count(1),
                );
            let view = unsafe {
                shared
                    .device
                    .create_image_view(&view_info, None)
                    .map_err(|e| {
                        Error::BackendError(format!("swapchain view creation failed: {e}"))
                    })?
            };
            views.push(view);
            image_ids.push(shared.next_image_id());
        }

        Ok(Self {
            shared,
            swapchain_device,
            swapchain,
            images,
            views,
            image_ids,
            format,
            extent,
        })
    }

    pub(crate) fn extent(&self) -> Extent2d {
        self.extent
    }

    pub(crate) fn format(&self) -> TextureFormat {
        self.format
    }

    /// Acquire the next image, signalling `semaphore` when it is ready
    ///
    /// Returns `Err(Error::SwapchainOutOfDate)` when the surface has
    /// changed and the swapchain must be recreated.
    pub(crate) fn acquire(&self, semaphore: vk::Semaphore) -> Result<VulkanSurfaceImage> {
        let (index, suboptimal) = unsafe {
            self.swapchain_device
                .acquire_next_image(self.swapchain, u64::MAX, semaphore, vk::Fence::null())
                .map_err(|e| match e {
                    vk::Result::ERROR_OUT_OF_DATE_KHR => Error::SwapchainOutOfDate,
                    e => Error::BackendError(format!("vkAcquireNextImageKHR failed: {e}")),
                })?
        };
        if suboptimal {
            return Err(Error::SwapchainOutOfDate);
        }

        let index_usize = index as usize;
        Ok(VulkanSurfaceImage {
            image: self.images[index_usize],
            view: self.views[index_usize],
            index,
            id: self.image_ids[index_usize],
            extent: self.extent,
            format: self.format,
        })
    }

    /// Present an acquired image after `wait_semaphore` signals
    pub(crate) fn present(
        &self,
        queue: vk::Queue,
        wait_semaphore: vk::Semaphore,
        image: &VulkanSurfaceImage,
    ) -> Result<()> {
        let wait_semaphores = [wait_semaphore];
        let swapchains = [self.swapchain];
        let indices = [image.index];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&indices);

        let suboptimal = unsafe {
            self.swapchain_device
                .queue_present(queue, &present_info)
                .map_err(|e| match e {
                    vk::Result::ERROR_OUT_OF_DATE_KHR => Error::SwapchainOutOfDate,
                    e => Error::BackendError(format!("vkQueuePresentKHR failed: {e}")),
                })?
        };
        if suboptimal {
            return Err(Error::SwapchainOutOfDate);
        }
        Ok(())
    }
}

impl Drop for VulkanSwapchain {
    fn drop(&mut self) {
        unsafe {
            for view in &self.views {
                self.shared.device.destroy_image_view(*view, None);
            }
            self.swapchain_device.destroy_swapchain(self.swapchain, None);
        }
    }
}
