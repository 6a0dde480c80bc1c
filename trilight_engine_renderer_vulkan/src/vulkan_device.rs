//! Vulkan device and frame orchestration
//!
//! `VulkanDevice` owns the instance, logical device, allocator, the
//! swapchain and the frame synchronization objects. Resource types share
//! the context through `DeviceShared`, so a texture or pipeline may
//! outlive the device front-end without dangling handles.
//!
//! Frame pacing is deliberately simple: one frame in flight, with a
//! device wait after present. The engine renders a handful of draws per
//! frame; pipelining frames buys nothing here and single-frame pacing
//! keeps every per-frame resource trivially reusable.

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme, Allocator, AllocatorCreateDesc};
use gpu_allocator::MemoryLocation;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use trilight_engine::trilight::gpu::{
    BindingGroup, BindingGroupLayout, BindingGroupLayoutDesc, BindingResource, Buffer, BufferDesc,
    Device, Extent2d, Pipeline, PipelineDesc, Texture, TextureDesc, TextureFormat,
};
use trilight_engine::trilight::{Error, Result};
use trilight_engine::{engine_debug, engine_error, engine_info};

use crate::vulkan_binding_group::{VulkanBindingGroup, VulkanBindingGroupLayout};
use crate::vulkan_buffer::{vk_buffer_usage, VulkanBuffer};
use crate::vulkan_command_list::VulkanCommandList;
use crate::vulkan_pipeline::VulkanPipeline;
use crate::vulkan_swapchain::{VulkanSurfaceImage, VulkanSwapchain};
use crate::vulkan_texture::{vk_aspect, vk_format, vk_sample_count, vk_usage, VulkanTexture};

// ===== SHARED CONTEXT =====

/// Vulkan context shared by every resource
///
/// Dropped only when the last resource holding it goes away; its `Drop`
/// tears down the device and instance, so destruction order is correct
/// regardless of when individual resources are released.
pub(crate) struct DeviceShared {
    _entry: ash::Entry,
    pub(crate) instance: ash::Instance,
    pub(crate) physical_device: vk::PhysicalDevice,
    pub(crate) device: ash::Device,
    pub(crate) queue: vk::Queue,
    pub(crate) allocator: Mutex<Option<Allocator>>,
    pub(crate) descriptor_pool: vk::DescriptorPool,
    pub(crate) command_pool: vk::CommandPool,
    next_id: AtomicU64,
    #[cfg(feature = "vulkan-validation")]
    debug: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
}

impl DeviceShared {
    pub(crate) fn next_image_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn allocate(&self, desc: &AllocationCreateDesc) -> Result<Allocation> {
        self.allocator
            .lock()
            .unwrap()
            .as_mut()
            .ok_or_else(|| Error::BackendError("allocator already shut down".to_string()))?
            .allocate(desc)
            .map_err(|e| match e {
                gpu_allocator::AllocationError::OutOfMemory => Error::OutOfMemory,
                e => Error::BackendError(format!("GPU allocation '{}' failed: {e}", desc.name)),
            })
    }

    pub(crate) fn free_allocation(&self, allocation: Allocation) {
        if let Some(allocator) = self.allocator.lock().unwrap().as_mut() {
            let _ = allocator.free(allocation);
        }
    }
}

impl Drop for DeviceShared {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_command_pool(self.command_pool, None);
            self.device
                .destroy_descriptor_pool(self.descriptor_pool, None);
            // The allocator must go before the device it allocates from.
            drop(self.allocator.lock().unwrap().take());
            self.device.destroy_device(None);
            #[cfg(feature = "vulkan-validation")]
            if let Some((loader, messenger)) = self.debug.take() {
                loader.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}

// ===== DEVICE =====

/// Vulkan implementation of the engine `Device`, plus swapchain and
/// frame submission
pub struct VulkanDevice {
    shared: Arc<DeviceShared>,
    surface_instance: ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
    swapchain: Mutex<Option<VulkanSwapchain>>,
    image_available: vk::Semaphore,
    render_finished: vk::Semaphore,
    in_flight: vk::Fence,
}

impl VulkanDevice {
    /// Create the device and swapchain for a window
    ///
    /// # Arguments
    ///
    /// * `window` - Window to present into
    /// * `window_extent` - Current inner size, used when the surface does
    ///   not report a fixed extent
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(
        window: &W,
        window_extent: Extent2d,
    ) -> Result<Arc<Self>> {
        let entry = unsafe {
            ash::Entry::load().map_err(|e| {
                engine_error!("trilight::vulkan", "Failed to load Vulkan library: {:?}", e);
                Error::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
            })?
        };

        let app_info = vk::ApplicationInfo::default()
            .application_name(c"Trilight Application")
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(c"Trilight")
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_3);

        let display_handle = window.display_handle().map_err(|e| {
            Error::InitializationFailed(format!("Failed to get display handle: {e}"))
        })?;
        #[allow(unused_mut)]
        let mut extension_names =
            ash_window::enumerate_required_extensions(display_handle.as_raw())
                .map_err(|e| {
                    Error::InitializationFailed(format!("Failed to get required extensions: {e}"))
                })?
                .to_vec();

        #[cfg(feature = "vulkan-validation")]
        extension_names.push(ash::ext::debug_utils::NAME.as_ptr());

        #[cfg(feature = "vulkan-validation")]
        let layer_names = vec![c"VK_LAYER_KHRONOS_validation".as_ptr()];
        #[cfg(not(feature = "vulkan-validation"))]
        let layer_names: Vec<*const std::ffi::c_char> = Vec::new();

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_layer_names(&layer_names)
            .enabled_extension_names(&extension_names);

        let instance = unsafe {
            entry.create_instance(&create_info, None).map_err(|e| {
                engine_error!("trilight::vulkan", "Failed to create Vulkan instance: {:?}", e);
                Error::InitializationFailed(format!("Failed to create instance: {:?}", e))
            })?
        };

        #[cfg(feature = "vulkan-validation")]
        let debug = Some(crate::vulkan_debug::create_messenger(&entry, &instance)?);

        let surface = unsafe {
            let window_handle = window.window_handle().map_err(|e| {
                Error::InitializationFailed(format!("Failed to get window handle: {e}"))
            })?;
            ash_window::create_surface(
                &entry,
                &instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| {
                Error::InitializationFailed(format!("Failed to create surface: {:?}", e))
            })?
        };
        let surface_instance = ash::khr::surface::Instance::new(&entry, &instance);

        // Physical device: one graphics queue family that can also present.
        let physical_devices = unsafe {
            instance.enumerate_physical_devices().map_err(|e| {
                Error::InitializationFailed(format!("Failed to enumerate physical devices: {:?}", e))
            })?
        };
        let (physical_device, queue_family_index) = physical_devices
            .into_iter()
            .find_map(|pd| {
                let families =
                    unsafe { instance.get_physical_device_queue_family_properties(pd) };
                families.iter().enumerate().find_map(|(i, family)| {
                    let graphics = family.queue_flags.contains(vk::QueueFlags::GRAPHICS);
                    let present = unsafe {
                        surface_instance
                            .get_physical_device_surface_support(pd, i as u32, surface)
                            .unwrap_or(false)
                    };
                    (graphics && present).then_some((pd, i as u32))
                })
            })
            .ok_or_else(|| {
                engine_error!("trilight::vulkan", "No Vulkan GPU with a graphics+present queue found");
                Error::InitializationFailed(
                    "No Vulkan GPU with a graphics+present queue found".to_string(),
                )
            })?;

        let properties = unsafe { instance.get_physical_device_properties(physical_device) };
        let device_name = properties
            .device_name_as_c_str()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "unknown".to_string());
        engine_info!("trilight::vulkan", "Using GPU: {}", device_name);

        // Logical device: Vulkan 1.3 with dynamic rendering + sync2.
        let queue_priorities = [1.0];
        let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
            .queue_family_index(queue_family_index)
            .queue_priorities(&queue_priorities)];
        let device_extension_names = [ash::khr::swapchain::NAME.as_ptr()];
        let mut vk13_features = vk::PhysicalDeviceVulkan13Features::default()
            .dynamic_rendering(true)
            .synchronization2(true);
        let device_create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&device_extension_names)
            .push_next(&mut vk13_features);

        let device = unsafe {
            instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| {
                    engine_error!("trilight::vulkan", "Failed to create logical device: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create device: {:?}", e))
                })?
        };
        let queue = unsafe { device.get_device_queue(queue_family_index, 0) };

        let allocator = Allocator::new(&AllocatorCreateDesc {
            instance: instance.clone(),
            device: device.clone(),
            physical_device,
            debug_settings: Default::default(),
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        })
        .map_err(|e| {
            Error::InitializationFailed(format!("Failed to create allocator: {:?}", e))
        })?;

        let descriptor_pool = {
            let pool_sizes = [
                vk::DescriptorPoolSize {
                    ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                    descriptor_count: 2048,
                },
                vk::DescriptorPoolSize {
                    ty: vk::DescriptorType::UNIFORM_BUFFER,
                    descriptor_count: 1024,
                },
            ];
            let info = vk::DescriptorPoolCreateInfo::default()
                .pool_sizes(&pool_sizes)
                .max_sets(1024);
            unsafe {
                device.create_descriptor_pool(&info, None).map_err(|e| {
                    Error::InitializationFailed(format!("Failed to create descriptor pool: {:?}", e))
                })?
            }
        };

        let command_pool = {
            let info = vk::CommandPoolCreateInfo::default()
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
                .queue_family_index(queue_family_index);
            unsafe {
                device.create_command_pool(&info, None).map_err(|e| {
                    Error::InitializationFailed(format!("Failed to create command pool: {:?}", e))
                })?
            }
        };

        let shared = Arc::new(DeviceShared {
            _entry: entry,
            instance,
            physical_device,
            device,
            queue,
            allocator: Mutex::new(Some(allocator)),
            descriptor_pool,
            command_pool,
            next_id: AtomicU64::new(1),
            #[cfg(feature = "vulkan-validation")]
            debug,
        });

        let swapchain =
            VulkanSwapchain::new(shared.clone(), &surface_instance, surface, window_extent)?;
        engine_info!(
            "trilight::vulkan",
            "Swapchain: {}x{} {:?}",
            swapchain.extent().width,
            swapchain.extent().height,
            swapchain.format()
        );

        let (image_available, render_finished, in_flight) = unsafe {
            let semaphore_info = vk::SemaphoreCreateInfo::default();
            let fence_info = vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED);
            (
                shared
                    .device
                    .create_semaphore(&semaphore_info, None)
                    .map_err(|e| Error::InitializationFailed(format!("Failed to create semaphore: {:?}", e)))?,
                shared
                    .device
                    .create_semaphore(&semaphore_info, None)
                    .map_err(|e| Error::InitializationFailed(format!("Failed to create semaphore: {:?}", e)))?,
                shared
                    .device
                    .create_fence(&fence_info, None)
                    .map_err(|e| Error::InitializationFailed(format!("Failed to create fence: {:?}", e)))?,
            )
        };

        Ok(Arc::new(Self {
            shared,
            surface_instance,
            surface,
            swapchain: Mutex::new(Some(swapchain)),
            image_available,
            render_finished,
            in_flight,
        }))
    }

    /// Format of the swapchain images
    pub fn surface_format(&self) -> TextureFormat {
        self.swapchain
            .lock()
            .unwrap()
            .as_ref()
            .map(|s| s.format())
            .unwrap_or(TextureFormat::Bgra8Unorm)
    }

    /// Current swapchain extent
    pub fn surface_extent(&self) -> Extent2d {
        self.swapchain
            .lock()
            .unwrap()
            .as_ref()
            .map(|s| s.extent())
            .unwrap_or(Extent2d::new(0, 0))
    }

    /// Allocate a primary command list from the device pool
    pub fn create_command_list(&self) -> Result<VulkanCommandList> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.shared.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let command_buffer = unsafe {
            self.shared
                .device
                .allocate_command_buffers(&alloc_info)
                .map_err(|e| {
                    Error::BackendError(format!("vkAllocateCommandBuffers failed: {e}"))
                })?[0]
        };
        Ok(VulkanCommandList::new(self.shared.clone(), command_buffer))
    }

    /// Wait for the previous frame and acquire the next swapchain image
    ///
    /// The in-flight fence stays signaled until `submit_and_present`
    /// resets it, so an out-of-date acquire can be retried after a
    /// swapchain rebuild without deadlocking the next wait.
    pub fn acquire_frame(&self) -> Result<VulkanSurfaceImage> {
        unsafe {
            self.shared
                .device
                .wait_for_fences(&[self.in_flight], true, u64::MAX)
                .map_err(|e| Error::BackendError(format!("fence wait failed: {e}")))?;
        }

        let guard = self.swapchain.lock().unwrap();
        let swapchain = guard
            .as_ref()
            .ok_or_else(|| Error::BackendError("swapchain not initialized".to_string()))?;
        swapchain.acquire(self.image_available)
    }

    /// Submit a recorded frame and present the acquired image
    pub fn submit_and_present(
        &self,
        command_list: &VulkanCommandList,
        image: &VulkanSurfaceImage,
    ) -> Result<()> {
        let wait_semaphores = [self.image_available];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [command_list.command_buffer];
        let signal_semaphores = [self.render_finished];
        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            // Reset only once a submit is certain to re-signal the fence.
            self.shared
                .device
                .reset_fences(&[self.in_flight])
                .map_err(|e| Error::BackendError(format!("fence reset failed: {e}")))?;
            self.shared
                .device
                .queue_submit(self.shared.queue, &[submit_info], self.in_flight)
                .map_err(|e| Error::BackendError(format!("vkQueueSubmit failed: {e}")))?;
        }

        {
            let guard = self.swapchain.lock().unwrap();
            let swapchain = guard
                .as_ref()
                .ok_or_else(|| Error::BackendError("swapchain not initialized".to_string()))?;
            swapchain.present(self.shared.queue, self.render_finished, image)?;
        }

        // Single frame in flight: settle the GPU before the CPU touches
        // per-frame buffers again.
        unsafe {
            self.shared
                .device
                .device_wait_idle()
                .map_err(|e| Error::BackendError(format!("device wait failed: {e}")))
        }
    }

    /// Rebuild the swapchain after a resize or out-of-date present
    pub fn recreate_swapchain(&self, window_extent: Extent2d) -> Result<()> {
        unsafe {
            self.shared
                .device
                .device_wait_idle()
                .map_err(|e| Error::BackendError(format!("device wait failed: {e}")))?;
        }
        let mut guard = self.swapchain.lock().unwrap();
        // Old swapchain must be gone before the surface is reused.
        guard.take();
        *guard = Some(VulkanSwapchain::new(
            self.shared.clone(),
            &self.surface_instance,
            self.surface,
            window_extent,
        )?);
        engine_debug!(
            "trilight::vulkan",
            "Swapchain recreated at {}x{}",
            window_extent.width,
            window_extent.height
        );
        Ok(())
    }

    // ===== INTERNAL RESOURCE HELPERS =====

    fn create_image_resources(
        &self,
        desc: &TextureDesc,
        extra_usage: vk::ImageUsageFlags,
    ) -> Result<(vk::Image, Allocation, vk::ImageView, vk::Sampler)> {
        let device = &self.shared.device;

        let image_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(vk_format(desc.format))
            .extent(vk::Extent3D {
                width: desc.extent.width,
                height: desc.extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk_sample_count(desc.sample_count))
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(vk_usage(desc.usage) | extra_usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);
        let image = unsafe {
            device.create_image(&image_info, None).map_err(|e| {
                Error::BackendError(format!("vkCreateImage failed for '{}': {e}", desc.name))
            })?
        };

        let requirements = unsafe { device.get_image_memory_requirements(image) };
        let allocation = match self.shared.allocate(&AllocationCreateDesc {
            name: &desc.name,
            requirements,
            location: MemoryLocation::GpuOnly,
            linear: false,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        }) {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { device.destroy_image(image, None) };
                return Err(e);
            }
        };
        unsafe {
            device
                .bind_image_memory(image, allocation.memory(), allocation.offset())
                .map_err(|e| {
                    Error::BackendError(format!("vkBindImageMemory failed for '{}': {e}", desc.name))
                })?;
        }

        let view_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(vk_format(desc.format))
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(vk_aspect(desc.format))
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1),
            );
        let view = unsafe {
            device.create_image_view(&view_info, None).map_err(|e| {
                Error::BackendError(format!("vkCreateImageView failed for '{}': {e}", desc.name))
            })?
        };

        let sampler_info = vk::SamplerCreateInfo::default()
            .mag_filter(vk::Filter::LINEAR)
            .min_filter(vk::Filter::LINEAR)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
            .address_mode_u(vk::SamplerAddressMode::CLAMP_TO_EDGE)
            .address_mode_v(vk::SamplerAddressMode::CLAMP_TO_EDGE)
            .address_mode_w(vk::SamplerAddressMode::CLAMP_TO_EDGE);
        let sampler = unsafe {
            device.create_sampler(&sampler_info, None).map_err(|e| {
                Error::BackendError(format!("vkCreateSampler failed for '{}': {e}", desc.name))
            })?
        };

        Ok((image, allocation, view, sampler))
    }

    /// Record + submit a one-shot upload that copies `data` into `image`
    /// and leaves it shader-readable
    fn upload_pixels(&self, image: vk::Image, desc: &TextureDesc, data: &[u8]) -> Result<()> {
        let device = &self.shared.device;

        // Host-visible staging buffer.
        let staging_info = vk::BufferCreateInfo::default()
            .size(data.len() as u64)
            .usage(vk::BufferUsageFlags::TRANSFER_SRC)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);
        let staging = unsafe {
            device.create_buffer(&staging_info, None).map_err(|e| {
                Error::BackendError(format!("staging buffer creation failed: {e}"))
            })?
        };
        let requirements = unsafe { device.get_buffer_memory_requirements(staging) };
        let mut staging_allocation = self.shared.allocate(&AllocationCreateDesc {
            name: "texture_staging",
            requirements,
            location: MemoryLocation::CpuToGpu,
            linear: true,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        })?;
        unsafe {
            device
                .bind_buffer_memory(staging, staging_allocation.memory(), staging_allocation.offset())
                .map_err(|e| Error::BackendError(format!("staging bind failed: {e}")))?;
        }
        staging_allocation
            .mapped_slice_mut()
            .ok_or_else(|| Error::BackendError("staging buffer is not host mapped".to_string()))?
            [..data.len()]
            .copy_from_slice(data);

        // One-shot command buffer on the shared pool.
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.shared.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let cmd = unsafe {
            device
                .allocate_command_buffers(&alloc_info)
                .map_err(|e| Error::BackendError(format!("upload command buffer failed: {e}")))?[0]
        };

        let result = (|| -> Result<()> {
            unsafe {
                let begin_info = vk::CommandBufferBeginInfo::default()
                    .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
                device
                    .begin_command_buffer(cmd, &begin_info)
                    .map_err(|e| Error::BackendError(format!("upload begin failed: {e}")))?;

                let range = vk::ImageSubresourceRange::default()
                    .aspect_mask(vk_aspect(desc.format))
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1);

                let to_transfer = vk::ImageMemoryBarrier2::default()
                    .src_stage_mask(vk::PipelineStageFlags2::TOP_OF_PIPE)
                    .src_access_mask(vk::AccessFlags2::NONE)
                    .dst_stage_mask(vk::PipelineStageFlags2::COPY)
                    .dst_access_mask(vk::AccessFlags2::TRANSFER_WRITE)
                    .old_layout(vk::ImageLayout::UNDEFINED)
                    .new_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                    .image(image)
                    .subresource_range(range);
                let barriers = [to_transfer];
                device.cmd_pipeline_barrier2(
                    cmd,
                    &vk::DependencyInfo::default().image_memory_barriers(&barriers),
                );

                let region = vk::BufferImageCopy::default()
                    .image_subresource(
                        vk::ImageSubresourceLayers::default()
                            .aspect_mask(vk_aspect(desc.format))
                            .mip_level(0)
                            .base_array_layer(0)
                            .layer_count(1),
                    )
                    .image_extent(vk::Extent3D {
                        width: desc.extent.width,
                        height: desc.extent.height,
                        depth: 1,
                    });
                device.cmd_copy_buffer_to_image(
                    cmd,
                    staging,
                    image,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    &[region],
                );

                // Part of the upload contract: the texture comes back
                // shader-readable, passes never transition it.
                let to_sampled = vk::ImageMemoryBarrier2::default()
                    .src_stage_mask(vk::PipelineStageFlags2::COPY)
                    .src_access_mask(vk::AccessFlags2::TRANSFER_WRITE)
                    .dst_stage_mask(vk::PipelineStageFlags2::FRAGMENT_SHADER)
                    .dst_access_mask(vk::AccessFlags2::SHADER_READ)
                    .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                    .new_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                    .image(image)
                    .subresource_range(range);
                let barriers = [to_sampled];
                device.cmd_pipeline_barrier2(
                    cmd,
                    &vk::DependencyInfo::default().image_memory_barriers(&barriers),
                );

                device
                    .end_command_buffer(cmd)
                    .map_err(|e| Error::BackendError(format!("upload end failed: {e}")))?;

                let command_buffers = [cmd];
                let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);
                device
                    .queue_submit(self.shared.queue, &[submit_info], vk::Fence::null())
                    .map_err(|e| Error::BackendError(format!("upload submit failed: {e}")))?;
                device
                    .queue_wait_idle(self.shared.queue)
                    .map_err(|e| Error::BackendError(format!("upload wait failed: {e}")))?;
            }
            Ok(())
        })();

        unsafe {
            device.free_command_buffers(self.shared.command_pool, &[cmd]);
            device.destroy_buffer(staging, None);
        }
        self.shared.free_allocation(staging_allocation);

        result
    }
}

impl Device for VulkanDevice {
    fn create_texture(&self, desc: &TextureDesc) -> Result<Arc<dyn Texture>> {
        let (image, allocation, view, sampler) =
            self.create_image_resources(desc, vk::ImageUsageFlags::empty())?;
        Ok(Arc::new(VulkanTexture::new(
            self.shared.clone(),
            self.shared.next_image_id(),
            desc.clone(),
            image,
            view,
            sampler,
            allocation,
        )))
    }

    fn create_texture_with_data(
        &self,
        desc: &TextureDesc,
        data: &[u8],
    ) -> Result<Arc<dyn Texture>> {
        let expected = desc.extent.width as usize
            * desc.extent.height as usize
            * desc.format.size_bytes() as usize;
        if data.len() != expected {
            return Err(Error::InvalidResource(format!(
                "texture '{}' upload has {} bytes, expected {}",
                desc.name,
                data.len(),
                expected
            )));
        }

        let (image, allocation, view, sampler) =
            self.create_image_resources(desc, vk::ImageUsageFlags::TRANSFER_DST)?;
        let texture = VulkanTexture::new(
            self.shared.clone(),
            self.shared.next_image_id(),
            desc.clone(),
            image,
            view,
            sampler,
            allocation,
        );
        self.upload_pixels(image, desc, data)?;
        Ok(Arc::new(texture))
    }

    fn create_buffer(&self, desc: &BufferDesc) -> Result<Arc<dyn Buffer>> {
        let device = &self.shared.device;
        let buffer_info = vk::BufferCreateInfo::default()
            .size(desc.size)
            .usage(vk_buffer_usage(desc.usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE);
        let buffer = unsafe {
            device.create_buffer(&buffer_info, None).map_err(|e| {
                Error::BackendError(format!("vkCreateBuffer failed for '{}': {e}", desc.name))
            })?
        };
        let requirements = unsafe { device.get_buffer_memory_requirements(buffer) };
        let allocation = match self.shared.allocate(&AllocationCreateDesc {
            name: &desc.name,
            requirements,
            location: MemoryLocation::CpuToGpu,
            linear: true,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        }) {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(e);
            }
        };
        unsafe {
            device
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
                .map_err(|e| {
                    Error::BackendError(format!("vkBindBufferMemory failed for '{}': {e}", desc.name))
                })?;
        }

        Ok(Arc::new(VulkanBuffer::new(
            self.shared.clone(),
            desc.clone(),
            buffer,
            allocation,
        )))
    }

    fn create_binding_group_layout(
        &self,
        desc: &BindingGroupLayoutDesc,
    ) -> Result<Arc<dyn BindingGroupLayout>> {
        Ok(Arc::new(VulkanBindingGroupLayout::new(
            self.shared.clone(),
            desc,
        )?))
    }

    fn create_binding_group(
        &self,
        layout: &Arc<dyn BindingGroupLayout>,
        resources: &[BindingResource],
    ) -> Result<Arc<dyn BindingGroup>> {
        let layout = layout
            .as_any()
            .downcast_ref::<VulkanBindingGroupLayout>()
            .ok_or_else(|| {
                Error::InvalidResource("create_binding_group got a non-Vulkan layout".to_string())
            })?;
        Ok(Arc::new(VulkanBindingGroup::new(
            &self.shared,
            layout,
            resources,
        )?))
    }

    fn create_pipeline(&self, desc: &PipelineDesc) -> Result<Arc<dyn Pipeline>> {
        Ok(Arc::new(VulkanPipeline::new(self.shared.clone(), desc)?))
    }
}

impl Drop for VulkanDevice {
    fn drop(&mut self) {
        unsafe {
            let _ = self.shared.device.device_wait_idle();
            self.shared.device.destroy_semaphore(self.image_available, None);
            self.shared.device.destroy_semaphore(self.render_finished, None);
            self.shared.device.destroy_fence(self.in_flight, None);
        }
        // Swapchain before the surface it presents to.
        self.swapchain.lock().unwrap().take();
        unsafe {
            self.surface_instance.destroy_surface(self.surface, None);
        }
    }
}
