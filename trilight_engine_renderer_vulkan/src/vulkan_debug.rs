//! Validation layer messenger (vulkan-validation feature)
//!
//! Routes `VK_LAYER_KHRONOS_validation` output through the engine
//! logger, so validation messages interleave with engine logs.

use ash::vk;
use std::ffi::CStr;

use trilight_engine::trilight::{Error, Result};
use trilight_engine::{engine_debug, engine_error, engine_info, engine_warn};

pub(crate) fn create_messenger(
    entry: &ash::Entry,
    instance: &ash::Instance,
) -> Result<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)> {
    let loader = ash::ext::debug_utils::Instance::new(entry, instance);

    let create_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(vulkan_debug_callback));

    let messenger = unsafe {
        loader
            .create_debug_utils_messenger(&create_info, None)
            .map_err(|e| {
                Error::InitializationFailed(format!("Failed to create debug messenger: {:?}", e))
            })?
    };

    Ok((loader, messenger))
}

unsafe extern "system" fn vulkan_debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    if callback_data.is_null() {
        return vk::FALSE;
    }
    let data = &*callback_data;
    let message = if data.p_message.is_null() {
        "<no message>".to_string()
    } else {
        CStr::from_ptr(data.p_message).to_string_lossy().into_owned()
    };

    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        engine_error!("trilight::vulkan::validation", "{}", message);
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        engine_warn!("trilight::vulkan::validation", "{}", message);
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        engine_info!("trilight::vulkan::validation", "{}", message);
    } else {
        engine_debug!("trilight::vulkan::validation", "{}", message);
    }

    vk::FALSE
}
