// SPDX-License-Identifier: CEPL-1.0
#[cfg(debug_assertions)]
use ash::ext::debug_utils as ext_debug;
use ash::{vk, Entry};
use oculi_core::SetupError;
use std::ffi::{c_char, CStr, CString};
use tracing::{debug, info};

#[cfg(debug_assertions)]
type DebugState = Option<vk::DebugUtilsMessengerEXT>;
#[cfg(not(debug_assertions))]
type DebugState = ();

const ENGINE_NAME: &CStr = c"oculi";

#[cfg(debug_assertions)]
const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// The Vulkan instance the XR runtime asked for, plus the debug messenger in debug builds.
pub struct VulkanInstance {
    entry: Entry,
    instance: ash::Instance,
    #[cfg_attr(not(debug_assertions), allow(dead_code))]
    debug: DebugState,
}

impl VulkanInstance {
    /// `api_version` and `extensions` come straight from the runtime's graphics
    /// requirements. Validation and debug-utils are added on top in debug builds when
    /// the loader has them. `app_version` is already packed like an API version and is
    /// reported for both the application and the engine.
    pub fn new(
        app_name: &str,
        app_version: u32,
        api_version: u32,
        extensions: &[String],
    ) -> Result<Self, SetupError> {
        let entry = Entry::linked();

        let app = CString::new(app_name).map_err(|e| SetupError::create("Vulkan instance", e))?;
        let app_info = application_info(&app, app_version, api_version);

        let available = unsafe { entry.enumerate_instance_extension_properties(None) }
            .map_err(|e| SetupError::create("Vulkan instance", e))?;

        #[allow(unused_mut)]
        let mut names = to_cstrings(extensions).map_err(|e| SetupError::create("Vulkan instance", e))?;

        #[cfg(debug_assertions)]
        let debug_ext = has_extension(&available, ext_debug::NAME);
        #[cfg(debug_assertions)]
        if debug_ext && !names.iter().any(|n| n.as_c_str() == ext_debug::NAME) {
            names.push(ext_debug::NAME.to_owned());
        }
        #[cfg(not(debug_assertions))]
        let _ = &available;

        for name in &names {
            debug!("instance extension {}", name.to_string_lossy());
        }
        let ext_ptrs: Vec<*const c_char> = names.iter().map(|n| n.as_ptr()).collect();
        let layers = validation_layers(&entry);

        let create_info = vk::InstanceCreateInfo {
            s_type: vk::StructureType::INSTANCE_CREATE_INFO,
            p_application_info: &app_info,
            enabled_extension_count: ext_ptrs.len() as u32,
            pp_enabled_extension_names: ext_ptrs.as_ptr(),
            enabled_layer_count: layers.len() as u32,
            pp_enabled_layer_names: layers.as_ptr(),
            ..Default::default()
        };

        let instance = unsafe { entry.create_instance(&create_info, None) }
            .map_err(|e| SetupError::create("Vulkan instance", e))?;

        #[cfg(debug_assertions)]
        let debug = if debug_ext {
            unsafe { create_debug_messenger(&entry, &instance) }
        } else {
            None
        };
        #[cfg(not(debug_assertions))]
        let debug = ();

        info!(
            "Vulkan instance ready (api {}.{}.{}, {} extensions)",
            vk::api_version_major(api_version),
            vk::api_version_minor(api_version),
            vk::api_version_patch(api_version),
            names.len()
        );

        Ok(VulkanInstance {
            entry,
            instance,
            debug,
        })
    }

    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    pub fn handle(&self) -> &ash::Instance {
        &self.instance
    }
}

impl Drop for VulkanInstance {
    fn drop(&mut self) {
        unsafe {
            #[cfg(debug_assertions)]
            if let Some(messenger) = self.debug.take() {
                ext_debug::Instance::new(&self.entry, &self.instance)
                    .destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}

fn application_info(app: &CStr, app_version: u32, api_version: u32) -> vk::ApplicationInfo<'_> {
    vk::ApplicationInfo {
        s_type: vk::StructureType::APPLICATION_INFO,
        p_application_name: app.as_ptr(),
        application_version: app_version,
        p_engine_name: ENGINE_NAME.as_ptr(),
        engine_version: app_version,
        api_version,
        ..Default::default()
    }
}

/// Extension names as reported by the runtime, ready for the create-info pointer list.
pub(crate) fn to_cstrings(names: &[String]) -> Result<Vec<CString>, std::ffi::NulError> {
    names.iter().map(|n| CString::new(n.as_str())).collect()
}

#[cfg_attr(not(debug_assertions), allow(dead_code))]
fn has_extension(available: &[vk::ExtensionProperties], name: &CStr) -> bool {
    available
        .iter()
        .any(|e| unsafe { CStr::from_ptr(e.extension_name.as_ptr()) } == name)
}

#[cfg(debug_assertions)]
fn validation_layers(entry: &Entry) -> Vec<*const c_char> {
    let layers = unsafe { entry.enumerate_instance_layer_properties() }.unwrap_or_default();
    let present = layers
        .iter()
        .any(|l| unsafe { CStr::from_ptr(l.layer_name.as_ptr()) } == VALIDATION_LAYER);
    if present {
        vec![VALIDATION_LAYER.as_ptr()]
    } else {
        debug!("validation layer not installed");
        Vec::new()
    }
}

#[cfg(not(debug_assertions))]
fn validation_layers(_entry: &Entry) -> Vec<*const c_char> {
    Vec::new()
}

#[cfg(debug_assertions)]
unsafe extern "system" fn debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _types: vk::DebugUtilsMessageTypeFlagsEXT,
    data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    if data.is_null() || unsafe { (*data).p_message.is_null() } {
        return vk::FALSE;
    }
    let msg = unsafe { CStr::from_ptr((*data).p_message) }.to_string_lossy();
    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        tracing::error!(target: "vulkan", "{msg}");
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        tracing::warn!(target: "vulkan", "{msg}");
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        tracing::info!(target: "vulkan", "{msg}");
    } else {
        tracing::trace!(target: "vulkan", "{msg}");
    }
    vk::FALSE
}

#[cfg(debug_assertions)]
unsafe fn create_debug_messenger(
    entry: &Entry,
    instance: &ash::Instance,
) -> Option<vk::DebugUtilsMessengerEXT> {
    let loader = ext_debug::Instance::new(entry, instance);
    let ci = vk::DebugUtilsMessengerCreateInfoEXT {
        s_type: vk::StructureType::DEBUG_UTILS_MESSENGER_CREATE_INFO_EXT,
        message_severity: vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
            | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
            | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
            | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        message_type: vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
            | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
            | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        pfn_user_callback: Some(debug_callback),
        ..Default::default()
    };
    match unsafe { loader.create_debug_utils_messenger(&ci, None) } {
        Ok(m) => Some(m),
        Err(e) => {
            tracing::warn!("debug messenger unavailable: {e:?}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_extension_names_become_cstrings() {
        let names = vec![
            "VK_KHR_external_memory_capabilities".to_string(),
            "VK_KHR_get_physical_device_properties2".to_string(),
        ];
        let c = to_cstrings(&names).unwrap();
        assert_eq!(c[1].to_str().unwrap(), "VK_KHR_get_physical_device_properties2");
    }

    #[test]
    fn app_version_reaches_application_and_engine() {
        let packed = vk::make_api_version(0, 1, 2, 3);
        let info = application_info(c"demo", packed, vk::API_VERSION_1_1);
        assert_eq!(info.application_version, packed);
        assert_eq!(info.engine_version, packed);
        assert_eq!(info.api_version, vk::API_VERSION_1_1);
        assert_eq!(unsafe { CStr::from_ptr(info.p_engine_name) }, ENGINE_NAME);
    }

    #[test]
    fn interior_nul_is_rejected() {
        assert!(to_cstrings(&["VK_bad\0name".to_string()]).is_err());
    }
}
