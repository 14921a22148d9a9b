// SPDX-License-Identifier: CEPL-1.0
use crate::convert::{pack_version, split_extension_list};
use crate::debug;
use crate::XrSettings;
use ash::vk::{self, Handle};
use oculi_core::SetupError;
use oculi_render_vk::VulkanInstance;
use openxr as xr;
use std::ffi::c_void;
use tracing::{debug, info};
use xr::sys;

const ENGINE_NAME: &str = "oculi";

/// What the runtime needs from the Vulkan instance and device it will composite from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VulkanRequirements {
    pub api_version: u32,
    pub instance_extensions: Vec<String>,
    pub device_extensions: Vec<String>,
}

/// An OpenXR instance with `XR_KHR_vulkan_enable` and the head-mounted display it found.
/// Debug builds also carry a messenger forwarding runtime diagnostics to tracing.
pub struct XrSystem {
    pub(crate) instance: xr::Instance,
    pub(crate) system: xr::SystemId,
    debug: Option<sys::DebugUtilsMessengerEXT>,
}

impl XrSystem {
    pub fn new(settings: &XrSettings) -> Result<Self, SetupError> {
        let entry = unsafe { xr::Entry::load() }.map_err(|e| SetupError::Loader(e.to_string()))?;

        let available = entry
            .enumerate_extensions()
            .map_err(|e| SetupError::create("OpenXR extension query", e))?;
        if !available.khr_vulkan_enable {
            return Err(SetupError::MissingExtension("XR_KHR_vulkan_enable"));
        }
        let mut enabled = xr::ExtensionSet::default();
        enabled.khr_vulkan_enable = true;
        let debug_utils = cfg!(debug_assertions) && available.ext_debug_utils;
        enabled.ext_debug_utils = debug_utils;

        let installed: Vec<String> = if cfg!(debug_assertions) {
            entry
                .enumerate_layers()
                .map(|layers| layers.into_iter().map(|l| l.layer_name).collect())
                .unwrap_or_default()
        } else {
            Vec::new()
        };
        let layers = debug::validation_layers(&installed);

        let version = pack_version(settings.application_version);
        let app_info = xr::ApplicationInfo {
            application_name: &settings.application_name,
            application_version: version,
            engine_name: ENGINE_NAME,
            engine_version: version,
            api_version: xr::Version::new(1, 0, 0),
        };
        let instance = entry
            .create_instance(&app_info, &enabled, &layers)
            .map_err(|e| SetupError::create("OpenXR instance", e))?;
        let messenger = if debug_utils {
            debug::create_messenger(&instance)
        } else {
            None
        };

        if let Ok(props) = instance.properties() {
            info!(
                runtime = %props.runtime_name,
                version = %props.runtime_version,
                "OpenXR instance ready"
            );
        }

        let system = match instance.system(xr::FormFactor::HEAD_MOUNTED_DISPLAY) {
            Ok(system) => system,
            Err(e) => {
                if let Some(m) = messenger {
                    debug::destroy_messenger(&instance, m);
                }
                return Err(SetupError::create("OpenXR system", e));
            }
        };

        Ok(XrSystem {
            instance,
            system,
            debug: messenger,
        })
    }

    /// Minimum API version plus the instance and device extensions the runtime asks for.
    pub fn vulkan_requirements(&self) -> Result<VulkanRequirements, SetupError> {
        let reqs = self
            .instance
            .graphics_requirements::<xr::Vulkan>(self.system)
            .map_err(|e| SetupError::create("Vulkan graphics requirements", e))?;
        let min = reqs.min_api_version_supported;
        let api_version =
            vk::make_api_version(0, min.major() as u32, min.minor() as u32, min.patch());

        let instance_extensions = self
            .instance
            .vulkan_legacy_instance_extensions(self.system)
            .map_err(|e| SetupError::create("Vulkan instance extension query", e))?;
        let device_extensions = self
            .instance
            .vulkan_legacy_device_extensions(self.system)
            .map_err(|e| SetupError::create("Vulkan device extension query", e))?;

        let reqs = VulkanRequirements {
            api_version,
            instance_extensions: split_extension_list(&instance_extensions),
            device_extensions: split_extension_list(&device_extensions),
        };
        debug!(?reqs, "runtime Vulkan requirements");
        Ok(reqs)
    }

    /// The physical device the runtime drives the headset from.
    pub fn vulkan_physical_device(
        &self,
        vulkan: &VulkanInstance,
    ) -> Result<vk::PhysicalDevice, SetupError> {
        let raw_instance = vulkan.handle().handle().as_raw() as *const c_void;
        let phys = unsafe {
            self.instance
                .vulkan_graphics_device(self.system, raw_instance)
        }
        .map_err(|e| SetupError::create("Vulkan physical device", e))?;
        Ok(vk::PhysicalDevice::from_raw(phys as u64))
    }
}

impl Drop for XrSystem {
    fn drop(&mut self) {
        if let Some(messenger) = self.debug.take() {
            debug::destroy_messenger(&self.instance, messenger);
        }
    }
}
