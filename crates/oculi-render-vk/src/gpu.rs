// SPDX-License-Identifier: CEPL-1.0
use crate::formats::device_depth_format;
use crate::instance::to_cstrings;
use crate::VulkanInstance;
use ash::vk;
use oculi_core::SetupError;
use std::ffi::{c_char, CStr};
use tracing::info;

/// The logical device and graphics queue on the physical device the XR runtime chose.
///
/// Dropping this destroys the device and then the instance, so every renderer and XR
/// session built on it must be gone first.
pub struct GpuContext {
    instance: VulkanInstance,
    phys: vk::PhysicalDevice,
    device: ash::Device,
    queue_family: u32,
    queue: vk::Queue,
    memory: vk::PhysicalDeviceMemoryProperties,
}

pub fn graphics_queue_family(families: &[vk::QueueFamilyProperties]) -> Option<u32> {
    families
        .iter()
        .position(|q| q.queue_count > 0 && q.queue_flags.contains(vk::QueueFlags::GRAPHICS))
        .map(|i| i as u32)
}

impl GpuContext {
    /// `extensions` are the device extensions the XR runtime requires.
    pub fn new(
        instance: VulkanInstance,
        phys: vk::PhysicalDevice,
        extensions: &[String],
    ) -> Result<Self, SetupError> {
        let vk_instance = instance.handle();

        let families = unsafe { vk_instance.get_physical_device_queue_family_properties(phys) };
        let queue_family =
            graphics_queue_family(&families).ok_or(SetupError::NotFound("graphics queue family"))?;

        let props = unsafe { vk_instance.get_physical_device_properties(phys) };
        let name = unsafe { CStr::from_ptr(props.device_name.as_ptr()) }.to_string_lossy();

        let priorities = [1.0_f32];
        let qinfo = vk::DeviceQueueCreateInfo {
            s_type: vk::StructureType::DEVICE_QUEUE_CREATE_INFO,
            queue_family_index: queue_family,
            queue_count: 1,
            p_queue_priorities: priorities.as_ptr(),
            ..Default::default()
        };

        let names = to_cstrings(extensions).map_err(|e| SetupError::create("Vulkan device", e))?;
        let ext_ptrs: Vec<*const c_char> = names.iter().map(|n| n.as_ptr()).collect();
        let dinfo = vk::DeviceCreateInfo {
            s_type: vk::StructureType::DEVICE_CREATE_INFO,
            queue_create_info_count: 1,
            p_queue_create_infos: &qinfo,
            enabled_extension_count: ext_ptrs.len() as u32,
            pp_enabled_extension_names: ext_ptrs.as_ptr(),
            ..Default::default()
        };

        let device = unsafe { vk_instance.create_device(phys, &dinfo, None) }
            .map_err(|e| SetupError::create("Vulkan device", e))?;
        let queue = unsafe { device.get_device_queue(queue_family, 0) };
        let memory = unsafe { vk_instance.get_physical_device_memory_properties(phys) };

        info!(
            "Vulkan device ready: {name} (queue family {queue_family}, {} extensions)",
            names.len()
        );

        Ok(GpuContext {
            instance,
            phys,
            device,
            queue_family,
            queue,
            memory,
        })
    }

    pub fn instance(&self) -> &VulkanInstance {
        &self.instance
    }

    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.phys
    }

    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    pub fn queue_family(&self) -> u32 {
        self.queue_family
    }

    pub fn queue(&self) -> vk::Queue {
        self.queue
    }

    pub fn memory_properties(&self) -> &vk::PhysicalDeviceMemoryProperties {
        &self.memory
    }

    pub fn depth_format(&self) -> Result<vk::Format, SetupError> {
        unsafe { device_depth_format(self.instance.handle(), self.phys) }
            .ok_or(SetupError::NotFound("depth attachment format"))
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();
            self.device.destroy_device(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family(flags: vk::QueueFlags, count: u32) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties {
            queue_flags: flags,
            queue_count: count,
            ..Default::default()
        }
    }

    #[test]
    fn first_graphics_family_wins() {
        let families = [
            family(vk::QueueFlags::TRANSFER, 2),
            family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE, 1),
            family(vk::QueueFlags::GRAPHICS, 4),
        ];
        assert_eq!(graphics_queue_family(&families), Some(1));
    }

    #[test]
    fn compute_only_device_has_no_graphics_family() {
        let families = [family(vk::QueueFlags::COMPUTE, 8), family(vk::QueueFlags::GRAPHICS, 0)];
        assert_eq!(graphics_queue_family(&families), None);
    }
}
