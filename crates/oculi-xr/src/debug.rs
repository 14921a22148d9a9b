// SPDX-License-Identifier: CEPL-1.0
use openxr as xr;
use openxr::sys;
use std::ffi::{c_void, CStr};
use std::ptr;
use tracing::{debug, warn, Level};

pub(crate) const CORE_VALIDATION_LAYER: &str = "XR_APILAYER_LUNARG_core_validation";

/// Layers to enable out of what the loader reports as installed.
pub(crate) fn validation_layers(available: &[String]) -> Vec<&'static str> {
    if available.iter().any(|l| l == CORE_VALIDATION_LAYER) {
        vec![CORE_VALIDATION_LAYER]
    } else {
        debug!("OpenXR core validation layer not installed");
        Vec::new()
    }
}

pub(crate) fn severity_level(severity: sys::DebugUtilsMessageSeverityFlagsEXT) -> Level {
    use sys::DebugUtilsMessageSeverityFlagsEXT as S;
    if severity.contains(S::ERROR) {
        Level::ERROR
    } else if severity.contains(S::WARNING) {
        Level::WARN
    } else if severity.contains(S::INFO) {
        Level::INFO
    } else {
        Level::TRACE
    }
}

pub(crate) fn message_type_name(types: sys::DebugUtilsMessageTypeFlagsEXT) -> &'static str {
    use sys::DebugUtilsMessageTypeFlagsEXT as T;
    if types.contains(T::VALIDATION) {
        "validation"
    } else if types.contains(T::PERFORMANCE) {
        "performance"
    } else if types.contains(T::CONFORMANCE) {
        "conformance"
    } else if types.contains(T::GENERAL) {
        "general"
    } else {
        "unknown"
    }
}

unsafe extern "system" fn debug_callback(
    severity: sys::DebugUtilsMessageSeverityFlagsEXT,
    types: sys::DebugUtilsMessageTypeFlagsEXT,
    data: *const sys::DebugUtilsMessengerCallbackDataEXT,
    _user: *mut c_void,
) -> sys::Bool32 {
    if data.is_null() || unsafe { (*data).message.is_null() } {
        return sys::FALSE;
    }
    let msg = unsafe { CStr::from_ptr((*data).message) }.to_string_lossy();
    let kind = message_type_name(types);
    let level = severity_level(severity);
    if level == Level::ERROR {
        tracing::error!(target: "openxr", "{kind}: {msg}");
    } else if level == Level::WARN {
        tracing::warn!(target: "openxr", "{kind}: {msg}");
    } else if level == Level::INFO {
        tracing::info!(target: "openxr", "{kind}: {msg}");
    } else {
        tracing::trace!(target: "openxr", "{kind}: {msg}");
    }
    sys::FALSE
}

/// Routes runtime and layer messages into tracing. `None` when the instance was created
/// without `XR_EXT_debug_utils` or the runtime refuses the messenger.
pub(crate) fn create_messenger(instance: &xr::Instance) -> Option<sys::DebugUtilsMessengerEXT> {
    let ext = instance.exts().ext_debug_utils.as_ref()?;
    let info = sys::DebugUtilsMessengerCreateInfoEXT {
        ty: sys::DebugUtilsMessengerCreateInfoEXT::TYPE,
        next: ptr::null(),
        message_severities: sys::DebugUtilsMessageSeverityFlagsEXT::INFO
            | sys::DebugUtilsMessageSeverityFlagsEXT::WARNING
            | sys::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        message_types: sys::DebugUtilsMessageTypeFlagsEXT::GENERAL
            | sys::DebugUtilsMessageTypeFlagsEXT::VALIDATION
            | sys::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE
            | sys::DebugUtilsMessageTypeFlagsEXT::CONFORMANCE,
        user_callback: Some(debug_callback),
        user_data: ptr::null_mut(),
    };
    let mut messenger = sys::DebugUtilsMessengerEXT::default();
    let result =
        unsafe { (ext.create_debug_utils_messenger)(instance.as_raw(), &info, &mut messenger) };
    if result.into_raw() < 0 {
        warn!("OpenXR debug messenger unavailable: {result:?}");
        return None;
    }
    Some(messenger)
}

/// Must run before the instance it was created from is destroyed.
pub(crate) fn destroy_messenger(instance: &xr::Instance, messenger: sys::DebugUtilsMessengerEXT) {
    if let Some(ext) = instance.exts().ext_debug_utils.as_ref() {
        let result = unsafe { (ext.destroy_debug_utils_messenger)(messenger) };
        if result.into_raw() < 0 {
            warn!("destroying OpenXR debug messenger failed: {result:?}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sys::DebugUtilsMessageSeverityFlagsEXT as S;
    use sys::DebugUtilsMessageTypeFlagsEXT as T;

    #[test]
    fn severities_map_to_the_highest_level_set() {
        assert_eq!(severity_level(S::ERROR), Level::ERROR);
        assert_eq!(severity_level(S::WARNING | S::INFO), Level::WARN);
        assert_eq!(severity_level(S::INFO), Level::INFO);
        assert_eq!(severity_level(S::VERBOSE), Level::TRACE);
    }

    #[test]
    fn validation_outranks_general_in_the_prefix() {
        assert_eq!(message_type_name(T::GENERAL | T::VALIDATION), "validation");
        assert_eq!(message_type_name(T::CONFORMANCE), "conformance");
        assert_eq!(message_type_name(T::GENERAL), "general");
        assert_eq!(message_type_name(T::default()), "unknown");
    }

    #[test]
    fn core_validation_is_enabled_only_when_installed() {
        let installed = vec![
            "XR_APILAYER_LUNARG_api_dump".to_string(),
            CORE_VALIDATION_LAYER.to_string(),
        ];
        assert_eq!(validation_layers(&installed), [CORE_VALIDATION_LAYER]);
        assert!(validation_layers(&["XR_APILAYER_LUNARG_api_dump".to_string()]).is_empty());
        assert!(validation_layers(&[]).is_empty());
    }
}
