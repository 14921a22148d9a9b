// SPDX-License-Identifier: CEPL-1.0
use std::fmt::Debug;
use thiserror::Error;

/// Failure while bringing up the XR runtime, the GPU, or one of the per-eye resources.
///
/// Every setup factory returns this instead of a null handle, so nothing downstream
/// can run against a half-built device.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("OpenXR loader unavailable: {0}")]
    Loader(String),

    #[error("runtime does not offer required extension {0}")]
    MissingExtension(&'static str),

    #[error("{what} creation failed: {reason}")]
    Create { what: &'static str, reason: String },

    #[error("no suitable {0}")]
    NotFound(&'static str),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SetupError {
    /// Wraps a runtime or driver result code (`xr::sys::Result`, `vk::Result`, ...).
    pub fn create(what: &'static str, reason: impl Debug) -> Self {
        SetupError::Create {
            what,
            reason: format!("{reason:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Code;

    #[test]
    fn create_names_stage_and_reason() {
        let e = SetupError::create("swapchain", Code);
        assert_eq!(e.to_string(), "swapchain creation failed: Code");
    }

    #[test]
    fn anyhow_errors_pass_through() {
        let e: SetupError = anyhow::anyhow!("spv blob truncated").into();
        assert_eq!(e.to_string(), "spv blob truncated");
    }

    #[test]
    fn missing_extension_message() {
        let e = SetupError::MissingExtension("XR_KHR_vulkan_enable");
        assert!(e.to_string().contains("XR_KHR_vulkan_enable"));
    }
}
