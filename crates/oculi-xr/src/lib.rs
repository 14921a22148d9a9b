// SPDX-License-Identifier: CEPL-1.0
//! OpenXR side of the headset: instance and system bootstrap, the Vulkan requirements the
//! runtime imposes, and an [`oculi_engine::XrRuntime`] backed by a real session.
#![deny(unsafe_op_in_unsafe_fn)]
mod actions;
mod convert;
mod debug;
mod runtime;
mod settings;
mod system;

pub use convert::{choose_swapchain_format, pack_version, split_extension_list};
pub use runtime::OpenXrRuntime;
pub use settings::{ReferenceSpace, XrSettings, OCULUS_TOUCH_PROFILE};
pub use system::{VulkanRequirements, XrSystem};
