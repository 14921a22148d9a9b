// SPDX-License-Identifier: CEPL-1.0
//! Vulkan back end for the per-eye renderer.
//!
//! The XR runtime owns the swapchain images; this crate owns everything that renders
//! into them: one frame resource per image, a colour+depth render pass and a single
//! pipeline that draws the scene's cubes.
mod formats;
mod frame;
mod gpu;
mod instance;
mod memory;
mod mesh;
mod pipeline;
mod renderer;

pub use formats::{color_format_by_name, format_name, pick_depth_format, DEPTH_CANDIDATES};
pub use gpu::{graphics_queue_family, GpuContext};
pub use instance::VulkanInstance;
pub use renderer::{SwapchainTarget, VkEyeRenderer};

pub use ash::vk;
