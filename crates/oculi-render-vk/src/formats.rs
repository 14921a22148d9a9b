// SPDX-License-Identifier: CEPL-1.0
use ash::vk;

/// Depth formats in order of preference.
pub const DEPTH_CANDIDATES: [vk::Format; 4] = [
    vk::Format::D32_SFLOAT,
    vk::Format::D24_UNORM_S8_UINT,
    vk::Format::D32_SFLOAT_S8_UINT,
    vk::Format::D16_UNORM,
];

/// First candidate the device can use as an optimal-tiling depth attachment.
pub fn pick_depth_format(supports_depth: impl Fn(vk::Format) -> bool) -> Option<vk::Format> {
    DEPTH_CANDIDATES.into_iter().find(|&f| supports_depth(f))
}

pub(crate) unsafe fn device_depth_format(
    instance: &ash::Instance,
    phys: vk::PhysicalDevice,
) -> Option<vk::Format> {
    pick_depth_format(|fmt| {
        let props = instance.get_physical_device_format_properties(phys, fmt);
        props
            .optimal_tiling_features
            .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
    })
}

pub fn has_stencil(format: vk::Format) -> bool {
    matches!(
        format,
        vk::Format::D24_UNORM_S8_UINT | vk::Format::D32_SFLOAT_S8_UINT | vk::Format::D16_UNORM_S8_UINT
    )
}

/// Colour formats accepted in config, by their lower-case Vulkan suffix.
pub fn color_format_by_name(name: &str) -> Option<vk::Format> {
    Some(match name.to_ascii_lowercase().as_str() {
        "r8g8b8a8_srgb" => vk::Format::R8G8B8A8_SRGB,
        "b8g8r8a8_srgb" => vk::Format::B8G8R8A8_SRGB,
        "r8g8b8a8_unorm" => vk::Format::R8G8B8A8_UNORM,
        "b8g8r8a8_unorm" => vk::Format::B8G8R8A8_UNORM,
        "r16g16b16a16_sfloat" => vk::Format::R16G16B16A16_SFLOAT,
        "a2b10g10r10_unorm_pack32" => vk::Format::A2B10G10R10_UNORM_PACK32,
        _ => return None,
    })
}

// Info only
pub fn format_name(f: vk::Format) -> &'static str {
    match f {
        vk::Format::R8G8B8A8_SRGB => "R8G8B8A8_SRGB",
        vk::Format::B8G8R8A8_SRGB => "B8G8R8A8_SRGB",
        vk::Format::R8G8B8A8_UNORM => "R8G8B8A8_UNORM",
        vk::Format::B8G8R8A8_UNORM => "B8G8R8A8_UNORM",
        vk::Format::R16G16B16A16_SFLOAT => "R16G16B16A16_SFLOAT",
        vk::Format::A2B10G10R10_UNORM_PACK32 => "A2B10G10R10_UNORM_PACK32",
        vk::Format::D32_SFLOAT => "D32_SFLOAT",
        vk::Format::D24_UNORM_S8_UINT => "D24_UNORM_S8_UINT",
        vk::Format::D32_SFLOAT_S8_UINT => "D32_SFLOAT_S8_UINT",
        vk::Format::D16_UNORM => "D16_UNORM",
        _ => "OTHER",
    }
}
