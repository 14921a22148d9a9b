// SPDX-License-Identifier: CEPL-1.0
use ash::vk;
use oculi_engine::SessionState;
use oculi_math::{Fov, LocationFlags, Pose, Quat, Vec3};
use openxr as xr;

pub(crate) fn session_state(state: xr::SessionState) -> SessionState {
    match state {
        xr::SessionState::IDLE => SessionState::Idle,
        xr::SessionState::READY => SessionState::Ready,
        xr::SessionState::SYNCHRONIZED => SessionState::Synchronized,
        xr::SessionState::VISIBLE => SessionState::Visible,
        xr::SessionState::FOCUSED => SessionState::Focused,
        xr::SessionState::STOPPING => SessionState::Stopping,
        xr::SessionState::LOSS_PENDING => SessionState::LossPending,
        xr::SessionState::EXITING => SessionState::Exiting,
        other => SessionState::Unknown(other.into_raw()),
    }
}

pub(crate) fn pose_from_xr(p: xr::Posef) -> Pose {
    Pose::new(
        Vec3::new(p.position.x, p.position.y, p.position.z),
        Quat::from_xyzw(
            p.orientation.x,
            p.orientation.y,
            p.orientation.z,
            p.orientation.w,
        ),
    )
}

pub(crate) fn pose_to_xr(p: &Pose) -> xr::Posef {
    let (pos, rot) = (p.position, p.orientation);
    xr::Posef {
        position: xr::Vector3f {
            x: pos.x,
            y: pos.y,
            z: pos.z,
        },
        orientation: xr::Quaternionf {
            x: rot.x,
            y: rot.y,
            z: rot.z,
            w: rot.w,
        },
    }
}

pub(crate) fn fov_from_xr(f: xr::Fovf) -> Fov {
    Fov {
        angle_left: f.angle_left,
        angle_right: f.angle_right,
        angle_up: f.angle_up,
        angle_down: f.angle_down,
    }
}

pub(crate) fn fov_to_xr(f: &Fov) -> xr::Fovf {
    xr::Fovf {
        angle_left: f.angle_left,
        angle_right: f.angle_right,
        angle_up: f.angle_up,
        angle_down: f.angle_down,
    }
}

pub(crate) fn location_flags(flags: xr::SpaceLocationFlags) -> LocationFlags {
    LocationFlags::from_bits_truncate(flags.into_raw() as u32)
}

/// Packs `[major, minor, patch]` the way Vulkan packs versions.
pub fn pack_version([major, minor, patch]: [u32; 3]) -> u32 {
    vk::make_api_version(0, major, minor, patch)
}

/// `preferred` when the runtime offers it, otherwise the runtime's first (most preferred)
/// format.
pub fn choose_swapchain_format(available: &[u32], preferred: vk::Format) -> Option<vk::Format> {
    let wanted = preferred.as_raw();
    available
        .iter()
        .map(|&f| vk::Format::from_raw(f as i32))
        .find(|f| f.as_raw() == wanted)
        .or_else(|| available.first().map(|&f| vk::Format::from_raw(f as i32)))
}

/// The legacy `vulkan_enable` queries return one space-separated string.
pub fn split_extension_list(list: &str) -> Vec<String> {
    list.split_whitespace().map(str::to_owned).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRGB: u32 = vk::Format::R8G8B8A8_SRGB.as_raw() as u32;
    const BGRA: u32 = vk::Format::B8G8R8A8_SRGB.as_raw() as u32;

    #[test]
    fn preferred_format_wins_when_offered() {
        let got = choose_swapchain_format(&[BGRA, SRGB], vk::Format::R8G8B8A8_SRGB);
        assert_eq!(got, Some(vk::Format::R8G8B8A8_SRGB));
    }

    #[test]
    fn falls_back_to_runtime_first_choice() {
        let got = choose_swapchain_format(&[BGRA, 37], vk::Format::R16G16B16A16_SFLOAT);
        assert_eq!(got, Some(vk::Format::B8G8R8A8_SRGB));
        assert_eq!(choose_swapchain_format(&[], vk::Format::R8G8B8A8_SRGB), None);
    }

    #[test]
    fn extension_strings_split_on_any_whitespace() {
        let exts = split_extension_list(" VK_KHR_external_memory  VK_KHR_dedicated_allocation\n");
        assert_eq!(exts, ["VK_KHR_external_memory", "VK_KHR_dedicated_allocation"]);
        assert!(split_extension_list("").is_empty());
    }

    #[test]
    fn session_states_map_by_value() {
        assert_eq!(session_state(xr::SessionState::READY), SessionState::Ready);
        assert_eq!(
            session_state(xr::SessionState::LOSS_PENDING),
            SessionState::LossPending
        );
        assert_eq!(
            session_state(xr::SessionState::from_raw(1_000_042)),
            SessionState::Unknown(1_000_042)
        );
    }

    #[test]
    fn tracking_bits_carry_over() {
        let flags = location_flags(
            xr::SpaceLocationFlags::POSITION_VALID | xr::SpaceLocationFlags::ORIENTATION_TRACKED,
        );
        assert!(flags.is_usable());
        assert!(!location_flags(xr::SpaceLocationFlags::ORIENTATION_VALID).is_usable());
    }

    #[test]
    fn poses_keep_quaternion_component_order() {
        let pose = Pose::new(Vec3::new(0.1, 1.5, -0.3), Quat::from_rotation_y(0.4));
        let raw = pose_to_xr(&pose);
        assert_eq!(raw.orientation.w, pose.orientation.w);
        assert_eq!(raw.position.y, 1.5);
        assert_eq!(pose_from_xr(raw), pose);
    }

    #[test]
    fn version_packing() {
        assert_eq!(pack_version([0, 1, 0]), 1 << 12);
        assert_eq!(pack_version([1, 2, 3]), (1 << 22) | (2 << 12) | 3);
    }
}
