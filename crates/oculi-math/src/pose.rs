// SPDX-License-Identifier: CEPL-1.0
use bitflags::bitflags;
use glam::{Mat4, Quat, Vec3};

/// Position plus orientation in some reference space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Pose {
            position,
            orientation,
        }
    }

    pub fn at(position: Vec3) -> Self {
        Pose::new(position, Quat::IDENTITY)
    }

    /// `translate(position) * rotate(orientation)`.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.orientation, self.position)
    }

    pub fn distance_to(&self, point: Vec3) -> f32 {
        self.position.distance(point)
    }

    /// Picks `located` when the runtime vouched for it, `previous` otherwise.
    pub fn resolve(located: Pose, flags: LocationFlags, previous: Pose) -> Pose {
        if flags.is_usable() {
            located
        } else {
            previous
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Pose::IDENTITY
    }
}

/// Half-angles of an asymmetric view frustum, in radians.
///
/// `angle_left` and `angle_down` are normally negative.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Fov {
    pub angle_left: f32,
    pub angle_right: f32,
    pub angle_up: f32,
    pub angle_down: f32,
}

impl Fov {
    pub fn symmetric(horizontal: f32, vertical: f32) -> Self {
        Fov {
            angle_left: -horizontal,
            angle_right: horizontal,
            angle_up: vertical,
            angle_down: -vertical,
        }
    }
}

bitflags! {
    /// Validity bits reported alongside a located pose. Bit values follow
    /// `XrSpaceLocationFlags`.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct LocationFlags: u32 {
        const ORIENTATION_VALID = 0x1;
        const POSITION_VALID = 0x2;
        const ORIENTATION_TRACKED = 0x4;
        const POSITION_TRACKED = 0x8;
    }
}

impl LocationFlags {
    /// A pose is only trusted with a valid position and a tracked orientation.
    pub fn is_usable(self) -> bool {
        self.contains(LocationFlags::POSITION_VALID | LocationFlags::ORIENTATION_TRACKED)
    }
}
