// SPDX-License-Identifier: CEPL-1.0
use crate::{Fov, Pose};
use glam::{Mat4, Vec3, Vec4};

pub const NEAR_CLIP: f32 = 0.01;
pub const FAR_CLIP: f32 = 1_000.0;

/// Off-axis perspective projection for one eye.
///
/// Built from the tangents of the four half-angles. The vertical extent is
/// `tan(down) - tan(up)`, which is negative for a normal frustum and flips Y into
/// Vulkan clip space. Depth maps `near..far` to `0..1`.
pub fn projection_from_fov(fov: &Fov, near: f32, far: f32) -> Mat4 {
    let left = fov.angle_left.tan();
    let right = fov.angle_right.tan();
    let up = fov.angle_up.tan();
    let down = fov.angle_down.tan();

    let width = right - left;
    let height = down - up;

    Mat4::from_cols(
        Vec4::new(2.0 / width, 0.0, 0.0, 0.0),
        Vec4::new(0.0, 2.0 / height, 0.0, 0.0),
        Vec4::new(
            (right + left) / width,
            (up + down) / height,
            -far / (far - near),
            -1.0,
        ),
        Vec4::new(0.0, 0.0, -(far * near) / (far - near), 0.0),
    )
}

/// World-to-eye transform: inverse of `translate(position) * rotate(orientation)`.
pub fn view_from_pose(pose: &Pose) -> Mat4 {
    (Mat4::from_translation(pose.position) * Mat4::from_quat(pose.orientation)).inverse()
}

pub fn model_at(position: Vec3) -> Mat4 {
    Mat4::from_translation(position)
}
