// SPDX-License-Identifier: CEPL-1.0
//! Pose and camera math shared by the engine, the XR runtime and the renderers.
//!
//! Matrices are glam column-major, so `m.col(c)[r]` is element `[c][r]`.
mod pose;
mod projection;
mod transform;

pub use glam::{Mat4, Quat, Vec3, Vec4};
pub use pose::{Fov, LocationFlags, Pose};
pub use projection::{model_at, projection_from_fov, view_from_pose, FAR_CLIP, NEAR_CLIP};
pub use transform::Transform;
