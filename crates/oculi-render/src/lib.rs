// SPDX-License-Identifier: CEPL-1.0
use anyhow::Result;
use oculi_math::{model_at, projection_from_fov, view_from_pose, Fov, Mat4, Pose, Transform, Vec3};
use std::fmt;

mod scene;

pub use scene::{grip_origin, SceneState};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Eye {
    Left,
    Right,
}

impl Eye {
    /// Render order.
    pub const BOTH: [Eye; 2] = [Eye::Left, Eye::Right];

    pub fn index(self) -> usize {
        match self {
            Eye::Left => 0,
            Eye::Right => 1,
        }
    }
}

impl fmt::Display for Eye {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Eye::Left => "left",
            Eye::Right => "right",
        })
    }
}

/// One eye's located view, valid only for the frame it was located in.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EyeView {
    pub pose: Pose,
    pub fov: Fov,
}

/// Per-eye camera matrices, in the order they are laid out in the uniform buffer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EyeMatrices {
    pub projection: Mat4,
    pub view: Mat4,
}

impl EyeMatrices {
    pub fn for_view(view: &EyeView, near: f32, far: f32) -> Self {
        EyeMatrices {
            projection: projection_from_fov(&view.fov, near, far),
            view: view_from_pose(&view.pose),
        }
    }
}

/// The GPU half of the per-eye protocol.
///
/// The frame loop owns acquire/wait/release against the XR runtime and calls
/// `render_eye` in between with the slot index the runtime handed out.
pub trait EyeRenderer {
    /// Number of frame resources backing `eye`'s swapchain.
    fn image_count(&self, eye: Eye) -> usize;

    fn render_eye(
        &mut self,
        eye: Eye,
        image_index: u32,
        view: &EyeView,
        scene: &SceneState,
    ) -> Result<()>;

    /// Blocks until the GPU has finished all submitted work.
    fn wait_idle(&mut self) -> Result<()>;

    /// Destroys every frame resource. Must run after `wait_idle` and before the
    /// swapchains that own the images are destroyed.
    fn release_frames(&mut self);
}

pub fn object_model(position: Vec3) -> Mat4 {
    model_at(position)
}

pub fn cue_model(hand: &Transform) -> Mat4 {
    hand.matrix() * grip_origin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use oculi_math::{FAR_CLIP, NEAR_CLIP};

    #[test]
    fn eyes_render_left_first() {
        assert_eq!(Eye::BOTH.map(Eye::index), [0, 1]);
        assert_eq!(Eye::Left.to_string(), "left");
        assert_eq!(Eye::Right.to_string(), "right");
    }

    #[test]
    fn matrices_follow_the_view() {
        let view = EyeView {
            pose: Pose::at(Vec3::new(0.0, 1.7, 0.0)),
            fov: Fov::symmetric(0.7, 0.7),
        };
        let m = EyeMatrices::for_view(&view, NEAR_CLIP, FAR_CLIP);
        assert!(m
            .view
            .col(3)
            .truncate()
            .abs_diff_eq(Vec3::new(0.0, -1.7, 0.0), 1e-6));
        assert_eq!(m.projection.col(2)[3], -1.0);
    }
}
