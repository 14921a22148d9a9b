// SPDX-License-Identifier: CEPL-1.0
use crate::{cue_model, object_model};
use oculi_math::{Mat4, Transform, Vec3};

/// What the renderer draws each frame: the grabbable object and a cue at the right hand.
#[derive(Clone, Debug, Default)]
pub struct SceneState {
    pub object_position: Vec3,
    pub right_hand: Transform,
}

impl SceneState {
    pub fn new(object_position: Vec3) -> Self {
        SceneState {
            object_position,
            right_hand: Transform::identity(),
        }
    }

    /// Model matrices in draw order: object first, then the right-hand cue.
    pub fn draws(&self) -> [Mat4; 2] {
        [object_model(self.object_position), cue_model(&self.right_hand)]
    }
}

/// Offset from a touch controller's grip pose to where the cue mesh should sit:
/// tilted -20.6 degrees about X, then shifted back onto the grip.
pub fn grip_origin() -> Mat4 {
    Mat4::from_rotation_x((-20.6_f32).to_radians())
        * Mat4::from_translation(-Vec3::new(-0.007, -0.001_829_41, 0.101_948_2))
}
