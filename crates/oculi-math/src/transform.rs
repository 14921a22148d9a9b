// SPDX-License-Identifier: CEPL-1.0
use crate::Pose;
use glam::{Mat4, Quat, Vec3};
use std::cell::Cell;

/// A pose whose matrix is rebuilt only after it moves.
#[derive(Clone, Debug)]
pub struct Transform {
    pose: Pose,
    cached: Cell<Option<Mat4>>,
}

impl Transform {
    pub fn identity() -> Self {
        Transform::from_pose(Pose::IDENTITY)
    }

    pub fn from_pose(pose: Pose) -> Self {
        Transform {
            pose,
            cached: Cell::new(None),
        }
    }

    pub fn move_abs(&mut self, position: Vec3) -> &mut Self {
        self.pose.position = position;
        self.cached.set(None);
        self
    }

    pub fn rotate_abs(&mut self, orientation: Quat) -> &mut Self {
        self.pose.orientation = orientation;
        self.cached.set(None);
        self
    }

    pub fn set_pose(&mut self, pose: Pose) -> &mut Self {
        self.move_abs(pose.position).rotate_abs(pose.orientation)
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn position(&self) -> Vec3 {
        self.pose.position
    }

    pub fn matrix(&self) -> Mat4 {
        if let Some(m) = self.cached.get() {
            return m;
        }
        let m = self.pose.matrix();
        self.cached.set(Some(m));
        m
    }

    #[cfg(test)]
    fn is_cached(&self) -> bool {
        self.cached.get().is_some()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Transform::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_is_cached_until_moved() {
        let mut t = Transform::identity();
        assert!(!t.is_cached());
        assert_eq!(t.matrix(), Mat4::IDENTITY);
        assert!(t.is_cached());

        t.move_abs(Vec3::new(0.0, 0.0, -2.0));
        assert!(!t.is_cached());
        assert_eq!(t.matrix().col(3).truncate(), Vec3::new(0.0, 0.0, -2.0));

        t.rotate_abs(Quat::from_rotation_z(0.5));
        assert!(!t.is_cached());
        let expected = Pose::new(Vec3::new(0.0, 0.0, -2.0), Quat::from_rotation_z(0.5)).matrix();
        assert!(t.matrix().abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn set_pose_replaces_both_parts() {
        let mut t = Transform::identity();
        let pose = Pose::new(Vec3::ONE, Quat::from_rotation_x(1.0));
        t.set_pose(pose);
        assert_eq!(t.pose(), pose);
        assert_eq!(t.position(), Vec3::ONE);
    }
}
