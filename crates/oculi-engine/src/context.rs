// SPDX-License-Identifier: CEPL-1.0
use crate::Grab;
use oculi_core::QuitFlag;
use oculi_math::{Pose, Vec3};
use oculi_render::SceneState;
use std::time::Duration;

pub const GRAB_DISTANCE: f32 = 10.0;

#[derive(Clone, Debug, PartialEq)]
pub struct EngineSettings {
    /// A hand closer than this to the object may pick it up.
    pub grab_distance: f32,
    /// Upper bound on each swapchain image wait. Expiry is fatal.
    pub image_wait_timeout: Duration,
    /// Sleep between polls while no session is running.
    pub idle_backoff: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            grab_distance: GRAB_DISTANCE,
            image_wait_timeout: Duration::from_secs(1),
            idle_backoff: Duration::from_millis(10),
        }
    }
}

/// Everything one run of the frame loop mutates.
#[derive(Debug)]
pub struct RunContext {
    pub quit: QuitFlag,
    pub settings: EngineSettings,
    pub scene: SceneState,
    pub grab: Grab,
    /// Last trusted pose per hand, indexed by [`crate::Hand::index`].
    pub hands: [Pose; 2],
}

impl RunContext {
    pub fn new(quit: QuitFlag, settings: EngineSettings, object_position: Vec3) -> Self {
        RunContext {
            quit,
            settings,
            scene: SceneState::new(object_position),
            grab: Grab::None,
            hands: [Pose::IDENTITY; 2],
        }
    }
}
