// SPDX-License-Identifier: CEPL-1.0
use oculi_core::SetupError;
use oculi_engine::Hand;
use openxr as xr;
use tracing::{info, warn};

const POSE_ACTIONS: [&str; 2] = ["left-hand", "right-hand"];
const GRAB_ACTIONS: [&str; 2] = ["left-grab", "right-grab"];
const POSE_PATHS: [&str; 2] = [
    "/user/hand/left/input/grip/pose",
    "/user/hand/right/input/grip/pose",
];
const GRAB_PATHS: [&str; 2] = ["/user/hand/left/input/x/click", "/user/hand/right/input/a/click"];

/// The "default" action set: a grip pose and a grab button per hand, attached to the
/// session, with one action space per hand pose.
pub(crate) struct HandActions {
    // Spaces first so they are destroyed before the actions they were created from.
    spaces: [xr::Space; 2],
    _poses: [xr::Action<xr::Posef>; 2],
    grabs: [xr::Action<bool>; 2],
    set: xr::ActionSet,
}

impl HandActions {
    pub fn new(
        instance: &xr::Instance,
        session: &xr::Session<xr::Vulkan>,
        profile: &str,
    ) -> Result<Self, SetupError> {
        let set = instance
            .create_action_set("default", "Default", 0)
            .map_err(|e| SetupError::create("action set", e))?;

        let pose_action = |name: &str| {
            set.create_action::<xr::Posef>(name, name, &[])
                .map_err(|e| SetupError::create("pose action", e))
        };
        let poses = [pose_action(POSE_ACTIONS[0])?, pose_action(POSE_ACTIONS[1])?];

        let grab_action = |name: &str| {
            set.create_action::<bool>(name, name, &[])
                .map_err(|e| SetupError::create("grab action", e))
        };
        let grabs = [grab_action(GRAB_ACTIONS[0])?, grab_action(GRAB_ACTIONS[1])?];

        suggest_bindings(instance, profile, &poses, &grabs);

        session
            .attach_action_sets(&[&set])
            .map_err(|e| SetupError::create("action set attachment", e))?;

        let hand_space = |action: &xr::Action<xr::Posef>| {
            action
                .create_space(session, xr::Path::NULL, xr::Posef::IDENTITY)
                .map_err(|e| SetupError::create("hand space", e))
        };
        let spaces = [hand_space(&poses[0])?, hand_space(&poses[1])?];

        Ok(HandActions {
            spaces,
            _poses: poses,
            grabs,
            set,
        })
    }

    pub fn set(&self) -> &xr::ActionSet {
        &self.set
    }

    pub fn space(&self, hand: Hand) -> &xr::Space {
        &self.spaces[hand.index()]
    }

    pub fn grab(&self, hand: Hand) -> &xr::Action<bool> {
        &self.grabs[hand.index()]
    }
}

/// A runtime that rejects the suggestion still runs the session; the hands simply never
/// report a pose or a press.
fn suggest_bindings(
    instance: &xr::Instance,
    profile: &str,
    poses: &[xr::Action<xr::Posef>; 2],
    grabs: &[xr::Action<bool>; 2],
) {
    let result = (|| -> xr::Result<()> {
        let profile_path = instance.string_to_path(profile)?;
        let mut bindings = Vec::with_capacity(4);
        for (action, path) in poses.iter().zip(POSE_PATHS) {
            bindings.push(xr::Binding::new(action, instance.string_to_path(path)?));
        }
        for (action, path) in grabs.iter().zip(GRAB_PATHS) {
            bindings.push(xr::Binding::new(action, instance.string_to_path(path)?));
        }
        instance.suggest_interaction_profile_bindings(profile_path, &bindings)
    })();

    match result {
        Ok(()) => info!(profile, "suggested hand bindings"),
        Err(e) => warn!(profile, error = ?e, "interaction profile bindings rejected"),
    }
}
