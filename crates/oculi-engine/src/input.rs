// SPDX-License-Identifier: CEPL-1.0
use crate::{DisplayTime, FrameError, Hand, RunContext, SyncOutcome, XrRuntime};
use oculi_math::{Pose, Vec3};
use tracing::{debug, trace, warn};

/// Which hand, if any, is carrying the object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Grab {
    #[default]
    None,
    HeldLeft,
    HeldRight,
}

/// One hand's input for a single frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HandInput {
    pub pose: Pose,
    pub grab: bool,
}

impl Grab {
    /// Advances the grab state. The left hand is evaluated first, so when both hands
    /// press in range on the same frame the left one wins. A held object snaps to its
    /// holder's position.
    pub fn step(
        self,
        object: &mut Vec3,
        left: &HandInput,
        right: &HandInput,
        grab_distance: f32,
    ) -> Grab {
        let mut next = self;

        if left.grab && next == Grab::None && left.pose.distance_to(*object) < grab_distance {
            next = Grab::HeldLeft;
        } else if !left.grab && next == Grab::HeldLeft {
            next = Grab::None;
        }

        if right.grab && next == Grab::None && right.pose.distance_to(*object) < grab_distance {
            next = Grab::HeldRight;
        } else if !right.grab && next == Grab::HeldRight {
            next = Grab::None;
        }

        match next {
            Grab::HeldLeft => *object = left.pose.position,
            Grab::HeldRight => *object = right.pose.position,
            Grab::None => {}
        }
        next
    }
}

/// Reads both hands for `time` and applies them to the scene.
///
/// Without input focus nothing is read and the scene is untouched. A hand whose pose
/// the runtime cannot vouch for keeps its last trusted pose.
pub fn sync_input<R: XrRuntime + ?Sized>(
    runtime: &mut R,
    time: DisplayTime,
    ctx: &mut RunContext,
) -> Result<SyncOutcome, FrameError> {
    if runtime.sync_actions()? == SyncOutcome::NotFocused {
        trace!("session not focused, skipping input");
        return Ok(SyncOutcome::NotFocused);
    }

    let left = read_hand(runtime, Hand::Left, time, &mut ctx.hands);
    let right = read_hand(runtime, Hand::Right, time, &mut ctx.hands);

    let grab = ctx.grab.step(
        &mut ctx.scene.object_position,
        &left,
        &right,
        ctx.settings.grab_distance,
    );
    if grab != ctx.grab {
        debug!("grab {:?} -> {:?}", ctx.grab, grab);
    }
    ctx.grab = grab;
    ctx.scene.right_hand.set_pose(right.pose);

    Ok(SyncOutcome::Synced)
}

fn read_hand<R: XrRuntime + ?Sized>(
    runtime: &mut R,
    hand: Hand,
    time: DisplayTime,
    last: &mut [Pose; 2],
) -> HandInput {
    let previous = last[hand.index()];
    let pose = match runtime.locate_hand(hand, time) {
        Ok((located, flags)) => {
            if !flags.is_usable() {
                trace!("{hand} hand not tracked ({flags:?}), keeping last pose");
            }
            Pose::resolve(located, flags, previous)
        }
        Err(e) => {
            debug!("locating {hand} hand failed: {e}");
            previous
        }
    };
    last[hand.index()] = pose;

    let grab = runtime.grab_state(hand).unwrap_or_else(|e| {
        warn!("reading {hand} grab failed: {e}");
        false
    });

    HandInput { pose, grab }
}

#[cfg(test)]
mod tests {
    use super::*;

    const D: f32 = 10.0;

    fn hand(x: f32, grab: bool) -> HandInput {
        HandInput {
            pose: Pose::at(Vec3::new(x, 0.0, 0.0)),
            grab,
        }
    }

    #[test]
    fn left_picks_up_in_range() {
        let mut obj = Vec3::ZERO;
        let g = Grab::None.step(&mut obj, &hand(1.0, true), &hand(50.0, false), D);
        assert_eq!(g, Grab::HeldLeft);
        assert_eq!(obj, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn out_of_range_does_nothing() {
        let mut obj = Vec3::ZERO;
        let g = Grab::None.step(&mut obj, &hand(10.0, true), &hand(-10.0, true), D);
        assert_eq!(g, Grab::None);
        assert_eq!(obj, Vec3::ZERO);
    }

    #[test]
    fn left_wins_a_tie() {
        let mut obj = Vec3::ZERO;
        let g = Grab::None.step(&mut obj, &hand(2.0, true), &hand(-2.0, true), D);
        assert_eq!(g, Grab::HeldLeft);
        assert_eq!(obj.x, 2.0);
    }

    #[test]
    fn right_range_uses_the_right_hand() {
        // Left is far away and idle; the right hand alone decides.
        let mut obj = Vec3::ZERO;
        let g = Grab::None.step(&mut obj, &hand(100.0, false), &hand(3.0, true), D);
        assert_eq!(g, Grab::HeldRight);
        assert_eq!(obj.x, 3.0);

        let mut obj = Vec3::ZERO;
        let g = Grab::None.step(&mut obj, &hand(1.0, false), &hand(30.0, true), D);
        assert_eq!(g, Grab::None);
    }

    #[test]
    fn release_on_the_same_frame_lets_the_other_hand_grab() {
        let mut obj = Vec3::new(1.0, 0.0, 0.0);
        let g = Grab::HeldLeft.step(&mut obj, &hand(1.0, false), &hand(2.0, true), D);
        assert_eq!(g, Grab::HeldRight);
        assert_eq!(obj.x, 2.0);
    }

    #[test]
    fn held_object_follows_and_ignores_other_hand() {
        let mut obj = Vec3::ZERO;
        let g = Grab::HeldRight.step(&mut obj, &hand(0.5, true), &hand(4.0, true), D);
        assert_eq!(g, Grab::HeldRight);
        assert_eq!(obj.x, 4.0);
    }

    #[test]
    fn right_release_does_not_free_a_left_hold() {
        let mut obj = Vec3::new(2.0, 0.0, 0.0);
        let g = Grab::HeldLeft.step(&mut obj, &hand(2.5, true), &hand(1.0, false), D);
        assert_eq!(g, Grab::HeldLeft);
        assert_eq!(obj.x, 2.5);
    }

    #[test]
    fn letting_go_leaves_object_in_place() {
        let mut obj = Vec3::new(4.0, 0.0, 0.0);
        let g = Grab::HeldRight.step(&mut obj, &hand(0.0, false), &hand(7.0, false), D);
        assert_eq!(g, Grab::None);
        assert_eq!(obj.x, 4.0);
    }
}
