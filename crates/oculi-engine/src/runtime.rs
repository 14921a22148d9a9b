// SPDX-License-Identifier: CEPL-1.0
use crate::FrameError;
use oculi_math::{LocationFlags, Pose};
use oculi_render::{Eye, EyeView};
use std::fmt;
use std::time::Duration;

/// Runtime clock value in nanoseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DisplayTime(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Ready,
    Synchronized,
    Visible,
    Focused,
    Stopping,
    LossPending,
    Exiting,
    /// A state value this engine has no handling for, kept raw for logging.
    Unknown(i32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuntimeEvent {
    SessionStateChanged(SessionState),
    EventsLost(u32),
    InstanceLossPending,
    InteractionProfileChanged,
    ReferenceSpaceChangePending,
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameTiming {
    pub should_render: bool,
    pub predicted_display_time: DisplayTime,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    Synced,
    /// The session has no input focus. Not an error; the frame simply carries no input.
    NotFocused,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageWait {
    Ready,
    TimedOut,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    pub fn index(self) -> usize {
        match self {
            Hand::Left => 0,
            Hand::Right => 1,
        }
    }
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Hand::Left => "left",
            Hand::Right => "right",
        })
    }
}

/// The compositor side of the frame protocol.
///
/// Calls arrive in this order within one loop tick: `poll_event`, then (only while the
/// session runs) `wait_frame`, input (`sync_actions`, `locate_hand`, `grab_state`),
/// `begin_frame`, `locate_views`, per eye `acquire_image` / `wait_image` /
/// `release_image`, and finally `end_frame`.
pub trait XrRuntime {
    /// Non-blocking; `None` when the event queue is empty.
    fn poll_event(&mut self) -> Result<Option<RuntimeEvent>, FrameError>;

    /// Begins the session with the primary stereo view configuration.
    fn begin_session(&mut self) -> Result<(), FrameError>;
    fn end_session(&mut self) -> Result<(), FrameError>;

    /// Blocks until the runtime wants the next frame.
    fn wait_frame(&mut self) -> Result<FrameTiming, FrameError>;
    fn begin_frame(&mut self) -> Result<(), FrameError>;
    fn locate_views(&mut self, time: DisplayTime) -> Result<[EyeView; 2], FrameError>;

    /// Submits one projection layer built from `views`, or no layers at all when `None`.
    fn end_frame(
        &mut self,
        time: DisplayTime,
        views: Option<&[EyeView; 2]>,
    ) -> Result<(), FrameError>;

    fn sync_actions(&mut self) -> Result<SyncOutcome, FrameError>;
    fn locate_hand(
        &mut self,
        hand: Hand,
        time: DisplayTime,
    ) -> Result<(Pose, LocationFlags), FrameError>;
    fn grab_state(&mut self, hand: Hand) -> Result<bool, FrameError>;

    fn acquire_image(&mut self, eye: Eye) -> Result<u32, FrameError>;
    fn wait_image(&mut self, eye: Eye, timeout: Duration) -> Result<ImageWait, FrameError>;
    fn release_image(&mut self, eye: Eye) -> Result<(), FrameError>;

    /// Destroys both eye swapchains. Called once, after every frame resource is gone.
    fn destroy_swapchains(&mut self);
}
