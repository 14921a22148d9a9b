// SPDX-License-Identifier: CEPL-1.0
//! Session lifecycle, frame pacing and input for a stereo headset.
//!
//! The engine talks to the compositor only through [`XrRuntime`] and to the GPU only
//! through [`oculi_render::EyeRenderer`], so the whole loop runs the same against a real
//! OpenXR session or a scripted one.
#![deny(unsafe_op_in_unsafe_fn)]
mod context;
mod error;
mod frame_loop;
mod input;
mod runtime;
mod session;

pub use context::{EngineSettings, RunContext, GRAB_DISTANCE};
pub use error::FrameError;
pub use frame_loop::{run, RunSummary, StopReason};
pub use input::{sync_input, Grab, HandInput};
pub use runtime::{
    DisplayTime, FrameTiming, Hand, ImageWait, RuntimeEvent, SessionState, SyncOutcome,
    XrRuntime,
};
pub use session::{SessionControl, SessionMachine};
