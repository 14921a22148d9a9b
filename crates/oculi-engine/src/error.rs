// SPDX-License-Identifier: CEPL-1.0
use oculi_render::Eye;
use std::fmt::Debug;
use std::time::Duration;
use thiserror::Error;

/// A failure on the per-frame critical path. Any of these ends the frame loop.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum FrameError {
    #[error("{call} failed: {reason}")]
    Runtime { call: &'static str, reason: String },

    #[error("{eye} eye swapchain image not ready within {timeout:?}")]
    ImageWaitTimeout { eye: Eye, timeout: Duration },

    #[error("{eye} eye render failed: {reason}")]
    Render { eye: Eye, reason: String },
}

impl FrameError {
    pub fn runtime(call: &'static str, reason: impl Debug) -> Self {
        FrameError::Runtime {
            call,
            reason: format!("{reason:?}"),
        }
    }
}
