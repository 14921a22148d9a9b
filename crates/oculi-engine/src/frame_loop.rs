// SPDX-License-Identifier: CEPL-1.0
use crate::{
    sync_input, FrameError, ImageWait, RunContext, SessionControl, SessionMachine, XrRuntime,
};
use oculi_render::{Eye, EyeRenderer, EyeView};
use std::fmt;
use tracing::{error, info, trace, warn};

#[derive(Clone, Debug, PartialEq)]
pub enum StopReason {
    /// The quit flag was raised, normally from the interrupt handler.
    Quit,
    SessionExiting,
    SessionLost,
    InstanceLost,
    Fatal(FrameError),
}

impl StopReason {
    pub fn is_failure(&self) -> bool {
        matches!(self, StopReason::Fatal(_))
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Quit => f.write_str("quit requested"),
            StopReason::SessionExiting => f.write_str("session exiting"),
            StopReason::SessionLost => f.write_str("session lost"),
            StopReason::InstanceLost => f.write_str("instance lost"),
            StopReason::Fatal(e) => write!(f, "fatal: {e}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub reason: StopReason,
    pub ticks: u64,
    pub frames_rendered: u64,
    pub frames_skipped: u64,
}

enum Frame {
    Rendered,
    Skipped,
}

/// Drives the session until it ends, then releases GPU frame state and swapchains.
///
/// Each tick checks the quit flag, then drains at most one runtime event. Only when no
/// event is pending and the session is running does a frame run. Teardown always waits
/// for the GPU once, releases every frame resource and only then destroys swapchains.
pub fn run<R, E>(runtime: &mut R, renderer: &mut E, ctx: &mut RunContext) -> RunSummary
where
    R: XrRuntime + ?Sized,
    E: EyeRenderer + ?Sized,
{
    let mut session = SessionMachine::new();
    let mut ticks = 0u64;
    let mut frames_rendered = 0u64;
    let mut frames_skipped = 0u64;

    let reason = loop {
        if ctx.quit.is_requested() {
            info!("quit requested");
            break StopReason::Quit;
        }
        ticks += 1;

        let event = match runtime.poll_event() {
            Ok(event) => event,
            Err(e) => break fatal(e),
        };

        if let Some(event) = event {
            match session.handle_event(event, runtime) {
                Ok(SessionControl::Continue) => {}
                Ok(SessionControl::Shutdown(reason)) => break reason,
                Err(e) => break fatal(e),
            }
            continue;
        }

        if !session.is_running() {
            if !ctx.settings.idle_backoff.is_zero() {
                std::thread::sleep(ctx.settings.idle_backoff);
            }
            continue;
        }

        match run_frame(runtime, renderer, ctx) {
            Ok(Frame::Rendered) => frames_rendered += 1,
            Ok(Frame::Skipped) => frames_skipped += 1,
            Err(e) => break fatal(e),
        }
    };

    info!("frame loop stopped: {reason}");
    teardown(runtime, renderer);

    RunSummary {
        reason,
        ticks,
        frames_rendered,
        frames_skipped,
    }
}

fn fatal(e: FrameError) -> StopReason {
    error!("{e}");
    StopReason::Fatal(e)
}

fn run_frame<R, E>(
    runtime: &mut R,
    renderer: &mut E,
    ctx: &mut RunContext,
) -> Result<Frame, FrameError>
where
    R: XrRuntime + ?Sized,
    E: EyeRenderer + ?Sized,
{
    let timing = runtime.wait_frame()?;
    let time = timing.predicted_display_time;

    if !timing.should_render {
        trace!("runtime skipped frame at {}", time.0);
        runtime.begin_frame()?;
        runtime.end_frame(time, None)?;
        return Ok(Frame::Skipped);
    }

    if let Err(e) = sync_input(runtime, time, ctx) {
        warn!("input sync failed, frame carries no input: {e}");
    }

    runtime.begin_frame()?;
    let views = runtime.locate_views(time)?;

    for eye in Eye::BOTH {
        render_eye(runtime, renderer, ctx, eye, &views[eye.index()])?;
    }

    runtime.end_frame(time, Some(&views))?;
    trace!("frame {} submitted", time.0);
    Ok(Frame::Rendered)
}

fn render_eye<R, E>(
    runtime: &mut R,
    renderer: &mut E,
    ctx: &RunContext,
    eye: Eye,
    view: &EyeView,
) -> Result<(), FrameError>
where
    R: XrRuntime + ?Sized,
    E: EyeRenderer + ?Sized,
{
    let image_index = runtime.acquire_image(eye)?;
    let count = renderer.image_count(eye);
    if image_index as usize >= count {
        return Err(FrameError::runtime(
            "acquire_image",
            format_args!("index {image_index} outside a ring of {count}"),
        ));
    }

    let timeout = ctx.settings.image_wait_timeout;
    if runtime.wait_image(eye, timeout)? == ImageWait::TimedOut {
        return Err(FrameError::ImageWaitTimeout { eye, timeout });
    }

    renderer
        .render_eye(eye, image_index, view, &ctx.scene)
        .map_err(|e| FrameError::Render {
            eye,
            reason: format!("{e:#}"),
        })?;

    runtime.release_image(eye)
}

fn teardown<R, E>(runtime: &mut R, renderer: &mut E)
where
    R: XrRuntime + ?Sized,
    E: EyeRenderer + ?Sized,
{
    if let Err(e) = renderer.wait_idle() {
        error!("device wait idle failed during teardown: {e:#}");
    }
    renderer.release_frames();
    runtime.destroy_swapchains();
    info!("frame resources and swapchains released");
}
