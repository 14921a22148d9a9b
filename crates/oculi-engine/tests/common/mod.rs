// SPDX-License-Identifier: CEPL-1.0
#![allow(dead_code)]

use oculi_core::QuitFlag;
use oculi_engine::{
    DisplayTime, EngineSettings, FrameError, FrameTiming, Hand, ImageWait, RunContext,
    RunSummary, RuntimeEvent, SessionState, SyncOutcome, XrRuntime,
};
use oculi_math::{Fov, LocationFlags, Pose, Vec3};
use oculi_render::{Eye, EyeRenderer, EyeView, SceneState};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    BeginSession,
    EndSession,
    WaitFrame,
    BeginFrame,
    LocateViews,
    EndFrame { layers: usize },
    SyncActions,
    LocateHand(Hand),
    GrabState(Hand),
    Acquire(Eye),
    WaitImage(Eye),
    Release(Eye),
    DestroySwapchains,
    Render(Eye, u32),
    WaitIdle,
    ReleaseFrames,
}

pub type CallLog = Rc<RefCell<Vec<Call>>>;

/// One scripted poll. `Frame` leaves the event queue empty and stages the timing the
/// next `wait_frame` returns.
#[derive(Clone, Copy, Debug)]
pub enum Step {
    Event(RuntimeEvent),
    Frame { should_render: bool },
    Quit,
}

pub fn state(s: SessionState) -> Step {
    Step::Event(RuntimeEvent::SessionStateChanged(s))
}

pub fn frames(n: usize) -> impl Iterator<Item = Step> {
    std::iter::repeat(Step::Frame { should_render: true }).take(n)
}

pub fn focused_session() -> Vec<Step> {
    vec![
        state(SessionState::Ready),
        state(SessionState::Synchronized),
        state(SessionState::Visible),
        state(SessionState::Focused),
    ]
}

pub struct ScriptedRuntime {
    pub log: CallLog,
    pub script: VecDeque<Step>,
    pub quit: QuitFlag,
    pub staged: Option<FrameTiming>,
    pub clock: i64,
    pub focused: bool,
    pub hands: [(Pose, LocationFlags); 2],
    pub grabs: [bool; 2],
    pub image_wait: ImageWait,
    pub swapchain_len: u32,
    acquired: [u32; 2],
}

impl ScriptedRuntime {
    pub fn new(log: CallLog, quit: QuitFlag, script: impl IntoIterator<Item = Step>) -> Self {
        let tracked = LocationFlags::all();
        ScriptedRuntime {
            log,
            script: script.into_iter().collect(),
            quit,
            staged: None,
            clock: 0,
            focused: true,
            hands: [(Pose::IDENTITY, tracked); 2],
            grabs: [false; 2],
            image_wait: ImageWait::Ready,
            swapchain_len: 3,
            acquired: [0; 2],
        }
    }

    fn record(&self, call: Call) {
        self.log.borrow_mut().push(call);
    }
}

pub fn eye_views() -> [EyeView; 2] {
    let fov = Fov::symmetric(0.7, 0.7);
    [
        EyeView {
            pose: Pose::at(Vec3::new(-0.032, 1.6, 0.0)),
            fov,
        },
        EyeView {
            pose: Pose::at(Vec3::new(0.032, 1.6, 0.0)),
            fov,
        },
    ]
}

impl XrRuntime for ScriptedRuntime {
    fn poll_event(&mut self) -> Result<Option<RuntimeEvent>, FrameError> {
        match self.script.pop_front() {
            Some(Step::Event(ev)) => Ok(Some(ev)),
            Some(Step::Frame { should_render }) => {
                self.clock += 11_111_111;
                self.staged = Some(FrameTiming {
                    should_render,
                    predicted_display_time: DisplayTime(self.clock),
                });
                Ok(None)
            }
            // The loop sees the flag at the top of its next tick.
            Some(Step::Quit) | None => {
                self.quit.request();
                Ok(Some(RuntimeEvent::Other))
            }
        }
    }

    fn begin_session(&mut self) -> Result<(), FrameError> {
        self.record(Call::BeginSession);
        Ok(())
    }

    fn end_session(&mut self) -> Result<(), FrameError> {
        self.record(Call::EndSession);
        Ok(())
    }

    fn wait_frame(&mut self) -> Result<FrameTiming, FrameError> {
        self.record(Call::WaitFrame);
        self.staged
            .take()
            .ok_or_else(|| FrameError::runtime("wait_frame", "no frame staged"))
    }

    fn begin_frame(&mut self) -> Result<(), FrameError> {
        self.record(Call::BeginFrame);
        Ok(())
    }

    fn locate_views(&mut self, _time: DisplayTime) -> Result<[EyeView; 2], FrameError> {
        self.record(Call::LocateViews);
        Ok(eye_views())
    }

    fn end_frame(
        &mut self,
        _time: DisplayTime,
        views: Option<&[EyeView; 2]>,
    ) -> Result<(), FrameError> {
        self.record(Call::EndFrame {
            layers: usize::from(views.is_some()),
        });
        Ok(())
    }

    fn sync_actions(&mut self) -> Result<SyncOutcome, FrameError> {
        self.record(Call::SyncActions);
        Ok(if self.focused {
            SyncOutcome::Synced
        } else {
            SyncOutcome::NotFocused
        })
    }

    fn locate_hand(
        &mut self,
        hand: Hand,
        _time: DisplayTime,
    ) -> Result<(Pose, LocationFlags), FrameError> {
        self.record(Call::LocateHand(hand));
        Ok(self.hands[hand.index()])
    }

    fn grab_state(&mut self, hand: Hand) -> Result<bool, FrameError> {
        self.record(Call::GrabState(hand));
        Ok(self.grabs[hand.index()])
    }

    fn acquire_image(&mut self, eye: Eye) -> Result<u32, FrameError> {
        self.record(Call::Acquire(eye));
        let slot = &mut self.acquired[eye.index()];
        let index = *slot % self.swapchain_len;
        *slot += 1;
        Ok(index)
    }

    fn wait_image(&mut self, eye: Eye, _timeout: Duration) -> Result<ImageWait, FrameError> {
        self.record(Call::WaitImage(eye));
        Ok(self.image_wait)
    }

    fn release_image(&mut self, eye: Eye) -> Result<(), FrameError> {
        self.record(Call::Release(eye));
        Ok(())
    }

    fn destroy_swapchains(&mut self) {
        self.record(Call::DestroySwapchains);
    }
}

pub struct RecordingRenderer {
    pub log: CallLog,
    pub fail_render: bool,
    pub objects_seen: Vec<Vec3>,
}

impl RecordingRenderer {
    pub fn new(log: CallLog) -> Self {
        RecordingRenderer {
            log,
            fail_render: false,
            objects_seen: Vec::new(),
        }
    }
}

impl EyeRenderer for RecordingRenderer {
    fn image_count(&self, _eye: Eye) -> usize {
        3
    }

    fn render_eye(
        &mut self,
        eye: Eye,
        image_index: u32,
        _view: &EyeView,
        scene: &SceneState,
    ) -> anyhow::Result<()> {
        self.log.borrow_mut().push(Call::Render(eye, image_index));
        if self.fail_render {
            anyhow::bail!("queue submit failed: ERROR_DEVICE_LOST");
        }
        self.objects_seen.push(scene.object_position);
        Ok(())
    }

    fn wait_idle(&mut self) -> anyhow::Result<()> {
        self.log.borrow_mut().push(Call::WaitIdle);
        Ok(())
    }

    fn release_frames(&mut self) {
        self.log.borrow_mut().push(Call::ReleaseFrames);
    }
}

pub struct Harness {
    pub log: CallLog,
    pub runtime: ScriptedRuntime,
    pub renderer: RecordingRenderer,
    pub ctx: RunContext,
}

impl Harness {
    pub fn new(script: impl IntoIterator<Item = Step>) -> Self {
        let log = CallLog::default();
        let quit = QuitFlag::new();
        let settings = EngineSettings {
            idle_backoff: Duration::ZERO,
            ..EngineSettings::default()
        };
        Harness {
            runtime: ScriptedRuntime::new(log.clone(), quit.clone(), script),
            renderer: RecordingRenderer::new(log.clone()),
            ctx: RunContext::new(quit, settings, Vec3::ZERO),
            log,
        }
    }

    pub fn run(&mut self) -> RunSummary {
        oculi_engine::run(&mut self.runtime, &mut self.renderer, &mut self.ctx)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.log.borrow().clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.log.borrow().iter().filter(|c| *c == call).count()
    }

    pub fn position(&self, call: &Call) -> Option<usize> {
        self.log.borrow().iter().position(|c| c == call)
    }
}
