// SPDX-License-Identifier: CEPL-1.0
use crate::{FrameError, RuntimeEvent, SessionState, StopReason, XrRuntime};
use tracing::{debug, error, info, warn};

#[derive(Clone, Debug, PartialEq)]
pub enum SessionControl {
    Continue,
    Shutdown(StopReason),
}

/// Tracks the last session state the runtime reported and whether frames should flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionMachine {
    state: SessionState,
    running: bool,
}

impl Default for SessionMachine {
    fn default() -> Self {
        SessionMachine {
            state: SessionState::Idle,
            running: false,
        }
    }
}

impl SessionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Applies one runtime event. Only a failed `begin_session` is returned as an error.
    pub fn handle_event<R: XrRuntime + ?Sized>(
        &mut self,
        event: RuntimeEvent,
        runtime: &mut R,
    ) -> Result<SessionControl, FrameError> {
        match event {
            RuntimeEvent::SessionStateChanged(state) => self.transition(state, runtime),
            RuntimeEvent::EventsLost(count) => {
                warn!("runtime event queue overflowed, {count} events lost");
                Ok(SessionControl::Continue)
            }
            RuntimeEvent::InstanceLossPending => {
                error!("OpenXR instance loss pending");
                Ok(SessionControl::Shutdown(StopReason::InstanceLost))
            }
            RuntimeEvent::InteractionProfileChanged => {
                info!("interaction profile changed");
                Ok(SessionControl::Continue)
            }
            RuntimeEvent::ReferenceSpaceChangePending => {
                info!("reference space change pending");
                Ok(SessionControl::Continue)
            }
            RuntimeEvent::Other => {
                debug!("ignoring runtime event");
                Ok(SessionControl::Continue)
            }
        }
    }

    fn transition<R: XrRuntime + ?Sized>(
        &mut self,
        next: SessionState,
        runtime: &mut R,
    ) -> Result<SessionControl, FrameError> {
        if let SessionState::Unknown(raw) = next {
            warn!("unknown session state {raw}, staying in {:?}", self.state);
            return Ok(SessionControl::Continue);
        }

        info!("session state {:?} -> {:?}", self.state, next);
        self.state = next;

        match next {
            SessionState::Idle => self.running = false,
            SessionState::Ready => {
                runtime.begin_session()?;
                info!("session begun");
                self.running = true;
            }
            SessionState::Synchronized | SessionState::Visible | SessionState::Focused => {
                self.running = true;
            }
            SessionState::Stopping => {
                if let Err(e) = runtime.end_session() {
                    error!("end_session failed: {e}");
                } else {
                    info!("session ended");
                }
                self.running = false;
            }
            SessionState::LossPending => {
                self.running = false;
                return Ok(SessionControl::Shutdown(StopReason::SessionLost));
            }
            SessionState::Exiting => {
                self.running = false;
                return Ok(SessionControl::Shutdown(StopReason::SessionExiting));
            }
            SessionState::Unknown(_) => {}
        }
        Ok(SessionControl::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DisplayTime, FrameTiming, Hand, ImageWait, SyncOutcome};
    use oculi_math::{LocationFlags, Pose};
    use oculi_render::{Eye, EyeView};
    use std::time::Duration;

    #[derive(Default)]
    struct Counter {
        begins: u32,
        ends: u32,
        fail_begin: bool,
        fail_end: bool,
    }

    impl XrRuntime for Counter {
        fn poll_event(&mut self) -> Result<Option<RuntimeEvent>, FrameError> {
            Ok(None)
        }
        fn begin_session(&mut self) -> Result<(), FrameError> {
            self.begins += 1;
            if self.fail_begin {
                return Err(FrameError::runtime("begin_session", "ERROR_RUNTIME_FAILURE"));
            }
            Ok(())
        }
        fn end_session(&mut self) -> Result<(), FrameError> {
            self.ends += 1;
            if self.fail_end {
                return Err(FrameError::runtime("end_session", "ERROR_SESSION_NOT_STOPPING"));
            }
            Ok(())
        }
        fn wait_frame(&mut self) -> Result<FrameTiming, FrameError> {
            unreachable!()
        }
        fn begin_frame(&mut self) -> Result<(), FrameError> {
            unreachable!()
        }
        fn locate_views(&mut self, _: DisplayTime) -> Result<[EyeView; 2], FrameError> {
            unreachable!()
        }
        fn end_frame(&mut self, _: DisplayTime, _: Option<&[EyeView; 2]>) -> Result<(), FrameError> {
            unreachable!()
        }
        fn sync_actions(&mut self) -> Result<SyncOutcome, FrameError> {
            unreachable!()
        }
        fn locate_hand(&mut self, _: Hand, _: DisplayTime) -> Result<(Pose, LocationFlags), FrameError> {
            unreachable!()
        }
        fn grab_state(&mut self, _: Hand) -> Result<bool, FrameError> {
            unreachable!()
        }
        fn acquire_image(&mut self, _: Eye) -> Result<u32, FrameError> {
            unreachable!()
        }
        fn wait_image(&mut self, _: Eye, _: Duration) -> Result<ImageWait, FrameError> {
            unreachable!()
        }
        fn release_image(&mut self, _: Eye) -> Result<(), FrameError> {
            unreachable!()
        }
        fn destroy_swapchains(&mut self) {}
    }

    fn state(s: SessionState) -> RuntimeEvent {
        RuntimeEvent::SessionStateChanged(s)
    }

    #[test]
    fn ready_begins_the_session_once() {
        let mut rt = Counter::default();
        let mut m = SessionMachine::new();
        assert!(!m.is_running());

        let ctl = m.handle_event(state(SessionState::Ready), &mut rt).unwrap();
        assert_eq!(ctl, SessionControl::Continue);
        assert!(m.is_running());
        assert_eq!(rt.begins, 1);

        for s in [SessionState::Synchronized, SessionState::Visible, SessionState::Focused] {
            m.handle_event(state(s), &mut rt).unwrap();
            assert!(m.is_running());
            assert_eq!(m.state(), s);
        }
        assert_eq!(rt.begins, 1);
    }

    #[test]
    fn failed_begin_is_an_error() {
        let mut rt = Counter {
            fail_begin: true,
            ..Default::default()
        };
        let mut m = SessionMachine::new();
        let err = m.handle_event(state(SessionState::Ready), &mut rt).unwrap_err();
        assert!(matches!(err, FrameError::Runtime { call: "begin_session", .. }));
        assert!(!m.is_running());
    }

    #[test]
    fn stopping_ends_the_session_and_stops_frames() {
        let mut rt = Counter::default();
        let mut m = SessionMachine::new();
        m.handle_event(state(SessionState::Ready), &mut rt).unwrap();
        m.handle_event(state(SessionState::Stopping), &mut rt).unwrap();
        assert_eq!(rt.ends, 1);
        assert!(!m.is_running());
    }

    #[test]
    fn failed_end_is_only_logged() {
        let mut rt = Counter {
            fail_end: true,
            ..Default::default()
        };
        let mut m = SessionMachine::new();
        m.handle_event(state(SessionState::Ready), &mut rt).unwrap();
        let ctl = m.handle_event(state(SessionState::Stopping), &mut rt).unwrap();
        assert_eq!(ctl, SessionControl::Continue);
        assert!(!m.is_running());
    }

    #[test]
    fn idle_stops_frames() {
        let mut rt = Counter::default();
        let mut m = SessionMachine::new();
        m.handle_event(state(SessionState::Ready), &mut rt).unwrap();
        m.handle_event(state(SessionState::Idle), &mut rt).unwrap();
        assert!(!m.is_running());
        assert_eq!(rt.ends, 0);
    }

    #[test]
    fn terminal_states_shut_down() {
        let mut rt = Counter::default();
        let mut m = SessionMachine::new();
        assert_eq!(
            m.handle_event(state(SessionState::Exiting), &mut rt).unwrap(),
            SessionControl::Shutdown(StopReason::SessionExiting)
        );
        assert_eq!(
            m.handle_event(state(SessionState::LossPending), &mut rt).unwrap(),
            SessionControl::Shutdown(StopReason::SessionLost)
        );
        assert_eq!(
            m.handle_event(RuntimeEvent::InstanceLossPending, &mut rt).unwrap(),
            SessionControl::Shutdown(StopReason::InstanceLost)
        );
    }

    #[test]
    fn unknown_state_changes_nothing() {
        let mut rt = Counter::default();
        let mut m = SessionMachine::new();
        m.handle_event(state(SessionState::Ready), &mut rt).unwrap();
        let before = m;
        let ctl = m
            .handle_event(state(SessionState::Unknown(0x7fff_0000)), &mut rt)
            .unwrap();
        assert_eq!(ctl, SessionControl::Continue);
        assert_eq!(m, before);
    }

    #[test]
    fn informational_events_continue() {
        let mut rt = Counter::default();
        let mut m = SessionMachine::new();
        for ev in [
            RuntimeEvent::EventsLost(3),
            RuntimeEvent::InteractionProfileChanged,
            RuntimeEvent::ReferenceSpaceChangePending,
            RuntimeEvent::Other,
        ] {
            assert_eq!(m.handle_event(ev, &mut rt).unwrap(), SessionControl::Continue);
        }
        assert_eq!(m, SessionMachine::new());
    }
}
