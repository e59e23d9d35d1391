//! Ride session engine: lifecycle state machine and presentation API.
//!
//! ```text
//! setup -> running <-> paused -> ended -> setup
//!              \___________________^
//! ```
//!
//! While running, two tasks share the session state: the clock and, when voice
//! commands are on and a recogniser exists, the voice listener. Both are tied
//! to one cancellation token per running period. Pausing or ending flips the
//! phase and cancels that token inside the same critical section, so no tick
//! or voice resolution can land after the transition commits.
//!
//! All lifecycle methods spawn onto the current Tokio runtime and must be
//! called from within one.

use crate::audio::Announcer;
use crate::clock::run_clock;
use crate::heart_rate::HeartRateFeed;
use crate::state::SharedState;
use crate::voice::{run_voice_loop, NoSpeechInput, SpeechInput, VoiceTiming};
use crate::{
    Capabilities, Error, FuelingAlert, Result, SessionConfig, SessionPhase, SessionState,
    SessionSummary,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Wall-clock pacing of the engine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineTiming {
    /// Real duration of one simulated second
    pub tick_interval: Duration,
    pub voice: VoiceTiming,
}

impl Default for EngineTiming {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            voice: VoiceTiming::default(),
        }
    }
}

/// Tasks belonging to one running period
struct RunHandle {
    cancel: CancellationToken,
    _clock: JoinHandle<()>,
    _voice: Option<JoinHandle<()>>,
}

/// One exercise session and its collaborators
pub struct Session {
    shared: Arc<SharedState>,
    announcer: Announcer,
    speech_input: Arc<dyn SpeechInput>,
    timing: EngineTiming,
    run: Option<RunHandle>,
}

impl Session {
    pub fn new(
        announcer: Announcer,
        speech_input: Arc<dyn SpeechInput>,
        timing: EngineTiming,
    ) -> Self {
        Self {
            shared: Arc::new(SharedState::new()),
            announcer,
            speech_input,
            timing,
            run: None,
        }
    }

    /// A session with no audio output and no speech recognition
    pub fn headless(timing: EngineTiming) -> Self {
        Self::new(Announcer::silent(), Arc::new(NoSpeechInput), timing)
    }

    pub fn phase(&self) -> SessionPhase {
        self.shared.snapshot().phase
    }

    /// Consistent copy of the current state
    pub fn snapshot(&self) -> SessionState {
        self.shared.snapshot()
    }

    /// Receive a snapshot after every mutation
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.shared.subscribe()
    }

    /// Handle for the heart-rate producer; valid in every phase
    pub fn heart_rate_feed(&self) -> HeartRateFeed {
        HeartRateFeed::new(self.shared.clone())
    }

    /// Summary of the finished session, `None` until it has ended
    pub fn summary(&self) -> Option<SessionSummary> {
        let state = self.shared.snapshot();
        (state.phase == SessionPhase::Ended).then(|| SessionSummary::from_state(&state))
    }

    fn capabilities(&self, config: &SessionConfig) -> Capabilities {
        let caps = Capabilities {
            voice_input: config.voice_commands_enabled && self.speech_input.is_available(),
            speech_output: self.announcer.speech_available(),
        };

        if config.voice_commands_enabled && !caps.voice_input {
            tracing::warn!("Speech recognition unavailable; confirm fueling manually");
        }
        if config.voice_alerts_enabled && !caps.speech_output {
            tracing::warn!("Speech output unavailable; alerts will use the tone only");
        }

        caps
    }

    /// Start a new session from setup
    ///
    /// Heart-rate samples received during setup are kept. Capabilities are
    /// only probed once the transition has been accepted.
    pub fn start_session(&mut self, config: SessionConfig) -> Result<Capabilities> {
        let requested = config.clone();

        self.shared.mutate(|state| {
            if state.phase != SessionPhase::Setup {
                return Err(Error::InvalidTransition {
                    from: state.phase,
                    action: "start",
                });
            }
            let heart_rate = std::mem::take(&mut state.heart_rate);
            *state = SessionState::new(config);
            state.heart_rate = heart_rate;
            state.phase = SessionPhase::Running;
            Ok(())
        })?;

        let caps = self.capabilities(&requested);
        tracing::info!("Session started");
        self.spawn_run(caps.voice_input);
        Ok(caps)
    }

    /// Stop the clock and the listener, keeping all totals
    pub fn pause_session(&mut self) -> Result<()> {
        self.stop_run("pause", &[SessionPhase::Running], SessionPhase::Paused)?;
        tracing::info!("Session paused");
        Ok(())
    }

    /// Restart the clock and the listener from where they stopped
    pub fn resume_session(&mut self) -> Result<()> {
        let voice_commands = self.shared.mutate(|state| {
            if state.phase != SessionPhase::Paused {
                return Err(Error::InvalidTransition {
                    from: state.phase,
                    action: "resume",
                });
            }
            state.phase = SessionPhase::Running;
            Ok(state.config.voice_commands_enabled)
        })?;

        tracing::info!("Session resumed");
        self.spawn_run(voice_commands && self.speech_input.is_available());
        Ok(())
    }

    /// Finish a running or paused session and return its summary
    pub fn end_session(&mut self) -> Result<SessionSummary> {
        self.stop_run(
            "end",
            &[SessionPhase::Running, SessionPhase::Paused],
            SessionPhase::Ended,
        )?;

        let summary = SessionSummary::from_state(&self.shared.snapshot());
        tracing::info!(
            "Session ended after {}: {:.0} kcal burned, {} fueling events",
            summary.duration,
            summary.calories_burned,
            summary.fueling_events
        );
        Ok(summary)
    }

    /// Return an ended session to setup, clearing every total
    pub fn reset_session(&mut self) -> Result<()> {
        self.shared.mutate(|state| {
            if state.phase != SessionPhase::Ended {
                return Err(Error::InvalidTransition {
                    from: state.phase,
                    action: "reset",
                });
            }
            *state = SessionState::default();
            Ok(())
        })?;

        tracing::info!("Session reset");
        Ok(())
    }

    /// Manually mark the pending alert as consumed
    ///
    /// Same effect as a voice confirmation, without the audible cue. Safe to
    /// call with nothing pending, or racing a voice confirmation: whichever
    /// runs second finds nothing to resolve.
    pub fn confirm_fueling(&self) -> Option<FuelingAlert> {
        let resolved = self.shared.mutate(|state| match state.phase {
            SessionPhase::Running | SessionPhase::Paused => state.resolve_pending(),
            SessionPhase::Setup | SessionPhase::Ended => None,
        });

        if resolved.is_none() {
            tracing::debug!("Manual confirmation with no pending alert");
        }
        resolved
    }

    fn spawn_run(&mut self, voice: bool) {
        let cancel = CancellationToken::new();

        let clock = tokio::spawn(run_clock(
            self.shared.clone(),
            self.announcer.clone(),
            cancel.clone(),
            self.timing.tick_interval,
        ));

        let voice = voice.then(|| {
            tokio::spawn(run_voice_loop(
                self.speech_input.clone(),
                self.shared.clone(),
                self.announcer.clone(),
                cancel.clone(),
                self.timing.voice,
            ))
        });

        self.run = Some(RunHandle {
            cancel,
            _clock: clock,
            _voice: voice,
        });
    }

    fn stop_run(
        &mut self,
        action: &'static str,
        allowed: &[SessionPhase],
        to: SessionPhase,
    ) -> Result<()> {
        let cancel = self.run.as_ref().map(|run| run.cancel.clone());

        self.shared.mutate(|state| {
            if !allowed.contains(&state.phase) {
                return Err(Error::InvalidTransition {
                    from: state.phase,
                    action,
                });
            }
            state.phase = to;
            if let Some(cancel) = &cancel {
                cancel.cancel();
            }
            Ok(())
        })?;

        self.run = None;
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(run) = self.run.take() {
            run.cancel.cancel();
        }
    }
}
