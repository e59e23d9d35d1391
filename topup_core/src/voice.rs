//! Voice confirmation loop.
//!
//! A self-healing listener: while the session runs with voice commands on, it
//! consumes recognised utterances and resolves the pending fueling alert when
//! it hears a confirmation phrase. When the recogniser stops on its own it is
//! restarted after a fixed backoff. Every wait races the session's
//! cancellation token, so nothing fires after a pause or end.

use crate::audio::Announcer;
use crate::state::SharedState;
use crate::{Error, FuelingAlert, Result, SessionPhase};
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Phrases that confirm the pending alert, matched as lowercase substrings
pub const CONFIRMATION_PHRASES: [&str; 4] = ["topped up", "top up", "topped", "top it up"];

/// One result from the speech recogniser
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Recognition {
    /// Final transcript of a single utterance
    Transcript(String),
    /// The recogniser heard nothing; not a failure
    NoSpeech,
    /// Any other recogniser error
    Error(String),
}

/// Speech-to-text source
///
/// Each call to `listen` opens one listening session whose stream yields
/// results until the recogniser stops (timeout, disconnect) and the stream ends.
pub trait SpeechInput: Send + Sync {
    fn is_available(&self) -> bool {
        true
    }

    fn listen(&self) -> Result<BoxStream<'static, Recognition>>;
}

/// Speech input for environments without a recogniser
#[derive(Clone, Copy, Debug, Default)]
pub struct NoSpeechInput;

impl SpeechInput for NoSpeechInput {
    fn is_available(&self) -> bool {
        false
    }

    fn listen(&self) -> Result<BoxStream<'static, Recognition>> {
        Err(Error::Speech("speech recognition is not available".into()))
    }
}

/// Whether a transcript contains a confirmation phrase
pub fn is_confirmation(transcript: &str) -> bool {
    let normalized = transcript.trim().to_lowercase();
    CONFIRMATION_PHRASES
        .iter()
        .any(|phrase| normalized.contains(phrase))
}

/// Delays of the listener lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VoiceTiming {
    /// Wait after start/resume before the first listen
    pub start_delay: Duration,
    /// Wait before restarting a listener that stopped on its own
    pub restart_backoff: Duration,
}

impl Default for VoiceTiming {
    fn default() -> Self {
        Self {
            start_delay: Duration::from_secs(1),
            restart_backoff: Duration::from_secs(1),
        }
    }
}

/// Sleep for `delay` unless cancelled first; returns false on cancellation
async fn wait_or_cancel(delay: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

/// Run the listener until `cancel` fires
pub(crate) async fn run_voice_loop(
    input: Arc<dyn SpeechInput>,
    shared: Arc<SharedState>,
    announcer: Announcer,
    cancel: CancellationToken,
    timing: VoiceTiming,
) {
    if !wait_or_cancel(timing.start_delay, &cancel).await {
        return;
    }

    let mut start_failures = 0u32;

    loop {
        match input.listen() {
            Ok(mut results) => {
                start_failures = 0;
                tracing::debug!("Voice listener started");
                loop {
                    let next = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            tracing::debug!("Voice listener stopped");
                            return;
                        }
                        next = results.next() => next,
                    };

                    match next {
                        Some(Recognition::Transcript(text)) => {
                            handle_transcript(&text, &shared, &announcer, &cancel);
                        }
                        Some(Recognition::NoSpeech) => tracing::trace!("No speech detected"),
                        Some(Recognition::Error(e)) => tracing::warn!("Speech recognition error: {}", e),
                        None => break,
                    }
                }
                tracing::debug!(
                    "Voice listener ended, restarting in {:?}",
                    timing.restart_backoff
                );
            }
            Err(e) => {
                start_failures += 1;
                if start_failures == 1 {
                    tracing::warn!(
                        "Voice listener failed to start: {}. Retrying every {:?}",
                        e,
                        timing.restart_backoff
                    );
                } else {
                    tracing::debug!("Voice listener restart {} failed: {}", start_failures, e);
                }
            }
        }

        if !wait_or_cancel(timing.restart_backoff, &cancel).await {
            return;
        }
    }
}

/// Resolve the pending alert if `text` is a confirmation
fn handle_transcript(
    text: &str,
    shared: &SharedState,
    announcer: &Announcer,
    cancel: &CancellationToken,
) -> Option<FuelingAlert> {
    if !is_confirmation(text) {
        tracing::trace!("Ignoring utterance: {:?}", text);
        return None;
    }

    let (resolved, voice_alerts) = shared.mutate(|state| {
        if cancel.is_cancelled() || state.phase != SessionPhase::Running {
            return (None, false);
        }
        (state.resolve_pending(), state.config.voice_alerts_enabled)
    });

    match resolved {
        Some(alert) => {
            announcer.acknowledge_fueling(voice_alerts);
            Some(alert)
        }
        None => {
            tracing::debug!("Confirmation heard with no pending alert");
            None
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use futures_util::stream;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Plays back one scripted listening session per `listen` call
    #[derive(Default)]
    pub(crate) struct ScriptedSpeech {
        sessions: Mutex<VecDeque<Vec<Recognition>>>,
        listens: AtomicUsize,
        availability_checks: AtomicUsize,
        failing_starts: AtomicUsize,
        available: bool,
    }

    impl ScriptedSpeech {
        pub(crate) fn new(sessions: Vec<Vec<Recognition>>) -> Self {
            Self {
                sessions: Mutex::new(sessions.into()),
                available: true,
                ..Self::default()
            }
        }

        /// The first `failures` calls to `listen` fail to start
        pub(crate) fn failing_first(failures: usize, sessions: Vec<Vec<Recognition>>) -> Self {
            let speech = Self::new(sessions);
            speech.failing_starts.store(failures, Ordering::SeqCst);
            speech
        }

        pub(crate) fn unavailable() -> Self {
            Self::default()
        }

        pub(crate) fn listens(&self) -> usize {
            self.listens.load(Ordering::SeqCst)
        }

        pub(crate) fn availability_checks(&self) -> usize {
            self.availability_checks.load(Ordering::SeqCst)
        }
    }

    impl SpeechInput for ScriptedSpeech {
        fn is_available(&self) -> bool {
            self.availability_checks.fetch_add(1, Ordering::SeqCst);
            self.available
        }

        fn listen(&self) -> Result<BoxStream<'static, Recognition>> {
            self.listens.fetch_add(1, Ordering::SeqCst);

            let failing = self
                .failing_starts
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(Error::Speech("microphone busy".into()));
            }

            let script = self.sessions.lock().unwrap().pop_front().unwrap_or_default();
            Ok(stream::iter(script).boxed())
        }
    }
}
