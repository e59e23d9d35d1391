//! Audio output boundaries.
//!
//! Two fire-and-forget sinks: a short alert tone and spoken text. The actual
//! devices are external; the engine only decides when and what to announce.

use crate::FuelingAlert;
use std::sync::Arc;

/// Plays the short alert tone
pub trait ToneSink: Send + Sync {
    fn play_alert_tone(&self);
}

/// Renders text as speech
///
/// A new request supersedes any announcement still in flight.
pub trait SpeechSink: Send + Sync {
    fn is_available(&self) -> bool {
        true
    }

    fn speak(&self, text: &str);
}

/// Sink for environments without audio output
#[derive(Clone, Copy, Debug, Default)]
pub struct SilentAudio;

impl ToneSink for SilentAudio {
    fn play_alert_tone(&self) {}
}

impl SpeechSink for SilentAudio {
    fn is_available(&self) -> bool {
        false
    }

    fn speak(&self, _text: &str) {}
}

pub const CONFIRMATION_SPEECH: &str = "Confirmed. Fueling logged.";

/// On-screen text of a fueling alert
pub fn alert_message(carbs: u32) -> String {
    format!("Time to fuel! Take {}g carbs", carbs)
}

/// Spoken form of a fueling alert
pub fn spoken_alert(carbs: u32) -> String {
    format!("Time to fuel. Take {} grams of carbs.", carbs)
}

/// Routes engine events to the tone and speech sinks
#[derive(Clone)]
pub struct Announcer {
    tone: Arc<dyn ToneSink>,
    speech: Arc<dyn SpeechSink>,
}

impl Announcer {
    pub fn new(tone: Arc<dyn ToneSink>, speech: Arc<dyn SpeechSink>) -> Self {
        Self { tone, speech }
    }

    pub fn silent() -> Self {
        Self::new(Arc::new(SilentAudio), Arc::new(SilentAudio))
    }

    pub fn speech_available(&self) -> bool {
        self.speech.is_available()
    }

    /// Tone once, plus the spoken dose when voice alerts are on
    pub fn announce_alert(&self, alert: &FuelingAlert, voice_alerts: bool) {
        self.tone.play_alert_tone();
        if voice_alerts {
            self.speech.speak(&spoken_alert(alert.carbs));
        }
    }

    /// Audible acknowledgement of a voice confirmation
    pub fn acknowledge_fueling(&self, voice_alerts: bool) {
        self.tone.play_alert_tone();
        if voice_alerts {
            self.speech.speak(CONFIRMATION_SPEECH);
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub(crate) enum Cue {
        Tone,
        Speech(String),
    }

    /// Records every cue for assertions
    #[derive(Default)]
    pub(crate) struct RecordingAudio {
        cues: Mutex<Vec<Cue>>,
    }

    impl RecordingAudio {
        pub(crate) fn cues(&self) -> Vec<Cue> {
            self.cues.lock().unwrap().clone()
        }

        pub(crate) fn announcer(self: &Arc<Self>) -> Announcer {
            Announcer::new(self.clone(), self.clone())
        }
    }

    impl ToneSink for RecordingAudio {
        fn play_alert_tone(&self) {
            self.cues.lock().unwrap().push(Cue::Tone);
        }
    }

    impl SpeechSink for RecordingAudio {
        fn speak(&self, text: &str) {
            self.cues.lock().unwrap().push(Cue::Speech(text.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{Cue, RecordingAudio};
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn alert(carbs: u32) -> FuelingAlert {
        FuelingAlert {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            elapsed_seconds: 0,
            calories: 300,
            carbs,
            message: alert_message(carbs),
        }
    }

    #[test]
    fn test_messages() {
        assert_eq!(alert_message(45), "Time to fuel! Take 45g carbs");
        assert_eq!(spoken_alert(45), "Time to fuel. Take 45 grams of carbs.");
    }

    #[test]
    fn test_announce_with_voice_alerts() {
        let audio = Arc::new(RecordingAudio::default());
        audio.announcer().announce_alert(&alert(40), true);

        assert_eq!(
            audio.cues(),
            vec![
                Cue::Tone,
                Cue::Speech("Time to fuel. Take 40 grams of carbs.".into())
            ]
        );
    }

    #[test]
    fn test_announce_tone_only_when_voice_alerts_off() {
        let audio = Arc::new(RecordingAudio::default());
        let announcer = audio.announcer();
        announcer.announce_alert(&alert(40), false);
        announcer.acknowledge_fueling(false);

        assert_eq!(audio.cues(), vec![Cue::Tone, Cue::Tone]);
    }

    #[test]
    fn test_silent_audio_reports_no_speech() {
        assert!(!Announcer::silent().speech_available());
    }
}
