#![forbid(unsafe_code)]

//! Core engine for the Top-up ride fueling system.
//!
//! This crate provides:
//! - Domain types (presets, session config, fueling alerts)
//! - Energy model and adaptive fueling scheduler
//! - Session clock and voice confirmation loop
//! - Session lifecycle state machine
//! - Configuration and logging

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod energy;
pub mod scheduler;
pub mod heart_rate;
pub mod state;
pub mod audio;
pub mod voice;
pub mod clock;
pub mod session;
pub mod summary;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use energy::{base_calories_per_minute, hr_adjusted_calories_per_minute};
pub use scheduler::{FuelingScheduler, FuelingThresholds};
pub use heart_rate::{HeartRateFeed, HeartRateWindow};
pub use state::SessionState;
pub use audio::{Announcer, SilentAudio, SpeechSink, ToneSink};
pub use voice::{NoSpeechInput, Recognition, SpeechInput, VoiceTiming};
pub use session::{EngineTiming, Session};
pub use summary::{format_elapsed, SessionSummary};
