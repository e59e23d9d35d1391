//! Core domain types for the Top-up ride session engine.
//!
//! This module defines the fundamental types used throughout the system:
//! - Intensity presets and the rider's heart-rate profile
//! - Session configuration and lifecycle phase
//! - Fueling alerts and the countdown shown between them

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Intensity Presets
// ============================================================================

/// Workout intensity chosen before the session starts
///
/// Variants are ordered by effort; MET values strictly increase in this order.
#[derive(
    Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum IntensityPreset {
    Recovery,
    #[default]
    Moderate,
    Tempo,
    Hard,
    Race,
}

impl IntensityPreset {
    /// All presets, lowest effort first
    pub const ALL: [IntensityPreset; 5] = [
        IntensityPreset::Recovery,
        IntensityPreset::Moderate,
        IntensityPreset::Tempo,
        IntensityPreset::Hard,
        IntensityPreset::Race,
    ];

    /// Metabolic equivalent of the preset
    pub fn met(self) -> f64 {
        match self {
            IntensityPreset::Recovery => 4.0,
            IntensityPreset::Moderate => 8.0,
            IntensityPreset::Tempo => 10.0,
            IntensityPreset::Hard => 12.0,
            IntensityPreset::Race => 14.0,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            IntensityPreset::Recovery => "Recovery",
            IntensityPreset::Moderate => "Moderate",
            IntensityPreset::Tempo => "Tempo",
            IntensityPreset::Hard => "Hard",
            IntensityPreset::Race => "Race",
        }
    }

    /// Target heart rate as a percentage of maximum
    pub fn target_hr_percent(self) -> u8 {
        match self {
            IntensityPreset::Recovery => 60,
            IntensityPreset::Moderate => 70,
            IntensityPreset::Tempo => 80,
            IntensityPreset::Hard => 85,
            IntensityPreset::Race => 90,
        }
    }

    fn key(self) -> &'static str {
        match self {
            IntensityPreset::Recovery => "recovery",
            IntensityPreset::Moderate => "moderate",
            IntensityPreset::Tempo => "tempo",
            IntensityPreset::Hard => "hard",
            IntensityPreset::Race => "race",
        }
    }
}

impl fmt::Display for IntensityPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for IntensityPreset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        IntensityPreset::ALL
            .into_iter()
            .find(|p| p.key() == wanted)
            .ok_or_else(|| {
                Error::Config(format!(
                    "Unknown intensity preset '{}' (expected recovery, moderate, tempo, hard or race)",
                    s
                ))
            })
    }
}

// ============================================================================
// Rider Configuration
// ============================================================================

/// Resting and maximum heart rate used to normalise effort
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HeartRateProfile {
    pub resting_bpm: u16,
    pub max_bpm: u16,
}

impl Default for HeartRateProfile {
    fn default() -> Self {
        Self {
            resting_bpm: 60,
            max_bpm: 190,
        }
    }
}

/// Immutable configuration captured when a session starts
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    /// Body weight in kilograms (expected 40-150)
    pub weight_kg: f64,
    pub preset: IntensityPreset,
    /// Calories eaten before the session
    pub pre_session_kcal: f64,
    pub voice_alerts_enabled: bool,
    pub voice_commands_enabled: bool,
    #[serde(default)]
    pub heart_rate: HeartRateProfile,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            weight_kg: 75.0,
            preset: IntensityPreset::Moderate,
            pre_session_kcal: 0.0,
            voice_alerts_enabled: true,
            voice_commands_enabled: true,
            heart_rate: HeartRateProfile::default(),
        }
    }
}

impl SessionConfig {
    pub const MIN_WEIGHT_KG: f64 = 40.0;
    pub const MAX_WEIGHT_KG: f64 = 150.0;

    /// Check the documented plausible ranges
    ///
    /// The engine never calls this; it is offered to front ends that want to
    /// reject implausible input before starting a session.
    pub fn validate(&self) -> Result<()> {
        if !(Self::MIN_WEIGHT_KG..=Self::MAX_WEIGHT_KG).contains(&self.weight_kg) {
            return Err(Error::Config(format!(
                "Weight {} kg is outside the plausible range {}-{} kg",
                self.weight_kg,
                Self::MIN_WEIGHT_KG,
                Self::MAX_WEIGHT_KG
            )));
        }

        if self.pre_session_kcal.is_nan() || self.pre_session_kcal < 0.0 {
            return Err(Error::Config(format!(
                "Pre-session intake must be non-negative, got {}",
                self.pre_session_kcal
            )));
        }

        if self.heart_rate.resting_bpm >= self.heart_rate.max_bpm {
            return Err(Error::Config(format!(
                "Resting heart rate ({}) must be below maximum heart rate ({})",
                self.heart_rate.resting_bpm, self.heart_rate.max_bpm
            )));
        }

        Ok(())
    }
}

// ============================================================================
// Session Lifecycle
// ============================================================================

/// Lifecycle phase: setup -> running <-> paused -> ended -> setup
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Setup,
    Running,
    Paused,
    Ended,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Setup => "in setup",
            SessionPhase::Running => "running",
            SessionPhase::Paused => "paused",
            SessionPhase::Ended => "ended",
        };
        f.write_str(name)
    }
}

/// What the environment can actually do, reported once at session start
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Capabilities {
    /// A speech recogniser is available and voice commands were requested
    pub voice_input: bool,
    /// Spoken announcements can be rendered
    pub speech_output: bool,
}

// ============================================================================
// Fueling Types
// ============================================================================

/// A recommendation to eat, pending until confirmed
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FuelingAlert {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    /// Elapsed session seconds when the alert fired
    pub elapsed_seconds: u64,
    /// Calories burned since the previous fueling event, rounded
    pub calories: u32,
    /// Recommended carbohydrate dose in grams (30-80)
    pub carbs: u32,
    pub message: String,
}

/// Calories left before the scheduler will consider firing
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "until", content = "kcal", rename_all = "snake_case")]
pub enum FuelingCountdown {
    /// The first alert of the session has not fired yet
    UntilFirst(f64),
    /// Counting down the interval since the last fueling event
    UntilNext(f64),
}

impl FuelingCountdown {
    pub fn kcal(self) -> f64 {
        match self {
            FuelingCountdown::UntilFirst(kcal) | FuelingCountdown::UntilNext(kcal) => kcal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_met_strictly_increases() {
        let mets: Vec<f64> = IntensityPreset::ALL.iter().map(|p| p.met()).collect();
        assert!(mets.windows(2).all(|w| w[0] < w[1]), "{:?}", mets);
    }

    #[test]
    fn test_preset_parse() {
        assert_eq!("tempo".parse::<IntensityPreset>().unwrap(), IntensityPreset::Tempo);
        assert_eq!(" RACE ".parse::<IntensityPreset>().unwrap(), IntensityPreset::Race);
        assert!("sprint".parse::<IntensityPreset>().is_err());
    }

    #[test]
    fn test_preset_display_roundtrip() {
        for preset in IntensityPreset::ALL {
            assert_eq!(preset.to_string().parse::<IntensityPreset>().unwrap(), preset);
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(SessionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_implausible_weight() {
        let config = SessionConfig {
            weight_kg: 12.0,
            ..SessionConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_negative_intake() {
        let config = SessionConfig {
            pre_session_kcal: -5.0,
            ..SessionConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_hr_profile() {
        let config = SessionConfig {
            heart_rate: HeartRateProfile {
                resting_bpm: 190,
                max_bpm: 60,
            },
            ..SessionConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_countdown_serializes_tagged() {
        let json = serde_json::to_string(&FuelingCountdown::UntilNext(42.0)).unwrap();
        assert_eq!(json, r#"{"until":"until_next","kcal":42.0}"#);
    }
}
