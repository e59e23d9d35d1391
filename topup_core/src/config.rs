//! Configuration file support for Top-up.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/topup/config.toml`.

use crate::session::EngineTiming;
use crate::voice::VoiceTiming;
use crate::{Error, HeartRateProfile, IntensityPreset, Result, SessionConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub rider: RiderConfig,

    #[serde(default)]
    pub heart_rate: HeartRateConfig,

    #[serde(default)]
    pub voice: VoiceConfig,

    #[serde(default)]
    pub clock: ClockConfig,
}

/// Rider defaults used when the command line does not override them
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RiderConfig {
    #[serde(default = "default_weight_kg")]
    pub weight_kg: f64,

    #[serde(default)]
    pub preset: IntensityPreset,

    #[serde(default)]
    pub pre_session_kcal: f64,
}

impl Default for RiderConfig {
    fn default() -> Self {
        Self {
            weight_kg: default_weight_kg(),
            preset: IntensityPreset::default(),
            pre_session_kcal: 0.0,
        }
    }
}

/// Heart-rate reserve bounds
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HeartRateConfig {
    #[serde(default = "default_resting_bpm")]
    pub resting_bpm: u16,

    #[serde(default = "default_max_bpm")]
    pub max_bpm: u16,
}

impl Default for HeartRateConfig {
    fn default() -> Self {
        Self {
            resting_bpm: default_resting_bpm(),
            max_bpm: default_max_bpm(),
        }
    }
}

/// Spoken alerts and voice confirmation
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VoiceConfig {
    #[serde(default = "default_true")]
    pub alerts_enabled: bool,

    #[serde(default = "default_true")]
    pub commands_enabled: bool,

    #[serde(default = "default_voice_delay_ms")]
    pub start_delay_ms: u64,

    #[serde(default = "default_voice_delay_ms")]
    pub restart_backoff_ms: u64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            alerts_enabled: true,
            commands_enabled: true,
            start_delay_ms: default_voice_delay_ms(),
            restart_backoff_ms: default_voice_delay_ms(),
        }
    }
}

/// Session clock pacing
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ClockConfig {
    /// Wall-clock milliseconds per simulated second
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

// Default value functions
fn default_weight_kg() -> f64 {
    75.0
}

fn default_resting_bpm() -> u16 {
    HeartRateProfile::default().resting_bpm
}

fn default_max_bpm() -> u16 {
    HeartRateProfile::default().max_bpm
}

fn default_true() -> bool {
    true
}

fn default_voice_delay_ms() -> u64 {
    1000
}

fn default_tick_interval_ms() -> u64 {
    1000
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let Some(config_path) = Self::default_config_path() else {
            tracing::info!("No config directory available, using defaults");
            return Ok(Self::default());
        };

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|base| base.join("topup").join("config.toml"))
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Session configuration from the rider, heart-rate and voice sections
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            weight_kg: self.rider.weight_kg,
            preset: self.rider.preset,
            pre_session_kcal: self.rider.pre_session_kcal,
            voice_alerts_enabled: self.voice.alerts_enabled,
            voice_commands_enabled: self.voice.commands_enabled,
            heart_rate: HeartRateProfile {
                resting_bpm: self.heart_rate.resting_bpm,
                max_bpm: self.heart_rate.max_bpm,
            },
        }
    }

    pub fn engine_timing(&self) -> EngineTiming {
        EngineTiming {
            tick_interval: Duration::from_millis(self.clock.tick_interval_ms.max(1)),
            voice: VoiceTiming {
                start_delay: Duration::from_millis(self.voice.start_delay_ms),
                restart_backoff: Duration::from_millis(self.voice.restart_backoff_ms),
            },
        }
    }
}
