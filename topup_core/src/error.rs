//! Error types for the topup_core library.

use crate::SessionPhase;
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for topup_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session lifecycle action not allowed from the current phase
    #[error("Cannot {action} a session that is {from}")]
    InvalidTransition {
        from: SessionPhase,
        action: &'static str,
    },

    /// Speech input could not start listening
    #[error("Speech input error: {0}")]
    Speech(String),
}
