//! Error types for the speech subsystem

use std::io;
use thiserror::Error;

/// Main error type for aacboard
#[derive(Error, Debug)]
pub enum AacError {
    #[error("Nothing to speak")]
    EmptyInput,

    #[error("No speech backend available: {0}")]
    BackendUnavailable(String),

    #[error("Speech playback error: {0}")]
    Playback(String),

    #[error("Failed to persist settings: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("INI parse error: {0}")]
    IniParse(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for aacboard operations
pub type Result<T> = std::result::Result<T, AacError>;

impl From<String> for AacError {
    fn from(s: String) -> Self {
        AacError::Other(s)
    }
}

impl From<&str> for AacError {
    fn from(s: &str) -> Self {
        AacError::Other(s.to_string())
    }
}
