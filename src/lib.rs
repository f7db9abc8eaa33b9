//! aacboard - speech output for an assistive communication board
//!
//! Tapped symbol cards compose a sentence; this crate speaks it. Speech goes
//! through a preferred voice service when one is installed and falls back to
//! the platform speech API once if the service fails.

pub mod config;
pub mod error;
pub mod settings;
pub mod speech;

pub use error::{AacError, Result};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = "aacspeak";
