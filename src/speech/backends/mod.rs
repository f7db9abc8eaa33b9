//! Concrete speech backends

// Platform speech API through the tts crate (fallback)
pub mod native;

// External voice service program (preferred)
pub mod service;
