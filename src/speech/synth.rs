//! Speech backend abstraction
//!
//! Both concrete backends (the voice service and the platform speech API)
//! implement [`Synth`]. Playback is asynchronous: a backend accepts an
//! utterance and later reports how it went as a [`BackendEvent`] tagged
//! with the utterance's sequence number.

use crate::settings::SpeechSettings;
use crate::speech::voice::VoiceDescriptor;
use crate::Result;
use crossbeam_channel::Sender;
use std::fmt;

/// Language tag every utterance is spoken in
pub const TARGET_LANG: &str = "ko-KR";

/// Channel backends report playback progress on
pub type EventSender = Sender<BackendEvent>;

/// Which slot a backend fills in the failover order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendRole {
    /// Hosted voice service, tried first
    Service,
    /// Platform speech API, used when the service is missing or fails
    Local,
}

impl fmt::Display for BackendRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendRole::Service => write!(f, "service"),
            BackendRole::Local => write!(f, "local"),
        }
    }
}

/// One utterance handed to a backend
#[derive(Debug, Clone, PartialEq)]
pub struct UtteranceRequest {
    /// Monotonic per-controller sequence number
    pub seq: u64,
    pub text: String,
    /// Voice id or name the user picked; `None` lets the backend choose
    pub voice_hint: Option<String>,
    /// Settings snapshot taken when the request was built
    pub settings: SpeechSettings,
    pub volume: f32,
    pub lang: &'static str,
}

impl UtteranceRequest {
    pub fn new(seq: u64, text: &str, voice_hint: Option<String>, settings: SpeechSettings) -> Self {
        Self {
            seq,
            text: text.to_string(),
            voice_hint,
            settings,
            volume: 1.0,
            lang: TARGET_LANG,
        }
    }
}

/// What happened to an utterance (or a backend's catalog)
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Started,
    Ended,
    Error(String),
    /// Voice catalog finished loading; `seq` is meaningless
    CatalogReady,
}

/// Progress report sent by a backend
#[derive(Debug, Clone, PartialEq)]
pub struct BackendEvent {
    pub role: BackendRole,
    pub seq: u64,
    pub kind: EventKind,
}

impl BackendEvent {
    pub fn started(role: BackendRole, seq: u64) -> Self {
        Self { role, seq, kind: EventKind::Started }
    }

    pub fn ended(role: BackendRole, seq: u64) -> Self {
        Self { role, seq, kind: EventKind::Ended }
    }

    pub fn error(role: BackendRole, seq: u64, reason: impl Into<String>) -> Self {
        Self {
            role,
            seq,
            kind: EventKind::Error(reason.into()),
        }
    }

    pub fn catalog_ready(role: BackendRole) -> Self {
        Self {
            role,
            seq: 0,
            kind: EventKind::CatalogReady,
        }
    }
}

/// Speech backend trait
///
/// `speak` must not block until playback ends. An `Err` from `speak` means
/// the backend rejected the utterance outright; failures after acceptance
/// arrive as [`EventKind::Error`] events.
pub trait Synth {
    /// Slot this backend fills
    fn role(&self) -> BackendRole;

    /// Human-readable backend name
    fn name(&self) -> &str;

    /// Prepare the backend after selection; must not block on audio
    fn warm_up(&mut self, events: &EventSender) -> Result<()>;

    /// Start speaking a request; blank text is `AacError::EmptyInput`
    fn speak(&mut self, request: &UtteranceRequest, events: &EventSender) -> Result<()>;

    /// Cancel/silence current speech; fine to call when idle
    fn cancel(&mut self) -> Result<()>;

    /// Voices this backend can speak with (may be empty until the catalog is ready)
    fn voices(&self) -> Vec<VoiceDescriptor>;

    /// Re-read the voice catalog
    fn refresh_voices(&mut self, _events: &EventSender) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request = UtteranceRequest::new(7, "물 주세요", None, SpeechSettings::default());
        assert_eq!(request.seq, 7);
        assert_eq!(request.volume, 1.0);
        assert_eq!(request.lang, "ko-KR");
    }

    #[test]
    fn test_catalog_event_has_no_sequence() {
        let event = BackendEvent::catalog_ready(BackendRole::Local);
        assert_eq!(event.seq, 0);
        assert_eq!(event.kind, EventKind::CatalogReady);
    }
}
