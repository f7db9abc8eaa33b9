//! Speech controller
//!
//! The one component the board's UI talks to. It owns the user's speech
//! settings, keeps at most one utterance in flight, and runs the failover
//! policy when the active backend reports an error.
//!
//! Backends report progress as [`BackendEvent`]s on a channel the
//! controller owns. The UI loop calls [`SpeechController::poll_events`]
//! to drain it. Every request carries a sequence number; events for
//! anything but the current request (cancelled or replaced utterances)
//! are dropped.

use crate::settings::{SettingsStore, SettingsUpdate, SpeechSettings};
use crate::speech::selector::{EngineSelector, EngineState, Failover};
use crate::speech::synth::{BackendEvent, BackendRole, EventKind, UtteranceRequest};
use crate::speech::voice::VoiceDescriptor;
use crate::Result;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use log::{debug, error, info, warn};
use rand::seq::IndexedRandom;
use std::time::{Duration, Instant};

/// Phrases `test()` picks from
pub const TEST_PHRASES: &[&str] = &[
    "안녕하세요. 음성 테스트입니다.",
    "물을 마시고 싶어요.",
    "화장실에 가고 싶어요.",
    "도와주세요.",
];

/// Immediate result of [`SpeechController::speak`]
#[derive(Debug, Clone, PartialEq)]
pub enum SpeakOutcome {
    /// Text was empty after trimming; nothing happened
    Ignored,
    /// Accepted by the active backend
    Dispatched { seq: u64, engine: BackendRole },
    /// Rejected by the preferred backend, accepted by the fallback
    FailedOver { seq: u64, to: BackendRole },
    /// Every backend that could take it failed
    Failed { seq: u64, reason: String },
    /// No backend can speak
    Unavailable,
}

/// Progress reported by [`SpeechController::poll_events`]
#[derive(Debug, Clone, PartialEq)]
pub enum SpeechNotice {
    Started { seq: u64 },
    Finished { seq: u64 },
    /// The utterance failed and was re-dispatched on the fallback
    FailedOver { seq: u64, to: BackendRole },
    /// Terminal failure of the utterance
    Failed { seq: u64, reason: String },
    /// A backend's voice catalog changed
    VoicesChanged,
}

/// Utterance the controller is waiting on
struct InFlight {
    request: UtteranceRequest,
    engine: BackendRole,
}

/// Text-to-speech front end for the board
pub struct SpeechController {
    selector: EngineSelector,
    store: Box<dyn SettingsStore>,
    settings: SpeechSettings,
    voice_hint: Option<String>,
    events_tx: Sender<BackendEvent>,
    events_rx: Receiver<BackendEvent>,
    last_seq: u64,
    in_flight: Option<InFlight>,
}

impl SpeechController {
    /// Load settings from `store` and initialize the selector
    ///
    /// Unreadable settings fall back to defaults; nothing here is fatal.
    pub fn new(store: Box<dyn SettingsStore>, mut selector: EngineSelector) -> Self {
        let settings = match store.load_settings() {
            Ok(settings) => {
                debug!("Speech settings loaded: {:?}", settings);
                settings
            }
            Err(e) => {
                warn!("Failed to load speech settings, using defaults: {}", e);
                SpeechSettings::default()
            }
        };

        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        selector.initialize(&events_tx);
        info!("Speech engine: {}", selector.engine_info());

        Self {
            selector,
            store,
            settings,
            voice_hint: None,
            events_tx,
            events_rx,
            last_seq: 0,
            in_flight: None,
        }
    }

    /// Speak `text`, replacing whatever is playing
    pub fn speak(&mut self, text: &str) -> SpeakOutcome {
        if text.trim().is_empty() {
            return SpeakOutcome::Ignored;
        }

        self.stop();

        let engine = match self.selector.active_role() {
            Some(engine) => engine,
            None => {
                warn!("Speech unavailable, dropping: {:?}", text);
                return SpeakOutcome::Unavailable;
            }
        };

        self.last_seq += 1;
        let request = UtteranceRequest::new(
            self.last_seq,
            text,
            self.voice_hint.clone(),
            self.settings,
        );
        info!("Speaking: {:?}", text);

        match self.selector.speak(&request, &self.events_tx) {
            Ok(()) => {
                let seq = request.seq;
                self.in_flight = Some(InFlight { request, engine });
                SpeakOutcome::Dispatched { seq, engine }
            }
            Err(e) => {
                warn!("{} rejected utterance {}: {}", engine, request.seq, e);
                self.fail_over(request, e.to_string())
            }
        }
    }

    /// Demote the active backend and retry `request` once if a fallback exists
    fn fail_over(&mut self, request: UtteranceRequest, reason: String) -> SpeakOutcome {
        let seq = request.seq;
        self.in_flight = None;

        if self.selector.mark_failed() == Failover::Exhausted {
            error!("Utterance {} failed: {}", seq, reason);
            return SpeakOutcome::Failed { seq, reason };
        }

        self.selector.warm_up_active(&self.events_tx);
        let to = BackendRole::Local;
        info!("Retrying utterance {} on {}", seq, self.selector.engine_info());

        match self.selector.speak(&request, &self.events_tx) {
            Ok(()) => {
                self.in_flight = Some(InFlight { request, engine: to });
                SpeakOutcome::FailedOver { seq, to }
            }
            Err(e) => {
                // The fallback failing is terminal for this call
                self.selector.mark_failed();
                error!("Utterance {} failed on fallback: {}", seq, e);
                SpeakOutcome::Failed {
                    seq,
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Cancel playback on both backends; safe when idle
    pub fn stop(&mut self) {
        if let Some(flight) = self.in_flight.take() {
            debug!("Stopping utterance {}", flight.request.seq);
        }
        self.selector.stop_all();
    }

    /// Drain backend events and apply them
    pub fn poll_events(&mut self) -> Vec<SpeechNotice> {
        let mut notices = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            if let Some(notice) = self.handle_event(event) {
                notices.push(notice);
            }
        }
        notices
    }

    /// Block until the current utterance ends or fails, or `timeout` passes
    ///
    /// Returns the notices seen while waiting.
    pub fn wait_idle(&mut self, timeout: Duration) -> Vec<SpeechNotice> {
        let deadline = Instant::now() + timeout;
        let mut notices = self.poll_events();

        while self.in_flight.is_some() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.events_rx.recv_timeout(remaining) {
                Ok(event) => {
                    if let Some(notice) = self.handle_event(event) {
                        notices.push(notice);
                    }
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        notices
    }

    fn is_current(&self, event: &BackendEvent) -> bool {
        self.in_flight
            .as_ref()
            .map_or(false, |flight| flight.request.seq == event.seq && flight.engine == event.role)
    }

    fn handle_event(&mut self, event: BackendEvent) -> Option<SpeechNotice> {
        if event.kind == EventKind::CatalogReady {
            debug!("{} voice catalog ready", event.role);
            return Some(SpeechNotice::VoicesChanged);
        }

        if !self.is_current(&event) {
            debug!("Discarding stale {:?} for utterance {}", event.kind, event.seq);
            return None;
        }

        let seq = event.seq;
        match event.kind {
            EventKind::Started => {
                debug!("{} started speaking utterance {}", event.role, seq);
                Some(SpeechNotice::Started { seq })
            }
            EventKind::Ended => {
                debug!("{} finished speaking utterance {}", event.role, seq);
                self.in_flight = None;
                Some(SpeechNotice::Finished { seq })
            }
            EventKind::Error(reason) => {
                warn!("{} error on utterance {}: {}", event.role, seq, reason);
                let flight = self.in_flight.take()?;
                match self.fail_over(flight.request, reason) {
                    SpeakOutcome::FailedOver { seq, to } => Some(SpeechNotice::FailedOver { seq, to }),
                    SpeakOutcome::Failed { seq, reason } => Some(SpeechNotice::Failed { seq, reason }),
                    _ => None,
                }
            }
            EventKind::CatalogReady => None,
        }
    }

    /// Set speech rate and persist it
    pub fn set_rate(&mut self, rate: f32) -> Result<()> {
        self.settings.rate = rate;
        self.store.save_settings(&self.settings)
    }

    /// Set speech pitch and persist it
    pub fn set_pitch(&mut self, pitch: f32) -> Result<()> {
        self.settings.pitch = pitch;
        self.store.save_settings(&self.settings)
    }

    /// Merge a partial update and persist the result
    pub fn update_settings(&mut self, update: SettingsUpdate) -> Result<()> {
        self.settings.apply(update);
        self.store.save_settings(&self.settings)
    }

    /// Current settings
    pub fn settings(&self) -> SpeechSettings {
        self.settings
    }

    /// Voice to ask backends for (id or name); `None` restores automatic selection
    pub fn set_voice(&mut self, voice: Option<&str>) {
        self.voice_hint = voice.map(str::to_string);
    }

    /// Voices the active backend offers for the board's locale
    pub fn available_voices(&self) -> Vec<VoiceDescriptor> {
        self.selector.list_voices()
    }

    /// Re-read the platform voice catalog after the platform announced a change
    pub fn refresh_voices(&mut self) -> Result<()> {
        self.selector.refresh_local_voices(&self.events_tx)
    }

    /// Label of the active backend
    pub fn engine_info(&self) -> String {
        self.selector.engine_info()
    }

    /// Which backend is authoritative; only ever moves toward `Unavailable`
    pub fn engine_state(&self) -> EngineState {
        self.selector.state()
    }

    /// Speak a random test phrase
    pub fn test(&mut self) -> SpeakOutcome {
        let phrase = TEST_PHRASES
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or(TEST_PHRASES[0]);
        self.speak(phrase)
    }
}
