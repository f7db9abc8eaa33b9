//! Engine selection and one-shot failover
//!
//! Holds at most one backend per role and decides which one is
//! authoritative. The order is fixed: the voice service first, the
//! platform speech API second. The state only ever moves forward:
//!
//! ```text
//! PreferredActive ──error──▶ FallbackActive ──error──▶ Unavailable
//!        └──────────── error, no fallback ────────────────▲
//! ```
//!
//! There is no recovery probing; once demoted, the service stays unused
//! for the rest of the session.

use crate::config::EngineOptions;
use crate::speech::backends::native::NativeSynth;
use crate::speech::backends::service::ServiceSynth;
use crate::speech::synth::{BackendRole, EventSender, Synth, UtteranceRequest};
use crate::speech::voice::VoiceDescriptor;
use crate::{AacError, Result};
use log::{debug, info, warn};
use std::fmt;

/// Which backend is currently authoritative
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// The voice service speaks
    PreferredActive,
    /// The platform speech API speaks
    FallbackActive,
    /// Nothing can speak; `speak` is a no-op
    Unavailable,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineState::PreferredActive => write!(f, "preferred"),
            EngineState::FallbackActive => write!(f, "fallback"),
            EngineState::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// What the controller should do after a backend failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failover {
    /// Switched to the fallback; re-dispatch the failed utterance once
    Retry,
    /// No backend left; the failure is terminal
    Exhausted,
}

/// Picks and fronts the active speech backend
pub struct EngineSelector {
    service: Option<Box<dyn Synth>>,
    local: Option<Box<dyn Synth>>,
    state: EngineState,
}

impl EngineSelector {
    /// Build from already-constructed backends
    ///
    /// State stays `Unavailable` until [`initialize`](Self::initialize).
    pub fn new(service: Option<Box<dyn Synth>>, local: Option<Box<dyn Synth>>) -> Self {
        Self {
            service,
            local,
            state: EngineState::Unavailable,
        }
    }

    /// Probe the environment for both backends
    ///
    /// The voice service is probed only when preferred; the platform
    /// speech API is always attempted. Missing backends are logged, not errors.
    pub fn detect(options: &EngineOptions) -> Self {
        let service: Option<Box<dyn Synth>> = if options.prefer_service {
            info!("Trying voice service backend ({})...", options.service_program);
            match ServiceSynth::probe(&options.service_program) {
                Ok(synth) => {
                    info!("✓ Voice service available");
                    Some(Box::new(synth))
                }
                Err(e) => {
                    info!("✗ Voice service unavailable: {}", e);
                    None
                }
            }
        } else {
            debug!("Voice service disabled by configuration");
            None
        };

        info!("Trying platform speech backend...");
        let local: Option<Box<dyn Synth>> = match NativeSynth::new(&options.locale) {
            Ok(synth) => {
                info!("✓ Platform speech available");
                Some(Box::new(synth))
            }
            Err(e) => {
                info!("✗ Platform speech unavailable: {}", e);
                None
            }
        };

        Self::new(service, local)
    }

    /// Choose the starting backend and warm it up
    pub fn initialize(&mut self, events: &EventSender) {
        self.state = if self.service.is_some() {
            info!("Voice service selected (optimized for Korean)");
            EngineState::PreferredActive
        } else if self.local.is_some() {
            info!("Voice service not present, using platform speech");
            EngineState::FallbackActive
        } else {
            warn!("No speech backend available");
            EngineState::Unavailable
        };

        self.warm_up_active(events);
    }

    /// Current engine state
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Role of the backend that speaks right now
    pub fn active_role(&self) -> Option<BackendRole> {
        match self.state {
            EngineState::PreferredActive => Some(BackendRole::Service),
            EngineState::FallbackActive => Some(BackendRole::Local),
            EngineState::Unavailable => None,
        }
    }

    fn active_mut(&mut self) -> Option<&mut (dyn Synth + 'static)> {
        match self.state {
            EngineState::PreferredActive => self.service.as_deref_mut(),
            EngineState::FallbackActive => self.local.as_deref_mut(),
            EngineState::Unavailable => None,
        }
    }

    fn active(&self) -> Option<&(dyn Synth + 'static)> {
        match self.state {
            EngineState::PreferredActive => self.service.as_deref(),
            EngineState::FallbackActive => self.local.as_deref(),
            EngineState::Unavailable => None,
        }
    }

    /// Record a failure of the active backend and demote it
    pub fn mark_failed(&mut self) -> Failover {
        match self.state {
            EngineState::PreferredActive if self.local.is_some() => {
                warn!("Voice service failed, switching to platform speech for this session");
                self.state = EngineState::FallbackActive;
                Failover::Retry
            }
            EngineState::PreferredActive | EngineState::FallbackActive => {
                warn!("Last speech backend failed, speech is now unavailable");
                self.state = EngineState::Unavailable;
                Failover::Exhausted
            }
            EngineState::Unavailable => Failover::Exhausted,
        }
    }

    /// Warm up whichever backend is active now (again after a failover)
    pub fn warm_up_active(&mut self, events: &EventSender) {
        if let Some(active) = self.active_mut() {
            if let Err(e) = active.warm_up(events) {
                warn!("Warm-up of {} failed: {}", active.name(), e);
            }
        }
    }

    /// Hand a request to the active backend
    pub fn speak(&mut self, request: &UtteranceRequest, events: &EventSender) -> Result<()> {
        match self.active_mut() {
            Some(active) => active.speak(request, events),
            None => Err(AacError::BackendUnavailable("no active speech backend".to_string())),
        }
    }

    /// Cancel playback on every backend, active or not
    pub fn stop_all(&mut self) {
        for synth in [self.service.as_deref_mut(), self.local.as_deref_mut()]
            .into_iter()
            .flatten()
        {
            if let Err(e) = synth.cancel() {
                debug!("Cancel on {} failed: {}", synth.name(), e);
            }
        }
    }

    /// Voices of the active backend
    pub fn list_voices(&self) -> Vec<VoiceDescriptor> {
        self.active().map(|synth| synth.voices()).unwrap_or_default()
    }

    /// Re-read the platform voice catalog
    pub fn refresh_local_voices(&mut self, events: &EventSender) -> Result<()> {
        match self.local.as_deref_mut() {
            Some(local) => local.refresh_voices(events),
            None => Ok(()),
        }
    }

    /// Label of the active backend, for diagnostics
    pub fn engine_info(&self) -> String {
        match (self.state, self.active()) {
            (EngineState::PreferredActive, Some(synth)) => {
                format!("{} (Korean optimized)", synth.name())
            }
            (EngineState::FallbackActive, Some(synth)) => synth.name().to_string(),
            _ => "TTS unavailable".to_string(),
        }
    }
}

impl fmt::Debug for EngineSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineSelector")
            .field("service", &self.service.is_some())
            .field("local", &self.local.is_some())
            .field("state", &self.state)
            .finish()
    }
}
