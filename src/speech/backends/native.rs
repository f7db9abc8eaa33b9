//! Platform speech backend using the tts crate
//!
//! The `tts` crate gives a unified interface to:
//! - Speech Dispatcher on Linux
//! - AVFoundation on macOS/iOS
//! - WinRT/SAPI on Windows
//!
//! This is the fallback backend. Its voice catalog is read during warm-up;
//! until then `voices()` is empty.

use crate::speech::synth::{BackendEvent, BackendRole, EventSender, Synth, UtteranceRequest};
use crate::speech::voice::{filter_locale, resolve_voice, VoiceDescriptor};
use crate::{AacError, Result};
use log::{debug, error, info, warn};
use std::sync::{Arc, Mutex};
use tts::{Tts as TtsCrate, UtteranceId};

/// Utterance the platform is currently speaking, with our sequence number
type CurrentUtterance = Arc<Mutex<Option<(UtteranceId, u64)>>>;

/// Platform speech backend
pub struct NativeSynth {
    /// The tts crate's TTS instance
    tts: TtsCrate,

    /// Locale prefix voices must match
    locale: String,

    /// Platform voices, loaded on warm-up
    voices: Vec<tts::Voice>,

    /// Descriptors for `voices`, same order
    catalog: Vec<VoiceDescriptor>,

    /// Set while an utterance is playing so the end callback can tag it
    current: CurrentUtterance,

    /// Whether end-of-utterance callbacks are installed
    callbacks: bool,
}

impl NativeSynth {
    /// Create a new platform synthesizer
    pub fn new(locale: &str) -> Result<Self> {
        debug!("Creating native TTS backend");

        let tts = TtsCrate::default()
            .map_err(|e| AacError::BackendUnavailable(format!("Failed to initialize TTS: {}", e)))?;

        debug!("Native TTS backend created successfully");

        Ok(Self {
            tts,
            locale: locale.to_string(),
            voices: Vec::new(),
            catalog: Vec::new(),
            current: Arc::new(Mutex::new(None)),
            callbacks: false,
        })
    }

    /// Map a rate multiplier onto the platform's rate range
    fn convert_rate(&self, multiplier: f32) -> f32 {
        scale(
            multiplier,
            self.tts.min_rate(),
            self.tts.normal_rate(),
            self.tts.max_rate(),
        )
    }

    /// Map a pitch multiplier onto the platform's pitch range
    fn convert_pitch(&self, multiplier: f32) -> f32 {
        scale(
            multiplier,
            self.tts.min_pitch(),
            self.tts.normal_pitch(),
            self.tts.max_pitch(),
        )
    }

    fn convert_volume(&self, volume: f32) -> f32 {
        scale(
            volume,
            self.tts.min_volume(),
            self.tts.normal_volume(),
            self.tts.max_volume(),
        )
    }

    fn load_catalog(&mut self) -> Result<()> {
        if !self.tts.supported_features().voice {
            warn!("Voice enumeration not supported on this platform");
            return Ok(());
        }

        let voices = self
            .tts
            .voices()
            .map_err(|e| AacError::Playback(format!("Failed to get voices: {}", e)))?;

        self.catalog = voices.iter().map(describe).collect();
        self.voices = voices;
        info!("Platform speech initialized with {} voices", self.catalog.len());
        Ok(())
    }

    fn install_callbacks(&mut self, events: &EventSender) -> Result<()> {
        if self.callbacks {
            return Ok(());
        }
        if !self.tts.supported_features().utterance_callbacks {
            warn!("Utterance callbacks not supported; completion will not be reported");
            return Ok(());
        }

        let current = Arc::clone(&self.current);
        let tx = events.clone();
        self.tts
            .on_utterance_end(Some(Box::new(move |id| {
                let mut slot = current.lock().unwrap_or_else(|e| e.into_inner());
                if let Some((playing, seq)) = slot.take() {
                    if playing == id {
                        let _ = tx.send(BackendEvent::ended(BackendRole::Local, seq));
                    } else {
                        *slot = Some((playing, seq));
                    }
                }
            })))
            .map_err(|e| AacError::Playback(format!("Failed to install callback: {}", e)))?;

        self.callbacks = true;
        Ok(())
    }

    /// Platform voice for a request
    fn choose_voice(&self, request: &UtteranceRequest) -> Option<&tts::Voice> {
        let chosen = resolve_voice(
            &self.catalog,
            request.voice_hint.as_deref(),
            &self.locale,
            request.lang,
        )?;
        self.voices.iter().find(|v| v.id() == chosen.id)
    }

    fn apply_request(&mut self, request: &UtteranceRequest) -> Result<()> {
        let features = self.tts.supported_features();

        if features.rate {
            let rate = self.convert_rate(request.settings.effective_rate());
            self.tts
                .set_rate(rate)
                .map_err(|e| AacError::Playback(format!("Failed to set rate: {}", e)))?;
        }
        if features.pitch {
            let pitch = self.convert_pitch(request.settings.effective_pitch());
            self.tts
                .set_pitch(pitch)
                .map_err(|e| AacError::Playback(format!("Failed to set pitch: {}", e)))?;
        }
        if features.volume {
            let volume = self.convert_volume(request.volume);
            self.tts
                .set_volume(volume)
                .map_err(|e| AacError::Playback(format!("Failed to set volume: {}", e)))?;
        }

        if features.voice {
            match self.choose_voice(request).cloned() {
                Some(voice) => {
                    debug!("Using voice: {}", voice.name());
                    self.tts
                        .set_voice(&voice)
                        .map_err(|e| AacError::Playback(format!("Failed to set voice: {}", e)))?;
                }
                None => warn!("No {} voice found, using default", request.lang),
            }
        }

        Ok(())
    }
}

/// Linear map where 1.0 lands on `normal`, clamped to the backend's range
fn scale(multiplier: f32, min: f32, normal: f32, max: f32) -> f32 {
    (normal * multiplier).clamp(min, max)
}

fn describe(voice: &tts::Voice) -> VoiceDescriptor {
    let name = voice.name();
    VoiceDescriptor {
        id: voice.id(),
        language: voice.language().as_str().to_string(),
        label: name.clone(),
        name,
    }
}

impl Synth for NativeSynth {
    fn role(&self) -> BackendRole {
        BackendRole::Local
    }

    fn name(&self) -> &str {
        "Platform speech"
    }

    fn warm_up(&mut self, events: &EventSender) -> Result<()> {
        self.install_callbacks(events)?;
        self.refresh_voices(events)
    }

    fn speak(&mut self, request: &UtteranceRequest, events: &EventSender) -> Result<()> {
        if request.text.trim().is_empty() {
            return Err(AacError::EmptyInput);
        }

        self.apply_request(request)?;

        debug!("Speaking: {}", request.text);
        let id = self.tts.speak(request.text.as_str(), false).map_err(|e| {
            error!("Failed to speak: {}", e);
            AacError::Playback(format!("Speak failed: {}", e))
        })?;
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = id.map(|id| (id, request.seq));

        let _ = events.send(BackendEvent::started(BackendRole::Local, request.seq));
        Ok(())
    }

    fn cancel(&mut self) -> Result<()> {
        debug!("Canceling speech");
        self.current.lock().unwrap_or_else(|e| e.into_inner()).take();
        self.tts.stop().map_err(|e| {
            error!("Failed to cancel speech: {}", e);
            AacError::Playback(format!("Cancel failed: {}", e))
        })?;

        Ok(())
    }

    fn voices(&self) -> Vec<VoiceDescriptor> {
        filter_locale(&self.catalog, &self.locale)
    }

    fn refresh_voices(&mut self, events: &EventSender) -> Result<()> {
        self.load_catalog()?;
        let _ = events.send(BackendEvent::catalog_ready(BackendRole::Local));
        Ok(())
    }
}
