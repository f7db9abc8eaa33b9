//! Voice service backend
//!
//! The preferred backend: an external speech program (espeak-ng by
//! default) with Korean voices. Each utterance runs as its own child
//! process. A watcher thread waits for it and reports how it ended, so
//! `speak` never blocks on playback.
//!
//! Dependencies:
//! - espeak-ng (install with: sudo apt install espeak-ng)

use crate::speech::synth::{BackendEvent, BackendRole, EventSender, Synth, UtteranceRequest};
use crate::speech::voice::{service_voices, VoiceDescriptor};
use crate::{AacError, Result};
use log::{debug, error, info, warn};
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

/// How often the watcher checks on the child
const WATCH_INTERVAL: Duration = Duration::from_millis(20);

/// A running utterance
struct Playback {
    seq: u64,
    child: Child,
}

type PlaybackSlot = Arc<Mutex<Option<Playback>>>;

/// Voice service backend
pub struct ServiceSynth {
    /// Program that produces the audio
    program: String,

    /// Display name, e.g. "espeak-ng voice service"
    name: String,

    /// Utterance currently playing, shared with its watcher thread
    current: PlaybackSlot,
}

impl ServiceSynth {
    /// Probe for the service program
    ///
    /// Returns `BackendUnavailable` when the program is missing or broken.
    pub fn probe(program: &str) -> Result<Self> {
        debug!("Probing voice service: {}", program);

        match Command::new(program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(status) if status.success() => {
                info!("Found voice service at: {}", program);
                Ok(Self {
                    program: program.to_string(),
                    name: format!("{} voice service", program),
                    current: Arc::new(Mutex::new(None)),
                })
            }
            Ok(status) => Err(AacError::BackendUnavailable(format!(
                "{} exited with {}",
                program, status
            ))),
            Err(e) => Err(AacError::BackendUnavailable(format!(
                "{} not found ({}). Install with: sudo apt install espeak-ng",
                program, e
            ))),
        }
    }

    /// Rate multiplier to espeak speed (80-450 wpm, 175 normal)
    fn rate_to_speed(rate: f32) -> u16 {
        (175.0 * rate).clamp(80.0, 450.0).round() as u16
    }

    /// Pitch multiplier to espeak pitch (0-99, 50 normal)
    fn pitch_to_espeak(pitch: f32) -> u8 {
        (50.0 * pitch).clamp(0.0, 99.0).round() as u8
    }

    /// Volume (0.0-2.0) to espeak amplitude (0-200, 100 normal)
    fn volume_to_amplitude(volume: f32) -> u8 {
        (100.0 * volume).clamp(0.0, 200.0).round() as u8
    }

    /// espeak voice for a hint in the request's language
    ///
    /// The curated entry (female by default) gives the variant after `+`;
    /// the language part comes from `lang`, so `ko-KR` + Korean Male is `ko+m3`.
    fn voice_for(hint: Option<&str>, lang: &str) -> String {
        let voices = service_voices();
        let curated = hint
            .and_then(|hint| voices.iter().find(|v| v.matches_hint(hint)))
            .unwrap_or(&voices[0]);
        let variant = curated.id.split_once('+').map_or("f3", |(_, variant)| variant);
        let language = lang.split('-').next().unwrap_or(lang).to_ascii_lowercase();
        format!("{}+{}", language, variant)
    }

    fn lock(&self) -> MutexGuard<'_, Option<Playback>> {
        lock_slot(&self.current)
    }

    /// Kill the running child, if any
    fn cancel_process(&self) {
        if let Some(mut playback) = self.lock().take() {
            debug!("Killing {} process for utterance {}", self.program, playback.seq);
            match playback.child.kill() {
                Ok(_) => {
                    let _ = playback.child.wait();
                }
                Err(e) => {
                    debug!("Failed to kill {} process: {}", self.program, e);
                }
            }
        }
    }
}

fn lock_slot(slot: &PlaybackSlot) -> MutexGuard<'_, Option<Playback>> {
    slot.lock().unwrap_or_else(|e| e.into_inner())
}

/// Wait for utterance `seq` to exit and report the result
///
/// Returns quietly if the utterance was cancelled or replaced.
fn watch(slot: PlaybackSlot, seq: u64, events: EventSender) {
    loop {
        {
            let mut guard = lock_slot(&slot);
            let playback = match guard.as_mut() {
                Some(playback) if playback.seq == seq => playback,
                _ => return,
            };

            let event = match playback.child.try_wait() {
                Ok(None) => None,
                Ok(Some(status)) if status.success() => {
                    Some(BackendEvent::ended(BackendRole::Service, seq))
                }
                Ok(Some(status)) => Some(BackendEvent::error(
                    BackendRole::Service,
                    seq,
                    format!("voice service exited with {}", status),
                )),
                Err(e) => Some(BackendEvent::error(
                    BackendRole::Service,
                    seq,
                    format!("wait failed: {}", e),
                )),
            };

            if let Some(event) = event {
                guard.take();
                let _ = events.send(event);
                return;
            }
        }
        thread::sleep(WATCH_INTERVAL);
    }
}

impl Synth for ServiceSynth {
    fn role(&self) -> BackendRole {
        BackendRole::Service
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn warm_up(&mut self, _events: &EventSender) -> Result<()> {
        // Listing the Korean voices loads the voice data off the UI path
        let program = self.program.clone();
        thread::spawn(move || {
            match Command::new(&program)
                .arg("--voices=ko")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
            {
                Ok(status) if status.success() => debug!("{} warmed up", program),
                Ok(status) => warn!("{} warm-up exited with {}", program, status),
                Err(e) => warn!("{} warm-up failed: {}", program, e),
            }
        });
        Ok(())
    }

    fn speak(&mut self, request: &UtteranceRequest, events: &EventSender) -> Result<()> {
        if request.text.trim().is_empty() {
            return Err(AacError::EmptyInput);
        }

        self.cancel_process();

        let voice = Self::voice_for(request.voice_hint.as_deref(), request.lang);
        let speed = Self::rate_to_speed(request.settings.effective_rate());
        let pitch = Self::pitch_to_espeak(request.settings.effective_pitch());
        let amplitude = Self::volume_to_amplitude(request.volume);

        let mut cmd = Command::new(&self.program);
        cmd.arg("-v").arg(&voice);
        cmd.arg("-s").arg(speed.to_string());
        cmd.arg("-p").arg(pitch.to_string());
        cmd.arg("-a").arg(amplitude.to_string());
        cmd.arg("--").arg(&request.text);
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::null());

        let child = cmd.spawn().map_err(|e| {
            error!("Failed to start {}: {}", self.program, e);
            AacError::Playback(format!("Failed to start {}: {}", self.program, e))
        })?;

        debug!("{} started for utterance {} with voice {}", self.program, request.seq, voice);
        *self.lock() = Some(Playback {
            seq: request.seq,
            child,
        });
        let _ = events.send(BackendEvent::started(BackendRole::Service, request.seq));

        let slot = Arc::clone(&self.current);
        let tx = events.clone();
        let seq = request.seq;
        thread::spawn(move || watch(slot, seq, tx));

        Ok(())
    }

    fn cancel(&mut self) -> Result<()> {
        self.cancel_process();
        Ok(())
    }

    fn voices(&self) -> Vec<VoiceDescriptor> {
        service_voices()
    }
}

impl Drop for ServiceSynth {
    fn drop(&mut self) {
        self.cancel_process();
    }
}
