//! Scripted speech backends for integration tests

#![allow(dead_code)]

use aacboard::settings::SpeechSettings;
use aacboard::speech::{
    BackendEvent, BackendRole, EventKind, EventSender, Synth, UtteranceRequest, VoiceDescriptor,
};
use aacboard::{AacError, Result};
use std::sync::{Arc, Mutex, MutexGuard};

/// Something a scripted backend was asked to do
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    WarmUp(BackendRole),
    Speak {
        role: BackendRole,
        seq: u64,
        text: String,
        voice_hint: Option<String>,
        settings: SpeechSettings,
    },
    Cancel(BackendRole),
}

#[derive(Default)]
struct Script {
    calls: Vec<Call>,
    reject_service: bool,
    reject_local: bool,
    events: Option<EventSender>,
    local_voices: Vec<VoiceDescriptor>,
}

/// Shared view of everything the scripted backends did
///
/// Both backends of a test record into the same log so call order
/// across backends can be asserted.
#[derive(Clone, Default)]
pub struct Recorder {
    script: Arc<Mutex<Script>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }

    pub fn backend(&self, role: BackendRole) -> Box<dyn Synth> {
        Box::new(ScriptedSynth {
            role,
            recorder: self.clone(),
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn clear(&self) {
        self.lock().calls.clear();
    }

    /// Utterances handed to `role`, as (seq, text)
    pub fn spoken(&self, role: BackendRole) -> Vec<(u64, String)> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::Speak { role: r, seq, text, .. } if *r == role => Some((*seq, text.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn speak_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| matches!(call, Call::Speak { .. }))
            .count()
    }

    /// Make `speak` on `role` return an error
    pub fn reject(&self, role: BackendRole) {
        match role {
            BackendRole::Service => self.lock().reject_service = true,
            BackendRole::Local => self.lock().reject_local = true,
        }
    }

    pub fn set_local_voices(&self, voices: Vec<VoiceDescriptor>) {
        self.lock().local_voices = voices;
    }

    /// Send an event as if `role` produced it
    pub fn emit(&self, role: BackendRole, seq: u64, kind: EventKind) {
        let events = self.lock().events.clone().expect("no backend was warmed up or spoken to");
        events.send(BackendEvent { role, seq, kind }).unwrap();
    }
}

struct ScriptedSynth {
    role: BackendRole,
    recorder: Recorder,
}

impl Synth for ScriptedSynth {
    fn role(&self) -> BackendRole {
        self.role
    }

    fn name(&self) -> &str {
        match self.role {
            BackendRole::Service => "Scripted service",
            BackendRole::Local => "Scripted platform",
        }
    }

    fn warm_up(&mut self, events: &EventSender) -> Result<()> {
        let mut script = self.recorder.lock();
        script.calls.push(Call::WarmUp(self.role));
        script.events = Some(events.clone());
        Ok(())
    }

    fn speak(&mut self, request: &UtteranceRequest, events: &EventSender) -> Result<()> {
        let mut script = self.recorder.lock();
        script.events = Some(events.clone());
        script.calls.push(Call::Speak {
            role: self.role,
            seq: request.seq,
            text: request.text.clone(),
            voice_hint: request.voice_hint.clone(),
            settings: request.settings,
        });

        let reject = match self.role {
            BackendRole::Service => script.reject_service,
            BackendRole::Local => script.reject_local,
        };
        if reject {
            return Err(AacError::Playback("scripted rejection".to_string()));
        }
        Ok(())
    }

    fn cancel(&mut self) -> Result<()> {
        self.recorder.lock().calls.push(Call::Cancel(self.role));
        Ok(())
    }

    fn voices(&self) -> Vec<VoiceDescriptor> {
        match self.role {
            BackendRole::Service => aacboard::speech::voice::service_voices(),
            BackendRole::Local => {
                aacboard::speech::voice::filter_locale(&self.recorder.lock().local_voices, "ko")
            }
        }
    }
}
