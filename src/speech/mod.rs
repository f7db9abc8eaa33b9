//! Speech output: backends, engine selection and the controller the UI talks to

pub mod backends;
pub mod controller;
pub mod selector;
pub mod synth;
pub mod voice;

pub use controller::{SpeakOutcome, SpeechController, SpeechNotice, TEST_PHRASES};
pub use selector::{EngineSelector, EngineState, Failover};
pub use synth::{BackendEvent, BackendRole, EventKind, EventSender, Synth, UtteranceRequest};
pub use voice::{select_voice, VoiceDescriptor, KOREAN_VOICE_PRIORITY};
