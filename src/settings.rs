//! User-tunable speech settings and the store they persist to

use crate::{AacError, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Rate and pitch the user picked on the settings screen
///
/// Rate is a multiplier of the backend's normal speed (0.1-10),
/// pitch is a multiplier of its normal pitch (0-2). Both default to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeechSettings {
    #[serde(rename = "speechRate")]
    pub rate: f32,
    #[serde(rename = "speechPitch")]
    pub pitch: f32,
}

impl SpeechSettings {
    /// Rate to hand to a backend; an unset (zero or non-finite) rate means normal speed
    pub fn effective_rate(&self) -> f32 {
        or_normal(self.rate)
    }

    /// Pitch to hand to a backend; an unset (zero or non-finite) pitch means normal pitch
    pub fn effective_pitch(&self) -> f32 {
        or_normal(self.pitch)
    }

    /// Merge a partial update into these settings
    pub fn apply(&mut self, update: SettingsUpdate) {
        if let Some(rate) = update.rate {
            self.rate = rate;
        }
        if let Some(pitch) = update.pitch {
            self.pitch = pitch;
        }
    }
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            rate: 1.0,
            pitch: 1.0,
        }
    }
}

fn or_normal(value: f32) -> f32 {
    if value == 0.0 || !value.is_finite() {
        1.0
    } else {
        value
    }
}

/// Partial settings change; `None` fields keep their current value
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    #[serde(rename = "speechRate", default)]
    pub rate: Option<f32>,
    #[serde(rename = "speechPitch", default)]
    pub pitch: Option<f32>,
}

/// Where speech settings live between sessions
///
/// The controller reads once at construction and writes after every change.
pub trait SettingsStore {
    /// Load the saved settings, or defaults if nothing was saved yet
    fn load_settings(&self) -> Result<SpeechSettings>;

    /// Persist settings; must be durable when this returns `Ok`
    fn save_settings(&mut self, settings: &SpeechSettings) -> Result<()>;
}

/// In-process settings store
///
/// Clones share the same slot, so a caller can keep a handle and observe
/// what the controller wrote.
#[derive(Debug, Clone, Default)]
pub struct MemorySettingsStore {
    inner: Arc<Mutex<MemorySlot>>,
}

#[derive(Debug, Default)]
struct MemorySlot {
    settings: Option<SpeechSettings>,
    saves: usize,
    fail_writes: bool,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with settings, as if saved in an earlier session
    pub fn with_settings(settings: SpeechSettings) -> Self {
        let store = Self::new();
        store.lock().settings = Some(settings);
        store
    }

    /// Make every following save fail (simulates a full or read-only disk)
    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Number of successful saves so far
    pub fn save_count(&self) -> usize {
        self.lock().saves
    }

    /// Last saved settings, if any
    pub fn saved(&self) -> Option<SpeechSettings> {
        self.lock().settings
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemorySlot> {
        // A poisoned slot still holds plain data
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load_settings(&self) -> Result<SpeechSettings> {
        Ok(self.lock().settings.unwrap_or_default())
    }

    fn save_settings(&mut self, settings: &SpeechSettings) -> Result<()> {
        let mut slot = self.lock();
        if slot.fail_writes {
            return Err(AacError::Persistence("memory store is read-only".to_string()));
        }
        debug!("Saving settings in memory: {:?}", settings);
        slot.settings = Some(*settings);
        slot.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = SpeechSettings::default();
        assert_eq!(settings.rate, 1.0);
        assert_eq!(settings.pitch, 1.0);
    }

    #[test]
    fn test_zero_means_normal() {
        let settings = SpeechSettings { rate: 0.0, pitch: 0.0 };
        assert_eq!(settings.effective_rate(), 1.0);
        assert_eq!(settings.effective_pitch(), 1.0);

        let settings = SpeechSettings { rate: 2.5, pitch: 0.4 };
        assert_eq!(settings.effective_rate(), 2.5);
        assert_eq!(settings.effective_pitch(), 0.4);
    }

    #[test]
    fn test_apply_partial_update() {
        let mut settings = SpeechSettings::default();
        settings.apply(SettingsUpdate {
            rate: Some(1.8),
            pitch: None,
        });
        assert_eq!(settings.rate, 1.8);
        assert_eq!(settings.pitch, 1.0);
    }

    #[test]
    fn test_board_json_shape() {
        // The board keeps settings under camelCase keys
        let settings: SpeechSettings =
            serde_json::from_str(r#"{"speechRate":1.2,"speechPitch":0.8}"#).unwrap();
        assert_eq!(settings, SpeechSettings { rate: 1.2, pitch: 0.8 });

        let update: SettingsUpdate = serde_json::from_str(r#"{"speechPitch":1.5}"#).unwrap();
        assert_eq!(update.rate, None);
        assert_eq!(update.pitch, Some(1.5));
    }

    #[test]
    fn test_memory_store_shared_handle() {
        let handle = MemorySettingsStore::new();
        let mut store = handle.clone();
        assert_eq!(store.load_settings().unwrap(), SpeechSettings::default());

        let settings = SpeechSettings { rate: 1.5, pitch: 1.0 };
        store.save_settings(&settings).unwrap();
        assert_eq!(handle.saved(), Some(settings));
        assert_eq!(handle.save_count(), 1);
    }

    #[test]
    fn test_memory_store_write_failure() {
        let mut store = MemorySettingsStore::new();
        store.fail_writes(true);
        let result = store.save_settings(&SpeechSettings::default());
        assert!(matches!(result, Err(AacError::Persistence(_))));
        assert_eq!(store.save_count(), 0);
    }
}
