//! Configuration management
//!
//! One INI file (`~/.aacboard.cfg`) holds both the user's speech settings
//! and the engine options picked at startup.

use crate::settings::{SettingsStore, SpeechSettings};
use crate::{AacError, Result};
use ini::Ini;
use log::{debug, info};
use std::path::{Path, PathBuf};

/// Default program used as the preferred voice service
pub const DEFAULT_SERVICE_PROGRAM: &str = "espeak-ng";

/// Locale prefix voices must match
pub const DEFAULT_LOCALE: &str = "ko";

/// Engine options read from the `[engine]` section
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    /// Try the voice service before the platform speech API
    pub prefer_service: bool,

    /// Program behind the voice service
    pub service_program: String,

    /// Language prefix used for voice filtering and selection
    pub locale: String,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            prefer_service: true,
            service_program: DEFAULT_SERVICE_PROGRAM.to_string(),
            locale: DEFAULT_LOCALE.to_string(),
        }
    }
}

/// Application configuration backed by an INI file
pub struct Config {
    /// INI configuration storage
    ini: Ini,

    /// Config file path
    path: PathBuf,
}

impl Config {
    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path())
    }

    /// Load configuration from a specific file, creating it if missing
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        debug!("Loading config from {:?}", path);

        let ini = if path.exists() {
            Ini::load_from_file(&path)
                .map_err(|e| AacError::IniParse(format!("Failed to load config: {}", e)))?
        } else {
            info!("Config file not found, creating default");
            let default = Self::default_config();
            default
                .write_to_file(&path)
                .map_err(|e| AacError::Config(format!("Failed to write config: {}", e)))?;
            default
        };

        Ok(Self { ini, path })
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        debug!("Saving config to {:?}", self.path);
        self.ini
            .write_to_file(&self.path)
            .map_err(|e| AacError::Persistence(format!("Failed to save config: {}", e)))
    }

    /// Default config file path (~/.aacboard.cfg)
    fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".aacboard.cfg")
    }

    /// Expose the config file path for display
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn default_config() -> Ini {
        let mut ini = Ini::new();

        ini.with_section(Some("speech"))
            .set("speech_rate", "1.0")
            .set("speech_pitch", "1.0");

        ini.with_section(Some("engine"))
            .set("prefer_service", "true")
            .set("service_program", DEFAULT_SERVICE_PROGRAM)
            .set("locale", DEFAULT_LOCALE);

        ini
    }

    /// Get a boolean value from config
    pub fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.ini
            .get_from(Some(section), key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Get a string value from config
    pub fn get_string(&self, section: &str, key: &str, default: &str) -> String {
        self.ini
            .get_from(Some(section), key)
            .unwrap_or(default)
            .to_string()
    }

    /// Get a float value from config
    pub fn get_float(&self, section: &str, key: &str, default: f32) -> f32 {
        self.ini
            .get_from(Some(section), key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Set a value in config
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        self.ini.with_section(Some(section)).set(key, value);
    }

    /// Engine options from the `[engine]` section
    pub fn engine_options(&self) -> EngineOptions {
        let defaults = EngineOptions::default();
        EngineOptions {
            prefer_service: self.get_bool("engine", "prefer_service", defaults.prefer_service),
            service_program: self.get_string("engine", "service_program", &defaults.service_program),
            locale: self.get_string("engine", "locale", &defaults.locale),
        }
    }
}

impl SettingsStore for Config {
    fn load_settings(&self) -> Result<SpeechSettings> {
        Ok(SpeechSettings {
            rate: self.get_float("speech", "speech_rate", 1.0),
            pitch: self.get_float("speech", "speech_pitch", 1.0),
        })
    }

    fn save_settings(&mut self, settings: &SpeechSettings) -> Result<()> {
        self.set("speech", "speech_rate", &settings.rate.to_string());
        self.set("speech", "speech_pitch", &settings.pitch.to_string());
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.cfg");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.path(), path.as_path());
        assert_eq!(config.engine_options(), EngineOptions::default());
        assert_eq!(config.load_settings().unwrap(), SpeechSettings::default());
    }

    #[test]
    fn test_reads_engine_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.cfg");
        std::fs::write(
            &path,
            "[engine]\nprefer_service = false\nservice_program = /opt/voice/say\n",
        )
        .unwrap();

        let options = Config::load_from(&path).unwrap().engine_options();
        assert!(!options.prefer_service);
        assert_eq!(options.service_program, "/opt/voice/say");
        assert_eq!(options.locale, DEFAULT_LOCALE);
    }

    #[test]
    fn test_unparsable_values_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.cfg");
        std::fs::write(&path, "[speech]\nspeech_rate = fast\n").unwrap();

        let settings = Config::load_from(&path).unwrap().load_settings().unwrap();
        assert_eq!(settings.rate, 1.0);
        assert_eq!(settings.pitch, 1.0);
    }

    #[test]
    fn test_save_failure_is_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.cfg");
        let mut config = Config::load_from(&path).unwrap();

        // Replace the file with a directory so the write fails
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        let result = config.save_settings(&SpeechSettings { rate: 2.0, pitch: 1.0 });
        assert!(matches!(result, Err(AacError::Persistence(_))));
    }
}
