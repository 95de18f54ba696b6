//! Engine configuration
//!
//! Loaded from a JSON file, every field is optional:
//!
//! ```json
//! { "data_path": "DATA", "save_path": ".", "log_profile": "production" }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::logging::Profile;
use crate::mixer::SFX_VOLUME;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct EngineConfig {
    /// Game root holding the `SCN`, `WGP`, `DATA` ... directories.
    pub data_path: PathBuf,
    pub save_path: PathBuf,
    /// Directory of the `trackNN.ogg` digital music files.
    pub music_path: PathBuf,
    pub log_profile: Profile,
    pub sound_volume: i32,
    pub output_rate: u32,
    /// Demo data layout, detected from the data when `None`.
    pub demo: Option<bool>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("DATA"),
            save_path: PathBuf::from("."),
            music_path: PathBuf::from("MUSIC"),
            log_profile: Profile::default(),
            sound_volume: SFX_VOLUME,
            output_rate: 22050,
            demo: None,
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content).map_err(|source| ConfigError::Json {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Save file of a slot, `bermuda.001` to `bermuda.999`.
    pub fn save_file(&self, slot: u32) -> PathBuf {
        self.save_path.join(format!("bermuda.{:03}", slot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_for_missing_fields() {
        let config = EngineConfig::from_json(r#"{"save_path": "saves"}"#).unwrap();
        assert_eq!(config.save_path, PathBuf::from("saves"));
        assert_eq!(config.data_path, PathBuf::from("DATA"));
        assert_eq!(config.sound_volume, 256);
        assert_eq!(config.output_rate, 22050);
        assert_eq!(config.log_profile, Profile::Development);
        assert_eq!(config.demo, None);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bermuda.json");
        std::fs::write(&path, r#"{"log_profile": "production", "demo": true, "output_rate": 44100}"#).unwrap();
        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.log_profile, Profile::Production);
        assert_eq!(config.demo, Some(true));
        assert_eq!(config.output_rate, 44100);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            EngineConfig::load(&dir.path().join("missing.json")),
            Err(ConfigError::Io { .. })
        ));
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"output_rate": "fast"}"#).unwrap();
        assert!(matches!(EngineConfig::load(&path), Err(ConfigError::Json { .. })));
    }

    #[test]
    fn test_save_file_name() {
        let config = EngineConfig {
            save_path: PathBuf::from("/tmp/saves"),
            ..Default::default()
        };
        assert_eq!(config.save_file(7), PathBuf::from("/tmp/saves/bermuda.007"));
        assert_eq!(config.save_file(123), PathBuf::from("/tmp/saves/bermuda.123"));
    }
}
