//! Controller configuration
//!
//! Every field has a default, so an empty JSON object is a valid config.

use crate::capture::traits::{FacingMode, MediaConstraints};
use crate::recorder::format::DEFAULT_MIME_PREFERENCES;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Keys written to the page-variable store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PublishKeys {
    pub video: String,
    pub photo: String,
    pub photo_base64: String,
}

impl Default for PublishKeys {
    fn default() -> Self {
        Self {
            video: "video_artifact".to_string(),
            photo: "photo_artifact".to_string(),
            photo_base64: "photo_base64".to_string(),
        }
    }
}

/// Settings shared by the video and photo controllers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureConfig {
    /// Seconds counted down before recording starts
    pub countdown_seconds: u32,

    /// Length of one timer tick in milliseconds
    pub tick_period_ms: u64,

    /// Recording formats in preference order
    pub mime_preferences: Vec<String>,

    /// Preferred camera
    pub facing_mode: FacingMode,

    /// Whether video recordings include a microphone track
    pub video_audio: bool,

    /// Recording filename without extension
    pub video_filename_stem: String,

    /// Photo filename
    pub photo_filename: String,

    /// Identity of the live preview surface
    pub live_preview_id: String,

    pub keys: PublishKeys,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            countdown_seconds: 3,
            tick_period_ms: 1000,
            mime_preferences: DEFAULT_MIME_PREFERENCES.iter().map(|m| m.to_string()).collect(),
            facing_mode: FacingMode::Environment,
            video_audio: true,
            video_filename_stem: "review-video".to_string(),
            photo_filename: "document-photo.png".to_string(),
            live_preview_id: "live-video-feed".to_string(),
            keys: PublishKeys::default(),
        }
    }
}

impl CaptureConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: CaptureConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&content)?;
        tracing::debug!("Loaded capture config from {:?}", path);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.countdown_seconds == 0 {
            return Err(ConfigError::Invalid("countdownSeconds must be at least 1".to_string()));
        }
        if self.tick_period_ms == 0 {
            return Err(ConfigError::Invalid("tickPeriodMs must be positive".to_string()));
        }
        if self.mime_preferences.is_empty() {
            return Err(ConfigError::Invalid("mimePreferences is empty".to_string()));
        }
        Ok(())
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    /// Camera plus microphone for recordings
    pub fn video_constraints(&self) -> MediaConstraints {
        MediaConstraints {
            facing_mode: self.facing_mode,
            audio: self.video_audio,
        }
    }

    /// Camera only for photos
    pub fn photo_constraints(&self) -> MediaConstraints {
        MediaConstraints {
            facing_mode: self.facing_mode,
            audio: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_empty_object_is_default() {
        let config = CaptureConfig::from_json_str("{}").unwrap();
        assert_eq!(config, CaptureConfig::default());
        assert_eq!(config.mime_preferences[0], "video/mp4; codecs=avc1");
        assert_eq!(config.tick_period(), Duration::from_secs(1));
    }

    #[test]
    fn test_partial_override() {
        let config = CaptureConfig::from_json_str(
            r#"{ "countdownSeconds": 5, "facingMode": "user", "keys": { "video": "clip" } }"#,
        )
        .unwrap();

        assert_eq!(config.countdown_seconds, 5);
        assert_eq!(config.facing_mode, FacingMode::User);
        assert_eq!(config.keys.video, "clip");
        assert_eq!(config.keys.photo, "photo_artifact");
        assert!(!config.photo_constraints().audio);
        assert!(config.video_constraints().audio);
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(matches!(
            CaptureConfig::from_json_str(r#"{ "countdownSeconds": 0 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            CaptureConfig::from_json_str(r#"{ "mimePreferences": [] }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            CaptureConfig::from_json_str("not json"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("capture.json");
        std::fs::write(&path, r#"{ "tickPeriodMs": 250 }"#).unwrap();

        let config = CaptureConfig::load(&path).unwrap();
        assert_eq!(config.tick_period(), Duration::from_millis(250));

        let missing = CaptureConfig::load(&dir.path().join("missing.json"));
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }
}
