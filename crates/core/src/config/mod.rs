use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    clock::DEFAULT_TICK_INTERVAL_MS, export::ExportSettings, notation::DEFAULT_LYRIC_TOLERANCE,
    transcription::UNTITLED_SONG, Result,
};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub playback: PlaybackConfig,
    pub notation: NotationConfig,
    /// Checked against the paper size when a session is created.
    pub export: ExportSettings,
}

impl AppConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}

/// Configuration specific to the playback clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub tick_interval_ms: u64,
    pub volume_percent: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            volume_percent: 75.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotationConfig {
    pub lyric_tolerance_seconds: f64,
    pub default_title: String,
}

impl Default for NotationConfig {
    fn default() -> Self {
        Self {
            lyric_tolerance_seconds: DEFAULT_LYRIC_TOLERANCE,
            default_title: UNTITLED_SONG.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::PageOrientation;

    #[test]
    fn missing_sections_take_defaults() {
        let config = AppConfig::from_json_str(r#"{"playback":{"volume_percent":40}}"#).unwrap();
        assert_eq!(config.playback.volume_percent, 40.0);
        assert_eq!(config.playback.tick_interval_ms, 100);
        assert_eq!(config.notation, NotationConfig::default());
        assert_eq!(config.export.orientation, PageOrientation::Landscape);
    }

    #[test]
    fn reads_orientation_in_lower_case() {
        let config = AppConfig::from_json_str(
            r#"{"export":{"orientation":"portrait","page_width_mm":180}}"#,
        )
        .unwrap();
        assert_eq!(config.export.orientation, PageOrientation::Portrait);
        assert_eq!(config.export.page_width_mm, 180.0);
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(AppConfig::from_json_str("{").is_err());
    }
}
