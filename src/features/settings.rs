//! Application settings persistence
//!
//! Handles saving and loading user preferences.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cache::FingerprintMode;
use crate::features::import::DEFAULT_ENCODINGS;
use crate::features::lyrics::{LyricsFormat, TailPolicy};
use crate::utils;

/// Application settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Lyric file library
    pub library: LibrarySettings,
    /// Player and sync behavior
    pub player: PlayerSettings,
    /// Defaults for saving lyric files
    pub save: SaveSettings,
}

/// Lyric file library settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// Directory lyric files are listed from
    pub input_dir: PathBuf,
    /// Directory saved lyric files go to
    pub output_dir: PathBuf,
    /// Decode fallback chain, tried in order
    pub encodings: Vec<String>,
    /// How file changes are detected
    pub fingerprint_mode: FingerprintMode,
}

/// Player settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    /// Start playback as soon as the player loads
    pub autoplay: bool,
    /// Show the audio visualizer
    pub show_visualizer: bool,
    /// What happens after the final line's explicit end
    pub tail_policy: TailPolicy,
    /// Position polling interval for hosts without push updates
    pub tick_interval_ms: u64,
}

/// Save defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveSettings {
    pub format: LyricsFormat,
    pub encoding: String,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            input_dir: utils::default_input_dir(),
            output_dir: utils::default_output_dir(),
            encodings: DEFAULT_ENCODINGS.iter().map(|e| e.to_string()).collect(),
            fingerprint_mode: FingerprintMode::ModifiedTime,
        }
    }
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            autoplay: true,
            show_visualizer: true,
            tail_policy: TailPolicy::Sticky,
            tick_interval_ms: 250,
        }
    }
}

impl Default for SaveSettings {
    fn default() -> Self {
        Self {
            format: LyricsFormat::Lrc,
            encoding: "utf-8".to_string(),
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn file_path() -> Option<PathBuf> {
        utils::config_file()
    }

    /// Load settings from file, or return defaults if not found
    pub fn load() -> Self {
        Self::file_path()
            .and_then(|path| Self::load_from_file(&path).ok())
            .unwrap_or_default()
    }

    /// Load settings from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| SettingsError::Io(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| SettingsError::Parse(e.to_string()))
    }

    /// Save settings to the default file
    pub fn save(&self) -> Result<(), SettingsError> {
        if let Some(path) = Self::file_path() {
            self.save_to_file(&path)
        } else {
            Err(SettingsError::Io(
                "Could not determine config directory".to_string(),
            ))
        }
    }

    /// Save settings to a specific file
    pub fn save_to_file(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SettingsError::Io(e.to_string()))?;
        }

        let content =
            serde_json::to_string_pretty(self).map_err(|e| SettingsError::Parse(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| SettingsError::Io(e.to_string()))?;
        Ok(())
    }
}

/// Errors that can occur with settings
#[derive(Debug, Clone)]
pub enum SettingsError {
    Io(String),
    Parse(String),
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::Io(e) => write!(f, "IO error: {}", e),
            SettingsError::Parse(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl std::error::Error for SettingsError {}
