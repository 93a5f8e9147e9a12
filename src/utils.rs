//! Utility functions

use std::path::PathBuf;

// ============================================================================
// Time Formatting
// ============================================================================

/// Format a position as `mm:ss.cc` (minutes keep counting past the hour)
pub fn format_time(position_ms: u64) -> String {
    let total_secs = position_ms / 1000;
    let centis = (position_ms % 1000) / 10;
    format!("{:02}:{:02}.{:02}", total_secs / 60, total_secs % 60, centis)
}

// ============================================================================
// Path Utilities
// ============================================================================

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "lyric-player", "LyricPlayer")
}

/// Get the base data directory for lyric-player
pub fn data_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Directory lyric files are listed and loaded from
pub fn default_input_dir() -> PathBuf {
    data_dir().join("input")
}

/// Directory saved lyric files are written to
pub fn default_output_dir() -> PathBuf {
    data_dir().join("output")
}

/// Settings file location
pub fn config_file() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("settings.json"))
}
