//! Media file discovery
//!
//! Finds lyrics for an audio file from:
//! 1. A same-name lyrics file next to it (song.mp3 -> song.lrc/srt/txt)
//! 2. Lyrics embedded in the audio file's tags

use std::path::Path;

pub mod lyrics;

/// Find lyrics text for an audio file
///
/// Returns the raw decoded text; parse it with
/// [`parse_lyrics`](crate::features::lyrics::parse_lyrics).
pub fn find_lyrics_for_audio(audio_path: &Path) -> Option<String> {
    lyrics::find_lyrics(audio_path, crate::features::import::DEFAULT_ENCODINGS)
}

/// Display name for an audio file: the file name without its extension
pub fn display_name(audio_path: &Path) -> String {
    audio_path
        .file_stem()
        .or_else(|| audio_path.file_name())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
