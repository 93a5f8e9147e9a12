//! Lyric file import module
//!
//! Handles:
//! - Listing lyric files in the input directory
//! - Loading with encoding fallback
//! - Saving with a chosen format and encoding
//! - Validation and change fingerprints

mod encoding;
mod library;

pub use encoding::{
    DEFAULT_ENCODINGS, Decoded, EncodingError, SAVE_ENCODINGS, decode_with_fallback,
    encode_for_save, resolve_label,
};
pub use library::{LibraryEntry, LyricsFileError, LyricsLibrary, PLACEHOLDER};

use std::path::Path;

/// Supported lyric file extensions
pub const LYRICS_EXTENSIONS: &[&str] = &["lrc", "srt", "txt"];

/// Check if a file extension is a supported lyric format
pub fn is_lyrics_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| LYRICS_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
