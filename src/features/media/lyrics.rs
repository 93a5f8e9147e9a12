//! Lyrics discovery for local audio files
//!
//! Finds a same-name lyrics file (LRC, SRT, plain text) or falls back to
//! the unsynchronized lyrics tag embedded in the audio file.

use lofty::file::TaggedFileExt;
use lofty::probe::Probe;
use lofty::tag::ItemKey;
use std::fs;
use std::path::{Path, PathBuf};

use crate::features::import::{LYRICS_EXTENSIONS, decode_with_fallback};

/// Find lyrics for an audio file
///
/// Priority:
/// 1. Same-name lyrics file, decoded with the `encodings` fallback chain
/// 2. Embedded lyrics (USLT / LYRICS tag)
pub fn find_lyrics<S: AsRef<str>>(audio_path: &Path, encodings: &[S]) -> Option<String> {
    if let Some(lyrics_path) = find_lyrics_file(audio_path) {
        match fs::read(&lyrics_path) {
            Ok(bytes) => match decode_with_fallback(&bytes, encodings) {
                Ok(decoded) if !decoded.text.trim().is_empty() => {
                    tracing::debug!(
                        "Loaded lyrics from {:?} ({})",
                        lyrics_path,
                        decoded.encoding.name()
                    );
                    return Some(decoded.text);
                }
                Ok(_) => tracing::debug!("Lyrics file {:?} is empty", lyrics_path),
                Err(e) => tracing::warn!("Cannot decode {:?}: {}", lyrics_path, e),
            },
            Err(e) => tracing::warn!("Cannot read {:?}: {}", lyrics_path, e),
        }
    }

    let embedded = extract_embedded_lyrics(audio_path)?;
    tracing::debug!("Loaded embedded lyrics from {:?}", audio_path);
    Some(embedded)
}

/// Find lyrics file with same name as audio file
fn find_lyrics_file(audio_path: &Path) -> Option<PathBuf> {
    let parent = audio_path.parent()?;
    let stem = audio_path.file_stem()?.to_str()?;

    for ext in LYRICS_EXTENSIONS {
        let path = parent.join(format!("{}.{}", stem, ext));
        if path.is_file() {
            return Some(path);
        }

        let path = parent.join(format!("{}.{}", stem, ext.to_uppercase()));
        if path.is_file() {
            return Some(path);
        }
    }

    None
}

/// Extract embedded lyrics from audio file
fn extract_embedded_lyrics(audio_path: &Path) -> Option<String> {
    let tagged_file = Probe::open(audio_path).ok()?.read().ok()?;

    let tag = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag())?;

    tag.get_string(&ItemKey::Lyrics)
        .filter(|lyrics| !lyrics.trim().is_empty())
        .map(str::to_string)
}

/// Get lyrics file path for an audio file (if exists)
pub fn get_lyrics_path(audio_path: &Path) -> Option<PathBuf> {
    find_lyrics_file(audio_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::import::DEFAULT_ENCODINGS;

    #[test]
    fn test_sidecar_preferred_in_extension_order() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("song.mp3");
        fs::write(&audio, b"not really audio").unwrap();
        fs::write(dir.path().join("song.txt"), "plain words").unwrap();
        fs::write(dir.path().join("song.srt"), "1\n00:00:01,000 --> 00:00:02,000\nHi").unwrap();

        assert_eq!(get_lyrics_path(&audio), Some(dir.path().join("song.srt")));
        assert_eq!(
            find_lyrics(&audio, DEFAULT_ENCODINGS).as_deref(),
            Some("1\n00:00:01,000 --> 00:00:02,000\nHi")
        );
    }

    #[test]
    fn test_sidecar_decoded_with_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("track.flac");
        fs::write(dir.path().join("track.lrc"), [0xD6, 0xDC, 0xBD, 0xDC, 0xC2, 0xD7]).unwrap();

        assert_eq!(find_lyrics(&audio, DEFAULT_ENCODINGS).as_deref(), Some("周杰伦"));
    }

    #[test]
    fn test_no_lyrics_anywhere() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("silent.mp3");
        fs::write(&audio, b"garbage").unwrap();

        assert_eq!(find_lyrics(&audio, DEFAULT_ENCODINGS), None);
    }
}
