//! Lyrics parsing module
//!
//! Supports:
//! - LRC: Standard line-level lyrics [mm:ss.xx]text
//! - SRT: SubRip subtitle blocks
//! - Plain text fallback (untimed)
//!
//! Parsing never fails: anything unrecognized degrades to a plain set.

mod lrc;
mod srt;
mod types;

pub use lrc::{stringify_lrc, write_timestamp};
pub use srt::{DEFAULT_CUE_MS, stringify_srt};
pub use types::*;

/// Anything that can hand raw (already decoded) lyric text to the parser
pub trait LyricSource {
    fn lyric_text(&self) -> String;
}

impl LyricSource for str {
    fn lyric_text(&self) -> String {
        self.to_string()
    }
}

impl LyricSource for String {
    fn lyric_text(&self) -> String {
        self.clone()
    }
}

impl<T: LyricSource + ?Sized> LyricSource for &T {
    fn lyric_text(&self) -> String {
        (**self).lyric_text()
    }
}

/// Detect lyrics format from content
pub fn detect_format(content: &str) -> LyricsFormat {
    parse_lyrics(content).format()
}

/// Parse lyrics from string content
///
/// SRT is tried first when the text contains an arrow, then LRC, then the
/// whole text becomes a single untimed entry.
pub fn parse_lyrics(content: &str) -> LyricSet {
    if content.trim().is_empty() {
        return LyricSet::empty();
    }

    if content.contains("-->") {
        if let Some(set) = srt::parse_srt(content) {
            return set;
        }
    }

    lrc::parse_lrc(content).unwrap_or_else(|| parse_plain(content))
}

/// Parse lyrics with specified format, falling back to plain text when the
/// forced parser finds nothing
pub fn parse_lyrics_with_format(content: &str, format: LyricsFormat) -> LyricSet {
    if content.trim().is_empty() {
        return LyricSet::empty();
    }

    let parsed = match format {
        LyricsFormat::Lrc => lrc::parse_lrc(content),
        LyricsFormat::Srt => srt::parse_srt(content),
        LyricsFormat::Plain => None,
    };

    parsed.unwrap_or_else(|| parse_plain(content))
}

/// Parse lyrics from any source
pub fn parse_source<S: LyricSource + ?Sized>(source: &S) -> LyricSet {
    parse_lyrics(&source.lyric_text())
}

/// Untimed text: one entry at 0 spanning the whole track
fn parse_plain(content: &str) -> LyricSet {
    let text = content.trim_start_matches('\u{feff}').trim();
    if text.is_empty() {
        return LyricSet::empty();
    }
    LyricSet::new(vec![LyricEntry::new(0, text)], LyricsFormat::Plain)
}

impl LyricSet {
    /// Serialize as LRC
    pub fn to_lrc(&self) -> String {
        stringify_lrc(self)
    }

    /// Serialize as SRT; open-ended entries get a default cue length
    pub fn to_srt(&self) -> String {
        stringify_srt(self)
    }

    /// Serialize in the given format. Plain output is the bare text lines.
    pub fn to_format(&self, format: LyricsFormat) -> String {
        match format {
            LyricsFormat::Lrc => self.to_lrc(),
            LyricsFormat::Srt => self.to_srt(),
            LyricsFormat::Plain => self
                .entries()
                .iter()
                .map(|e| e.text.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_detect_lrc() {
        let content = "[00:01.12]First line\n[00:05.00]Second line";
        assert_eq!(detect_format(content), LyricsFormat::Lrc);
    }

    #[test]
    fn test_detect_srt() {
        let content = "1\n00:00:01,000 --> 00:00:02,000\nHi";
        assert_eq!(detect_format(content), LyricsFormat::Srt);
    }

    #[test]
    fn test_arrow_in_lrc_text_stays_lrc() {
        let content = "[00:01.00]left --> right\n[00:02.00]next";
        let set = parse_lyrics(content);
        assert_eq!(set.format(), LyricsFormat::Lrc);
        assert_eq!(set.entries()[0].text, "left --> right");
    }

    #[test]
    fn test_plain_fallback() {
        let set = parse_lyrics("  just some notes \n");
        assert_eq!(set.format(), LyricsFormat::Plain);
        assert_eq!(set.entries(), &[LyricEntry::new(0, "just some notes")]);
        assert!(!set.is_timed());
    }

    #[test]
    fn test_empty_input() {
        for input in ["", "   ", "\n\n"] {
            let set = parse_lyrics(input);
            assert!(set.is_empty());
            assert_eq!(set.format(), LyricsFormat::Plain);
        }
    }

    #[test]
    fn test_parse_is_idempotent() {
        let content = "[00:03.00]b\n[00:01.00]a\n[00:01.00]a2";
        assert_eq!(parse_lyrics(content), parse_lyrics(content));
    }

    #[test]
    fn test_forced_format_degrades_to_plain() {
        let set = parse_lyrics_with_format("[00:01.00]x", LyricsFormat::Srt);
        assert_eq!(set.format(), LyricsFormat::Plain);
        assert_eq!(set.entries()[0].text, "[00:01.00]x");

        let set = parse_lyrics_with_format("[00:01.00]x", LyricsFormat::Lrc);
        assert_eq!(set.format(), LyricsFormat::Lrc);
    }

    #[test]
    fn test_parse_source() {
        let owned = String::from("[00:01.00]Hello");
        assert_eq!(parse_source(&owned).len(), 1);
        assert_eq!(parse_source("notes").format(), LyricsFormat::Plain);
    }

    #[test]
    fn test_convert_srt_to_lrc() {
        let set = parse_lyrics("1\n00:00:01,000 --> 00:00:02,000\nHi\nthere");
        assert_eq!(set.to_lrc(), "[00:01.000]Hi there\n");
        assert_eq!(set.to_format(LyricsFormat::Plain), "Hi\nthere");
    }
}
