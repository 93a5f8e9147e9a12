//! Lyrics data types
//!
//! A parsed [`LyricSet`] is immutable once built; a new lyric text always
//! produces a fresh set.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Lyrics format enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LyricsFormat {
    /// Standard LRC format [mm:ss.xx]text
    Lrc,
    /// SubRip subtitles (numbered blocks with time ranges)
    Srt,
    /// Untimed text
    #[default]
    Plain,
}

impl LyricsFormat {
    /// Guess the format from a file extension (`lrc`, `srt`, `txt`)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "lrc" => Some(Self::Lrc),
            "srt" => Some(Self::Srt),
            "txt" => Some(Self::Plain),
            _ => None,
        }
    }

    /// File extension used when writing this format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Lrc => "lrc",
            Self::Srt => "srt",
            Self::Plain => "txt",
        }
    }

    /// Whether this format carries per-line timing
    pub fn is_timed(&self) -> bool {
        !matches!(self, Self::Plain)
    }
}

impl std::fmt::Display for LyricsFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LyricsFormat::Lrc => write!(f, "LRC"),
            LyricsFormat::Srt => write!(f, "SRT"),
            LyricsFormat::Plain => write!(f, "PLAIN"),
        }
    }
}

/// A single timed lyric line
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricEntry {
    /// When this line becomes active, in milliseconds
    pub start_time_ms: u64,
    /// When it stops being active; `None` means until superseded
    #[serde(default)]
    pub end_time_ms: Option<u64>,
    /// Line text, possibly empty for an instrumental gap
    #[serde(default)]
    pub text: String,
}

impl LyricEntry {
    pub fn new(start_time_ms: u64, text: impl Into<String>) -> Self {
        Self {
            start_time_ms,
            end_time_ms: None,
            text: text.into(),
        }
    }

    pub fn with_end(mut self, end_time_ms: u64) -> Self {
        self.end_time_ms = Some(end_time_ms);
        self
    }

    /// Check whether `position_ms` falls inside `[start, end)`.
    /// An open end always contains positions after the start.
    pub fn contains(&self, position_ms: u64) -> bool {
        position_ms >= self.start_time_ms
            && self.end_time_ms.is_none_or(|end| position_ms < end)
    }

    /// Length of the explicit interval, if any
    pub fn duration_ms(&self) -> Option<u64> {
        self.end_time_ms
            .map(|end| end.saturating_sub(self.start_time_ms))
    }
}

/// ID tags collected from an LRC header (`[ti:...]`, `[ar:...]`, `[offset:...]`)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Global timing adjustment; positive values show lyrics earlier
    #[serde(default)]
    pub offset_ms: i64,
    /// Any other tag, keyed by its lowercase name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl LyricMetadata {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.artist.is_none()
            && self.album.is_none()
            && self.author.is_none()
            && self.offset_ms == 0
            && self.extra.is_empty()
    }

    /// Record one ID tag. Returns `false` for keys that are not tags.
    pub(crate) fn insert(&mut self, key: &str, value: &str) -> bool {
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim().to_string();
        match key.as_str() {
            "ti" => self.title = Some(value),
            "ar" => self.artist = Some(value),
            "al" => self.album = Some(value),
            "by" => self.author = Some(value),
            "offset" => match value.trim_start_matches('+').parse::<i64>() {
                Ok(offset) => self.offset_ms = offset,
                Err(_) => return false,
            },
            _ => {
                if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphabetic()) {
                    return false;
                }
                self.extra.insert(key, value);
            }
        }
        true
    }
}

/// An ordered, immutable set of lyric entries
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricSet {
    entries: Vec<LyricEntry>,
    format: LyricsFormat,
    #[serde(default, skip_serializing_if = "LyricMetadata::is_empty")]
    metadata: LyricMetadata,
}

impl LyricSet {
    /// Build a set from raw entries, normalizing their order and end times
    pub fn new(mut entries: Vec<LyricEntry>, format: LyricsFormat) -> Self {
        normalize_entries(&mut entries);
        Self {
            entries,
            format,
            metadata: LyricMetadata::default(),
        }
    }

    /// Empty set; what blank input parses to
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn with_metadata(mut self, metadata: LyricMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn entries(&self) -> &[LyricEntry] {
        &self.entries
    }

    pub fn format(&self) -> LyricsFormat {
        self.format
    }

    pub fn metadata(&self) -> &LyricMetadata {
        &self.metadata
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&LyricEntry> {
        self.entries.get(index)
    }

    /// Whether the set carries per-line timing
    pub fn is_timed(&self) -> bool {
        self.format.is_timed() && !self.entries.is_empty()
    }
}

/// Sort entries by start time and fill in open end times.
///
/// The sort is stable so duplicate timestamps keep their input order. An open
/// end becomes the next entry's start when that start is strictly later.
pub fn normalize_entries(entries: &mut [LyricEntry]) {
    entries.sort_by_key(|entry| entry.start_time_ms);

    for i in 0..entries.len() {
        if entries[i].end_time_ms.is_some() {
            continue;
        }
        let start = entries[i].start_time_ms;
        if let Some(next) = entries.get(i + 1) {
            if next.start_time_ms > start {
                entries[i].end_time_ms = Some(next.start_time_ms);
            }
        }
    }
}
