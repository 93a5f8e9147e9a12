//! Change detection and parsed-lyrics cache
//!
//! Hosts re-run a lyric loader only when the selected file's fingerprint
//! changes. A fingerprint is either the modification time or an xxh3 hash
//! of the content. [`LyricsCache`] uses the same fingerprint to skip
//! re-reading and re-parsing files that have not changed.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use xxhash_rust::xxh3::xxh3_64;

use crate::features::import::LyricsLibrary;
use crate::features::lyrics::{LyricSet, parse_lyrics};

/// How file changes are detected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerprintMode {
    /// File modification time (cheap, the usual choice)
    #[default]
    ModifiedTime,
    /// xxh3 hash of the file content
    ContentHash,
}

/// Identity of a file's current content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fingerprint {
    /// No file to fingerprint; always reported as changed
    Unavailable,
    Modified(SystemTime),
    Content(u64),
}

impl Fingerprint {
    /// Fingerprint a file. Missing or unreadable files are `Unavailable`.
    pub fn of_file(path: &Path, mode: FingerprintMode) -> Self {
        let result = match mode {
            FingerprintMode::ModifiedTime => fs::metadata(path)
                .and_then(|m| m.modified())
                .map(Fingerprint::Modified),
            FingerprintMode::ContentHash => {
                fs::read(path).map(|bytes| Fingerprint::Content(xxh3_64(&bytes)))
            }
        };

        match result {
            Ok(fingerprint) => fingerprint,
            Err(e) => {
                debug!("No fingerprint for {:?}: {}", path, e);
                Fingerprint::Unavailable
            }
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self, Fingerprint::Unavailable)
    }

    /// Whether content should be reloaded given the previous fingerprint
    pub fn is_changed_from(&self, previous: Option<&Fingerprint>) -> bool {
        match (self, previous) {
            (Fingerprint::Unavailable, _) | (_, None) | (_, Some(Fingerprint::Unavailable)) => {
                true
            }
            (current, Some(previous)) => current != previous,
        }
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Fingerprint::Unavailable => write!(f, "unavailable"),
            Fingerprint::Modified(time) => {
                let secs = time
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs_f64())
                    .unwrap_or(0.0);
                write!(f, "mtime:{:.6}", secs)
            }
            Fingerprint::Content(hash) => write!(f, "xxh3:{:016x}", hash),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    fingerprint: Fingerprint,
    lyrics: Arc<LyricSet>,
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Parsed lyric sets keyed by library file name
#[derive(Debug, Default)]
pub struct LyricsCache {
    entries: HashMap<String, CacheEntry>,
    hits: u64,
    misses: u64,
}

impl LyricsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the parsed set for `name`, re-reading only if it changed.
    ///
    /// Load failures are not cached; their message parses as plain text.
    pub fn get_or_load(&mut self, library: &LyricsLibrary, name: &str) -> Arc<LyricSet> {
        let fingerprint = library.fingerprint(name);

        if let Some(entry) = self.entries.get(name) {
            if !fingerprint.is_changed_from(Some(&entry.fingerprint)) {
                self.hits += 1;
                return Arc::clone(&entry.lyrics);
            }
        }

        self.misses += 1;
        match library.try_load(name) {
            Ok(text) => {
                let lyrics = Arc::new(parse_lyrics(&text));
                if fingerprint.is_available() {
                    self.entries.insert(
                        name.to_string(),
                        CacheEntry {
                            fingerprint,
                            lyrics: Arc::clone(&lyrics),
                        },
                    );
                }
                lyrics
            }
            Err(e) => {
                warn!("{}", e);
                self.entries.remove(name);
                Arc::new(parse_lyrics(&e.to_string()))
            }
        }
    }

    pub fn invalidate(&mut self, name: &str) {
        self.entries.remove(name);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.entries.len(),
        }
    }
}
