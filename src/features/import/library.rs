//! Lyric file library
//!
//! Lists, validates, loads and saves lyric files. Files are picked from a
//! flat input directory by name and saved into a separate output directory.
//! Boundary methods (`load`, `save`, `validate_message`) render every
//! failure as a descriptive string instead of returning an error.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::encoding::{DEFAULT_ENCODINGS, EncodingError, decode_with_fallback, encode_for_save};
use super::{LYRICS_EXTENSIONS, is_lyrics_file};
use crate::cache::{Fingerprint, FingerprintMode};
use crate::features::lyrics::{LyricSource, LyricsFormat};
use crate::features::settings::LibrarySettings;

/// Name shown in place of a file when the input directory is empty
pub const PLACEHOLDER: &str = "Put lyric files into the input directory";

/// Lyric file errors
#[derive(Debug, Clone, PartialEq)]
pub enum LyricsFileError {
    NotFound(String),
    UnsupportedFormat(String),
    Decode {
        name: String,
        source: EncodingError,
    },
    Read {
        name: String,
        message: String,
    },
    Encode {
        name: String,
        source: EncodingError,
    },
    Write {
        name: String,
        message: String,
    },
}

impl std::fmt::Display for LyricsFileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LyricsFileError::NotFound(name) => write!(f, "Lyrics file {} does not exist", name),
            LyricsFileError::UnsupportedFormat(_) => {
                let formats: Vec<String> =
                    LYRICS_EXTENSIONS.iter().map(|ext| format!(".{}", ext)).collect();
                write!(
                    f,
                    "Unsupported file format. Supported formats: {}",
                    formats.join(", ")
                )
            }
            LyricsFileError::Decode { name, source } => {
                write!(f, "Cannot decode lyrics file {}: {}", name, source)
            }
            LyricsFileError::Read { name, message } => {
                write!(f, "Error reading lyrics file {}: {}", name, message)
            }
            LyricsFileError::Encode { name, source } => {
                write!(f, "Cannot save lyrics file {}: {}", name, source)
            }
            LyricsFileError::Write { name, message } => {
                write!(f, "Error saving lyrics file {}: {}", name, message)
            }
        }
    }
}

impl std::error::Error for LyricsFileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LyricsFileError::Decode { source, .. } | LyricsFileError::Encode { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }
}

/// Lyric files in an input directory, saved into an output directory
#[derive(Debug, Clone)]
pub struct LyricsLibrary {
    input_dir: PathBuf,
    output_dir: PathBuf,
    encodings: Vec<String>,
    fingerprint_mode: FingerprintMode,
}

impl LyricsLibrary {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            encodings: DEFAULT_ENCODINGS.iter().map(|e| e.to_string()).collect(),
            fingerprint_mode: FingerprintMode::default(),
        }
    }

    pub fn from_settings(settings: &LibrarySettings) -> Self {
        Self::new(settings.input_dir.clone(), settings.output_dir.clone())
            .with_encodings(settings.encodings.clone())
            .with_fingerprint_mode(settings.fingerprint_mode)
    }

    /// Replace the decode fallback chain. An empty list keeps the default.
    pub fn with_encodings(mut self, encodings: Vec<String>) -> Self {
        if !encodings.is_empty() {
            self.encodings = encodings;
        }
        self
    }

    pub fn with_fingerprint_mode(mut self, mode: FingerprintMode) -> Self {
        self.fingerprint_mode = mode;
        self
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn encodings(&self) -> &[String] {
        &self.encodings
    }

    /// Supported files at the top level of the input directory, sorted.
    /// Returns just the placeholder when there are none.
    pub fn list_files(&self) -> Vec<String> {
        let mut files: Vec<String> = WalkDir::new(&self.input_dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && is_lyrics_file(e.path()))
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .collect();

        if files.is_empty() {
            debug!("No lyric files in {:?}", self.input_dir);
            return vec![PLACEHOLDER.to_string()];
        }

        files.sort();
        files
    }

    /// Path of a file in the input directory. Names are plain file names;
    /// anything with a directory component is rejected.
    pub fn path_of(&self, name: &str) -> Option<PathBuf> {
        let file_name = Path::new(name).file_name()?;
        if file_name != name {
            return None;
        }
        Some(self.input_dir.join(file_name))
    }

    pub fn validate(&self, name: &str) -> Result<(), LyricsFileError> {
        if name == PLACEHOLDER {
            return Ok(());
        }

        let path = self
            .path_of(name)
            .filter(|p| p.is_file())
            .ok_or_else(|| LyricsFileError::NotFound(name.to_string()))?;

        if !is_lyrics_file(&path) {
            return Err(LyricsFileError::UnsupportedFormat(name.to_string()));
        }
        Ok(())
    }

    /// `None` when valid, otherwise the message to show the user
    pub fn validate_message(&self, name: &str) -> Option<String> {
        self.validate(name).err().map(|e| e.to_string())
    }

    /// Change fingerprint; `Unavailable` for the placeholder or a missing file
    pub fn fingerprint(&self, name: &str) -> Fingerprint {
        if name == PLACEHOLDER {
            return Fingerprint::Unavailable;
        }
        match self.path_of(name) {
            Some(path) => Fingerprint::of_file(&path, self.fingerprint_mode),
            None => Fingerprint::Unavailable,
        }
    }

    /// Read and decode a file. The placeholder loads as empty text.
    pub fn try_load(&self, name: &str) -> Result<String, LyricsFileError> {
        if name == PLACEHOLDER {
            return Ok(String::new());
        }

        let path = self
            .path_of(name)
            .ok_or_else(|| LyricsFileError::NotFound(name.to_string()))?;

        let bytes = fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => LyricsFileError::NotFound(name.to_string()),
            _ => LyricsFileError::Read {
                name: name.to_string(),
                message: e.to_string(),
            },
        })?;

        let decoded = decode_with_fallback(&bytes, &self.encodings).map_err(|source| {
            LyricsFileError::Decode {
                name: name.to_string(),
                source,
            }
        })?;

        info!(
            "Loaded lyrics file {} ({}, {} chars)",
            name,
            decoded.encoding.name(),
            decoded.text.chars().count()
        );
        Ok(decoded.text)
    }

    /// Like [`try_load`](Self::try_load) but renders failures as text
    pub fn load(&self, name: &str) -> String {
        self.try_load(name).unwrap_or_else(|e| {
            warn!("{}", e);
            e.to_string()
        })
    }

    pub fn entry(&self, name: impl Into<String>) -> LibraryEntry<'_> {
        LibraryEntry {
            library: self,
            name: name.into(),
        }
    }

    /// Write lyrics into the output directory and return the file name used.
    ///
    /// The extension is forced to match `format`.
    pub fn try_save(
        &self,
        lyrics: &str,
        filename: &str,
        format: LyricsFormat,
        encoding: &str,
    ) -> Result<String, LyricsFileError> {
        let filename = file_name_for(filename, format);

        let bytes = encode_for_save(lyrics, encoding).map_err(|source| LyricsFileError::Encode {
            name: filename.clone(),
            source,
        })?;

        let write_error = |e: std::io::Error| LyricsFileError::Write {
            name: filename.clone(),
            message: e.to_string(),
        };
        fs::create_dir_all(&self.output_dir).map_err(write_error)?;
        fs::write(self.output_dir.join(&filename), bytes).map_err(write_error)?;

        info!(
            "Saved lyrics to {:?} ({})",
            self.output_dir.join(&filename),
            encoding
        );
        Ok(filename)
    }

    /// Like [`try_save`](Self::try_save) but renders failures as text
    pub fn save(&self, lyrics: &str, filename: &str, format: LyricsFormat, encoding: &str) -> String {
        self.try_save(lyrics, filename, format, encoding)
            .unwrap_or_else(|e| {
                warn!("{}", e);
                e.to_string()
            })
    }
}

/// Plain file name with the extension replaced to match `format`
fn file_name_for(filename: &str, format: LyricsFormat) -> String {
    let ext = format.extension();
    let name = Path::new(filename.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    if name.to_lowercase().ends_with(&format!(".{}", ext)) {
        return name.to_string();
    }

    let stem = Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("lyrics");
    format!("{}.{}", stem, ext)
}

/// A named file in a [`LyricsLibrary`], usable as a parser source
#[derive(Debug, Clone)]
pub struct LibraryEntry<'a> {
    library: &'a LyricsLibrary,
    name: String,
}

impl LibraryEntry<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Format implied by the file extension
    pub fn format(&self) -> Option<LyricsFormat> {
        Path::new(&self.name)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(LyricsFormat::from_extension)
    }
}

impl LyricSource for LibraryEntry<'_> {
    fn lyric_text(&self) -> String {
        self.library.load(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::lyrics::parse_source;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn library() -> (tempfile::TempDir, LyricsLibrary) {
        let dir = tempfile::tempdir().unwrap();
        let library = LyricsLibrary::new(dir.path().join("input"), dir.path().join("output"));
        fs::create_dir_all(library.input_dir()).unwrap();
        (dir, library)
    }

    #[test]
    fn test_list_files_filters_and_sorts() {
        let (_dir, library) = library();
        for name in ["b.srt", "a.lrc", "c.TXT", "song.mp3", "cover.jpg"] {
            fs::write(library.input_dir().join(name), "x").unwrap();
        }
        fs::create_dir_all(library.input_dir().join("nested.lrc")).unwrap();
        fs::write(library.input_dir().join("nested.lrc").join("deep.lrc"), "x").unwrap();

        assert_eq!(library.list_files(), vec!["a.lrc", "b.srt", "c.TXT"]);
    }

    #[test]
    fn test_list_files_placeholder_when_empty() {
        let (_dir, library) = library();
        assert_eq!(library.list_files(), vec![PLACEHOLDER.to_string()]);

        let missing = LyricsLibrary::new("/no/such/dir", "/tmp");
        assert_eq!(missing.list_files(), vec![PLACEHOLDER.to_string()]);
    }

    #[test]
    fn test_validate_messages() {
        let (_dir, library) = library();
        fs::write(library.input_dir().join("notes.md"), "x").unwrap();
        fs::write(library.input_dir().join("ok.lrc"), "x").unwrap();

        assert_eq!(library.validate_message(PLACEHOLDER), None);
        assert_eq!(library.validate_message("ok.lrc"), None);
        assert_eq!(
            library.validate_message("gone.lrc").unwrap(),
            "Lyrics file gone.lrc does not exist"
        );
        assert_eq!(
            library.validate_message("notes.md").unwrap(),
            "Unsupported file format. Supported formats: .lrc, .srt, .txt"
        );
        assert!(library.validate("../ok.lrc").is_err());
    }

    #[test]
    fn test_load_decodes_gbk() {
        let (_dir, library) = library();
        let mut bytes = b"[00:01.00]".to_vec();
        bytes.extend_from_slice(&[0xD6, 0xDC, 0xBD, 0xDC, 0xC2, 0xD7]);
        fs::write(library.input_dir().join("gbk.lrc"), bytes).unwrap();

        assert_eq!(library.load("gbk.lrc"), "[00:01.00]周杰伦");
        assert_eq!(library.load(PLACEHOLDER), "");
    }

    #[test]
    fn test_load_failures_become_text() {
        let (_dir, library) = library();
        assert_eq!(library.load("gone.lrc"), "Lyrics file gone.lrc does not exist");

        fs::write(library.input_dir().join("bad.lrc"), [0xFF, 0xFF]).unwrap();
        let strict = library.clone().with_encodings(vec!["utf-8".to_string()]);
        assert!(matches!(
            strict.try_load("bad.lrc"),
            Err(LyricsFileError::Decode { .. })
        ));
        assert!(strict.load("bad.lrc").starts_with("Cannot decode lyrics file bad.lrc"));
    }

    #[test]
    fn test_entry_is_a_lyric_source() {
        let (_dir, library) = library();
        fs::write(
            library.input_dir().join("song.lrc"),
            "[00:01.00]Hello\n[00:03.00]World",
        )
        .unwrap();

        let entry = library.entry("song.lrc");
        assert_eq!(entry.format(), Some(LyricsFormat::Lrc));
        let set = parse_source(&entry);
        assert_eq!(set.len(), 2);
        assert_eq!(set.entries()[1].text, "World");
    }

    #[test_case("song.lrc", LyricsFormat::Lrc, "song.lrc")]
    #[test_case("Song.LRC", LyricsFormat::Lrc, "Song.LRC")]
    #[test_case("song.txt", LyricsFormat::Srt, "song.srt")]
    #[test_case("song", LyricsFormat::Plain, "song.txt")]
    #[test_case("", LyricsFormat::Lrc, "lyrics.lrc")]
    #[test_case("../../etc/song.lrc", LyricsFormat::Lrc, "song.lrc")]
    fn test_file_name_for(input: &str, format: LyricsFormat, expected: &str) {
        assert_eq!(file_name_for(input, format), expected);
    }

    #[test]
    fn test_save_writes_encoded_file() {
        let (_dir, library) = library();
        let name = library.save("[00:01.00]周杰伦", "out.txt", LyricsFormat::Lrc, "gbk");
        assert_eq!(name, "out.lrc");

        let bytes = fs::read(library.output_dir().join("out.lrc")).unwrap();
        let mut expected = b"[00:01.00]".to_vec();
        expected.extend_from_slice(&[0xD6, 0xDC, 0xBD, 0xDC, 0xC2, 0xD7]);
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_save_rejects_unmappable_text() {
        let (_dir, library) = library();
        let message = library.save("😀", "emoji", LyricsFormat::Plain, "gb2312");
        assert!(message.starts_with("Cannot save lyrics file emoji.txt"));
        assert!(!library.output_dir().join("emoji.txt").exists());
    }
}
