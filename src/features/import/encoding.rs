//! Encoding detection and conversion for lyric files
//!
//! Lyric files from older players are often saved as GBK or UTF-16 rather
//! than UTF-8. Decoding walks a configurable list of encodings and keeps the
//! first one that decodes without errors.

use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};

/// Default fallback chain, tried in order
///
/// 1. UTF-8 (standard)
/// 2. GBK (Simplified Chinese)
/// 3. GB2312 (resolves to GBK)
/// 4. UTF-16 (little endian without a BOM)
/// 5. Latin-1 (maps every byte, accepted as-is)
pub const DEFAULT_ENCODINGS: &[&str] = &["utf-8", "gbk", "gb2312", "utf-16", "latin1"];

/// Encodings lyric files can be saved in
pub const SAVE_ENCODINGS: &[&str] = &["utf-8", "gbk", "gb2312"];

/// Successfully decoded text and the encoding that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub text: String,
    pub encoding: &'static Encoding,
}

/// Encoding errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// Label not known to the WHATWG encoding registry
    UnknownLabel(String),
    /// Every encoding in the chain failed
    Undecodable { tried: Vec<String> },
    /// Text cannot be represented in the target encoding
    Unmappable { encoding: String },
    /// Encoding can be decoded but not written
    UnsupportedForSave(String),
}

impl std::fmt::Display for EncodingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EncodingError::UnknownLabel(label) => write!(f, "Unknown encoding: {}", label),
            EncodingError::Undecodable { tried } => {
                write!(f, "Could not decode text (tried {})", tried.join(", "))
            }
            EncodingError::Unmappable { encoding } => {
                write!(f, "Text contains characters that cannot be saved as {}", encoding)
            }
            EncodingError::UnsupportedForSave(label) => {
                write!(
                    f,
                    "Cannot save as {}. Supported encodings: {}",
                    label,
                    SAVE_ENCODINGS.join(", ")
                )
            }
        }
    }
}

impl std::error::Error for EncodingError {}

/// Resolve an encoding label such as `utf-8`, `gbk` or `latin1`
pub fn resolve_label(label: &str) -> Result<&'static Encoding, EncodingError> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| EncodingError::UnknownLabel(label.to_string()))
}

/// Decode bytes with a byte order mark if present, otherwise with the first
/// encoding in `labels` that decodes cleanly
///
/// Unknown labels are logged and skipped. A label that resolves to an
/// encoding already tried (`gb2312` after `gbk`) is not retried.
pub fn decode_with_fallback<S: AsRef<str>>(
    bytes: &[u8],
    labels: &[S],
) -> Result<Decoded, EncodingError> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        if let Some(text) =
            encoding.decode_without_bom_handling_and_without_replacement(&bytes[bom_len..])
        {
            return Ok(Decoded {
                text: text.into_owned(),
                encoding,
            });
        }
    }

    let mut tried: Vec<&'static Encoding> = Vec::new();
    for label in labels {
        let encoding = match resolve_label(label.as_ref()) {
            Ok(encoding) => encoding,
            Err(e) => {
                tracing::warn!("{}", e);
                continue;
            }
        };
        if tried.contains(&encoding) {
            continue;
        }
        tried.push(encoding);

        if let Some(text) = decode_strict(bytes, encoding) {
            return Ok(Decoded {
                text: text.into_owned(),
                encoding,
            });
        }
    }

    Err(EncodingError::Undecodable {
        tried: tried.iter().map(|e| e.name().to_string()).collect(),
    })
}

fn decode_strict<'a>(bytes: &'a [u8], encoding: &'static Encoding) -> Option<Cow<'a, str>> {
    let text = encoding.decode_without_bom_handling_and_without_replacement(bytes)?;
    // Legacy multi-byte encodings accept a lot of byte soup; reject
    // garbage-looking output. Latin-1 is the last resort and always wins.
    if encoding == UTF_8 || encoding == WINDOWS_1252 || is_likely_valid_text(&text) {
        Some(text)
    } else {
        None
    }
}

/// Encode text for saving. Only UTF-8 and GBK-family encodings are writable.
pub fn encode_for_save(text: &str, label: &str) -> Result<Vec<u8>, EncodingError> {
    let encoding = resolve_label(label)?;
    if encoding.output_encoding() != encoding {
        return Err(EncodingError::UnsupportedForSave(label.to_string()));
    }

    let (bytes, _, had_unmappable) = encoding.encode(text);
    if had_unmappable {
        return Err(EncodingError::Unmappable {
            encoding: label.to_string(),
        });
    }
    Ok(bytes.into_owned())
}

/// Heuristic check if decoded text looks valid
fn is_likely_valid_text(s: &str) -> bool {
    if s.is_empty() {
        return true;
    }

    // Count suspicious characters
    let suspicious_count = s
        .chars()
        .filter(|c| {
            // Control characters (except common whitespace)
            (*c < ' ' && *c != '\t' && *c != '\n' && *c != '\r') ||
            // Private use area
            ('\u{E000}'..='\u{F8FF}').contains(c) ||
            // Replacement character
            *c == '\u{FFFD}'
        })
        .count();

    // Allow up to 5% suspicious characters
    let threshold = (s.len() / 20).max(1);
    suspicious_count <= threshold
}
