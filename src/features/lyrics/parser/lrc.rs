//! Standard LRC format parser
//!
//! Supports the common [mm:ss.xx]text format with line-level synchronization,
//! repeated tags (`[00:12.00][01:30.00]chorus`), ID tags and `[offset:]`.

use std::fmt::Write;

use super::types::{LyricEntry, LyricMetadata, LyricSet, LyricsFormat};

/// Parse timestamp from LRC format: [mm:ss], [mm:ss.x..] or [mm:ss:xx]
///
/// Returns the number of bytes consumed and the time in milliseconds. The
/// fraction is a decimal fraction of a second whatever its digit count.
fn parse_time(src: &str) -> Option<(usize, u64)> {
    if !src.starts_with('[') {
        return None;
    }

    let end_bracket = src.find(']')?;
    let time_str = &src[1..end_bracket];

    let (min_str, rest) = time_str.split_once(':')?;
    let (sec_str, frac_str) = match rest.find(['.', ':']) {
        Some(idx) => (&rest[..idx], Some(&rest[idx + 1..])),
        None => (rest, None),
    };

    let min = parse_digits(min_str)?;
    let sec = parse_digits(sec_str)?;
    let ms = match frac_str {
        Some(frac) => parse_fraction(frac)?,
        None => 0,
    };

    let time_ms = min
        .checked_mul(60_000)?
        .checked_add(sec.checked_mul(1000)?)?
        .checked_add(ms)?;

    Some((end_bracket + 1, time_ms))
}

fn parse_digits(s: &str) -> Option<u64> {
    let s = s.trim();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Scale a fractional-second digit string to milliseconds.
/// `5` -> 500, `50` -> 500, `500` -> 500, `5009` -> 500
fn parse_fraction(frac: &str) -> Option<u64> {
    let frac = frac.trim();
    if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let digits = &frac[..frac.len().min(3)];
    let value: u64 = digits.parse().ok()?;
    Some(match digits.len() {
        1 => value * 100,
        2 => value * 10,
        _ => value,
    })
}

/// Parse an ID tag like `[ar:Artist]` into key and value
fn parse_id_tag(line: &str) -> Option<(&str, &str)> {
    let inner = line.strip_prefix('[')?.strip_suffix(']')?;
    let (key, value) = inner.split_once(':')?;
    if key.chars().next()?.is_alphabetic() {
        Some((key, value))
    } else {
        None
    }
}

/// Classification of a single LRC line
#[derive(Debug, PartialEq)]
enum Line<'a> {
    /// One or more leading timestamps followed by text
    Timed { stamps: Vec<u64>, text: &'a str },
    /// Header tag such as `[ti:Title]`
    Tag { key: &'a str, value: &'a str },
    /// Anything else; ignored for timing
    Untimed,
}

/// Parse a single LRC line, which may have multiple timestamps
fn parse_line(line: &str) -> Line<'_> {
    let line = line.trim();
    let mut stamps = Vec::new();
    let mut pos = 0;

    // Extract all timestamps at the beginning
    while pos < line.len() {
        match parse_time(&line[pos..]) {
            Some((consumed, time)) => {
                stamps.push(time);
                pos += consumed;
            }
            None => break,
        }
    }

    if !stamps.is_empty() {
        return Line::Timed {
            stamps,
            text: line[pos..].trim(),
        };
    }

    match parse_id_tag(line) {
        Some((key, value)) => Line::Tag { key, value },
        None => Line::Untimed,
    }
}

/// Find every timestamp tag in `line`, returning (tag start, tag end, time)
fn scan_tags(line: &str) -> Vec<(usize, usize, u64)> {
    line.match_indices('[')
        .filter_map(|(idx, _)| {
            parse_time(&line[idx..]).map(|(consumed, time)| (idx, idx + consumed, time))
        })
        .collect()
}

/// Split a packed single-line input (`[00:00.13]a[00:02.93]b`) into segments.
///
/// Adjacent tags with nothing between them share the next non-empty text;
/// tags with no text after them are dropped.
fn parse_packed(line: &str) -> Vec<(u64, String)> {
    let tags = scan_tags(line);
    let mut result = Vec::new();
    let mut pending = Vec::new();

    for (i, &(_, tag_end, time)) in tags.iter().enumerate() {
        pending.push(time);
        let text_end = tags.get(i + 1).map(|next| next.0).unwrap_or(line.len());
        let text = line[tag_end..text_end].trim();
        if text.is_empty() {
            continue;
        }
        for stamp in pending.drain(..) {
            result.push((stamp, text.to_string()));
        }
    }

    result
}

fn is_packed(line: &str) -> bool {
    match parse_line(line) {
        Line::Timed { text, .. } => !scan_tags(text).is_empty(),
        _ => false,
    }
}

/// Strip leading ID tags (`[ti:Song][ar:Someone]...`) off a line,
/// recording them in `metadata`
fn take_id_tags<'a>(mut line: &'a str, metadata: &mut LyricMetadata) -> &'a str {
    while let Some(end) = line.find(']') {
        let Some((key, value)) = parse_id_tag(&line[..=end]) else {
            break;
        };
        if !metadata.insert(key, value) {
            tracing::debug!("Ignoring malformed LRC tag [{}:{}]", key, value);
        }
        line = line[end + 1..].trim_start();
    }
    line
}

fn collect_lines(src: &str, raw: &mut Vec<(u64, String)>, metadata: &mut LyricMetadata) {
    for line in src.lines() {
        match parse_line(line) {
            Line::Timed { stamps, text } => {
                for stamp in stamps {
                    raw.push((stamp, text.to_string()));
                }
            }
            Line::Tag { key, value } => {
                if !metadata.insert(key, value) {
                    tracing::debug!("Ignoring malformed LRC tag [{}:{}]", key, value);
                }
            }
            Line::Untimed => {}
        }
    }
}

fn apply_offset(time: u64, offset_ms: i64) -> u64 {
    if offset_ms >= 0 {
        time.saturating_sub(offset_ms.unsigned_abs())
    } else {
        time.saturating_add(offset_ms.unsigned_abs())
    }
}

/// Parse LRC content into a lyric set.
///
/// Returns `None` when no line carries a timestamp tag, so the caller can
/// fall back to plain text.
pub fn parse_lrc(src: &str) -> Option<LyricSet> {
    let src = src.trim_start_matches('\u{feff}');
    let mut metadata = LyricMetadata::default();
    let mut raw: Vec<(u64, String)> = Vec::new();

    let trimmed = src.trim();
    if trimmed.contains('\n') {
        collect_lines(src, &mut raw, &mut metadata);
    } else {
        // Single line: header tags may precede a packed run of timestamps
        let line = take_id_tags(trimmed, &mut metadata);
        if is_packed(line) {
            raw = parse_packed(line);
        } else {
            collect_lines(line, &mut raw, &mut metadata);
        }
    }

    if raw.is_empty() {
        return None;
    }

    let offset_ms = metadata.offset_ms;
    let entries = raw
        .into_iter()
        .map(|(time, text)| LyricEntry::new(apply_offset(time, offset_ms), text))
        .collect();

    Some(LyricSet::new(entries, LyricsFormat::Lrc).with_metadata(metadata))
}

/// Write timestamp in LRC format
pub fn write_timestamp(result: &mut String, time: u64) {
    let ms = time % 1000;
    let sec = (time / 1000) % 60;
    let min = time / 60000;
    // Writing into a String cannot fail
    let _ = write!(result, "[{:02}:{:02}.{:03}]", min, sec, ms);
}

/// Convert lyrics to LRC format string
///
/// The offset tag is not written back: entry times already include it.
pub fn stringify_lrc(set: &LyricSet) -> String {
    let capacity: usize = set.entries().iter().map(|x| x.text.len() + 12).sum();
    let mut result = String::with_capacity(capacity);

    let meta = set.metadata();
    let tags = [
        ("ti", meta.title.as_deref()),
        ("ar", meta.artist.as_deref()),
        ("al", meta.album.as_deref()),
        ("by", meta.author.as_deref()),
    ];
    for (key, value) in tags {
        if let Some(value) = value {
            let _ = writeln!(result, "[{}:{}]", key, value);
        }
    }
    for (key, value) in &meta.extra {
        let _ = writeln!(result, "[{}:{}]", key, value);
    }

    for entry in set.entries() {
        write_timestamp(&mut result, entry.start_time_ms);
        // Multi-line SRT text collapses onto one LRC line
        result.push_str(&entry.text.replace('\n', " "));
        result.push('\n');
    }

    result
}
