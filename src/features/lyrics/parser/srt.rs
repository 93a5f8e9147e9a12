//! SubRip (SRT) subtitle parser
//!
//! ```text
//! 1
//! 00:00:12,000 --> 00:00:15,500
//! First line
//! ```
//!
//! Malformed blocks are skipped; they never abort the parse.

use std::fmt::Write;

use once_cell::sync::Lazy;
use regex::Regex;

use super::types::{LyricEntry, LyricSet, LyricsFormat};

/// `HH:MM:SS,mmm --> HH:MM:SS,mmm` (also accepts `.` before the millis)
static TIME_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(\d{1,2}):(\d{2}):(\d{2})[,.](\d{1,3})\s*-->\s*(\d{1,2}):(\d{2}):(\d{2})[,.](\d{1,3})",
    )
    .expect("SRT time range pattern is valid")
});

/// Default length given to an open-ended entry when writing SRT
pub const DEFAULT_CUE_MS: u64 = 5000;

fn capture_time(caps: &regex::Captures<'_>, first: usize) -> Option<u64> {
    let field = |i: usize| -> Option<u64> { caps.get(first + i)?.as_str().parse().ok() };

    let hours = field(0)?;
    let minutes = field(1)?;
    let seconds = field(2)?;
    let millis_str = caps.get(first + 3)?.as_str();
    let mut millis: u64 = millis_str.parse().ok()?;
    // `,5` means half a second, like LRC fractions
    match millis_str.len() {
        1 => millis *= 100,
        2 => millis *= 10,
        _ => {}
    }

    if minutes >= 60 || seconds >= 60 {
        return None;
    }

    Some(hours * 3_600_000 + minutes * 60_000 + seconds * 1000 + millis)
}

/// Parse one `start --> end` line
fn parse_time_range(line: &str) -> Option<(u64, u64)> {
    let caps = TIME_RANGE.captures(line)?;
    let start = capture_time(&caps, 1)?;
    let end = capture_time(&caps, 5)?;
    Some((start, end))
}

/// Split content into blocks separated by blank lines
fn blocks(src: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();

    for line in src.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line.trim_end());
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }

    blocks
}

/// Parse a single block into an entry
fn parse_block(block: &[&str]) -> Option<LyricEntry> {
    // The index line is optional; the time range is the first or second line
    let time_idx = block.iter().take(2).position(|line| line.contains("-->"))?;
    let (start, end) = parse_time_range(block[time_idx])?;
    if end < start {
        return None;
    }

    let text_lines: Vec<&str> = block[time_idx + 1..].iter().map(|l| l.trim()).collect();
    if text_lines.is_empty() {
        return None;
    }

    Some(LyricEntry::new(start, text_lines.join("\n")).with_end(end))
}

/// Parse SRT content. Returns `None` when no block is well formed.
pub fn parse_srt(src: &str) -> Option<LyricSet> {
    let src = src.trim_start_matches('\u{feff}');
    let mut entries = Vec::new();
    let mut skipped = 0usize;

    for block in blocks(src) {
        match parse_block(&block) {
            Some(entry) => entries.push(entry),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        tracing::debug!("Skipped {} malformed SRT blocks", skipped);
    }

    if entries.is_empty() {
        return None;
    }

    Some(LyricSet::new(entries, LyricsFormat::Srt))
}

fn write_timestamp(result: &mut String, time: u64) {
    let ms = time % 1000;
    let sec = (time / 1000) % 60;
    let min = (time / 60_000) % 60;
    let hour = time / 3_600_000;
    let _ = write!(result, "{:02}:{:02}:{:02},{:03}", hour, min, sec, ms);
}

/// Convert lyrics to SRT format string
pub fn stringify_srt(set: &LyricSet) -> String {
    let mut result = String::with_capacity(set.entries().iter().map(|e| e.text.len() + 40).sum());

    for (i, entry) in set.entries().iter().enumerate() {
        let end = entry
            .end_time_ms
            .unwrap_or_else(|| entry.start_time_ms.saturating_add(DEFAULT_CUE_MS));

        let _ = writeln!(result, "{}", i + 1);
        write_timestamp(&mut result, entry.start_time_ms);
        result.push_str(" --> ");
        write_timestamp(&mut result, end);
        result.push('\n');
        result.push_str(&entry.text);
        result.push_str("\n\n");
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "1\n00:00:12,000 --> 00:00:15,500\nFirst line\n\n2\n00:00:17,200 --> 00:00:20,000\nSecond\nwrapped\n";

    #[test]
    fn test_parse_time_range() {
        assert_eq!(
            parse_time_range("00:00:12,000 --> 00:00:15,500"),
            Some((12_000, 15_500))
        );
        assert_eq!(
            parse_time_range("01:02:03.4 --> 01:02:04.05"),
            Some((3_723_400, 3_724_050))
        );
        assert_eq!(parse_time_range("00:00:12,000 -> 00:00:15,500"), None);
        assert_eq!(parse_time_range("00:61:00,000 --> 00:62:00,000"), None);
    }

    #[test]
    fn test_parse_srt() {
        let set = parse_srt(SAMPLE).unwrap();
        assert_eq!(
            set.entries(),
            &[
                LyricEntry::new(12_000, "First line").with_end(15_500),
                LyricEntry::new(17_200, "Second\nwrapped").with_end(20_000),
            ]
        );
        assert_eq!(set.format(), LyricsFormat::Srt);
    }

    #[test]
    fn test_malformed_blocks_are_dropped() {
        let content = "1\n00:00:01,000 --> 00:00:02,000\nA\n\n\
                       2\n00:00:03,000 00:00:04,000\nno arrow\n\n\
                       3\n00:00:xx,000 --> 00:00:06,000\nbad time\n\n\
                       4\n00:00:09,000 --> 00:00:08,000\nbackwards\n\n\
                       5\n00:00:10,000 --> 00:00:11,000\n\n\
                       6\n00:00:12,000 --> 00:00:13,000\nB";
        let set = parse_srt(content).unwrap();
        let texts: Vec<_> = set.entries().iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["A", "B"]);
        for entry in set.entries() {
            assert!(entry.duration_ms().unwrap() <= 1000);
        }
    }

    #[test]
    fn test_missing_index_and_crlf() {
        let set = parse_srt("00:00:01,000 --> 00:00:02,000\r\nHi\r\n").unwrap();
        assert_eq!(set.entries(), &[LyricEntry::new(1000, "Hi").with_end(2000)]);
    }

    #[test]
    fn test_nothing_valid_returns_none() {
        assert_eq!(parse_srt("1\nnot a time\ntext"), None);
        assert_eq!(parse_srt(""), None);
    }

    #[test]
    fn test_stringify_srt() {
        let set = parse_srt(SAMPLE).unwrap();
        let output = stringify_srt(&set);
        assert!(output.starts_with("1\n00:00:12,000 --> 00:00:15,500\nFirst line\n\n"));
        assert_eq!(parse_srt(&output), Some(set));
    }

    #[test]
    fn test_stringify_open_end_uses_default_cue() {
        let set = LyricSet::new(vec![LyricEntry::new(1000, "x")], LyricsFormat::Lrc);
        assert!(stringify_srt(&set).contains("00:00:01,000 --> 00:00:06,000"));
    }
}
