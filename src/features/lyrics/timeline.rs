//! Active-line lookup over a sorted entry list
//!
//! Entries stay active until a later entry starts, so the active line is the
//! last one whose start is at or before the position. When several entries
//! share a start time the last of them wins.
//!
//! Playback mostly moves forward in small steps, so [`find_active`] first
//! probes around the previous index and only falls back to a binary search
//! after a jump.

use super::parser::LyricEntry;

/// Offsets from the hint probed before binary searching
const PROBE_OFFSETS: [isize; 3] = [0, 1, -1];

/// Whether `index` is the active entry at `position_ms`
fn is_active_at(entries: &[LyricEntry], index: usize, position_ms: u64) -> bool {
    let Some(entry) = entries.get(index) else {
        return false;
    };
    entry.start_time_ms <= position_ms
        && entries
            .get(index + 1)
            .is_none_or(|next| next.start_time_ms > position_ms)
}

/// Hint-free lookup: O(log n) over start times
pub fn binary_search_active(entries: &[LyricEntry], position_ms: u64) -> Option<usize> {
    entries
        .partition_point(|entry| entry.start_time_ms <= position_ms)
        .checked_sub(1)
}

/// Find the active entry, reusing the previous index as a hint
pub fn find_active(entries: &[LyricEntry], position_ms: u64, hint: Option<usize>) -> Option<usize> {
    let first = entries.first()?;
    if position_ms < first.start_time_ms {
        return None;
    }

    if let Some(hint) = hint {
        for offset in PROBE_OFFSETS {
            if let Some(candidate) = hint.checked_add_signed(offset) {
                if is_active_at(entries, candidate, position_ms) {
                    return Some(candidate);
                }
            }
        }
    }

    binary_search_active(entries, position_ms)
}

/// Start time of the next line change after `active`
///
/// With nothing active this is the first entry's start. Entries sharing the
/// active entry's start are skipped.
pub fn next_change_ms(entries: &[LyricEntry], active: Option<usize>) -> Option<u64> {
    match active {
        None => entries.first().map(|entry| entry.start_time_ms),
        Some(index) => {
            let current = entries.get(index)?.start_time_ms;
            entries[index + 1..]
                .iter()
                .map(|entry| entry.start_time_ms)
                .find(|&start| start > current)
        }
    }
}
