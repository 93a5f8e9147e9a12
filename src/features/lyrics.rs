//! Lyrics module - parsing and playback synchronization
//!
//! - `parser`: LRC / SRT / plain text parsing
//! - `timeline`: active-line lookup
//! - `clock`: playback position adapters
//! - `sync`: the sync controller and its notifications

pub mod clock;
pub mod parser;
pub mod sync;
pub mod timeline;

// Re-export commonly used items
pub use clock::{InterpolatedClock, PlaybackClock};
pub use parser::*;
pub use sync::{
    ChangeCause, Notifiable, PlaybackState, SyncController, SyncDriver, SyncNotification,
    SyncState, TailPolicy, TransportEvent,
};
pub use timeline::{binary_search_active, find_active, next_change_ms};
