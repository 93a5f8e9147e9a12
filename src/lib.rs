//! lyric-player - audio player core with synchronized lyric display
//!
//! Parses LRC / SRT / plain lyric text, tracks which line is active as
//! playback moves, and notifies a view when that changes.

pub mod cache;
pub mod features;
pub mod utils;

pub use cache::{Fingerprint, FingerprintMode, LyricsCache};
pub use features::lyrics::{
    LyricEntry, LyricSet, LyricsFormat, Notifiable, SyncController, SyncNotification,
    TailPolicy, TransportEvent, parse_lyrics,
};
pub use features::{LyricsLibrary, PlayerBundle, Settings};
