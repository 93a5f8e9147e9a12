//! Feature modules - business logic separated from any host UI
//!
//! Each feature module contains the core logic for a specific functionality.
//! Features never render anything themselves; views implement
//! [`Notifiable`](lyrics::Notifiable).

pub mod import;
pub mod lyrics;
pub mod media;
pub mod player;
pub mod settings;

pub use import::{LyricsFileError, LyricsLibrary, PLACEHOLDER};
pub use media::find_lyrics_for_audio;
pub use player::{AudioRef, PlayerBundle, process_lyrics_input};
pub use settings::{LibrarySettings, PlayerSettings, SaveSettings, Settings, SettingsError};
