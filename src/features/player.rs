//! Player bundle
//!
//! The audio reference, lyrics and display options handed to a player
//! view. Hosts that transport UI payloads as JSON wrap every value in a
//! one-element array; [`PlayerBundle::to_host_ui`] and
//! [`PlayerBundle::from_host_ui`] are the only places that wrapping exists.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::features::media::display_name;
use crate::features::settings::PlayerSettings;

/// Location of an audio file known to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioRef {
    pub filename: String,
    #[serde(default)]
    pub subfolder: String,
    /// Host storage area (`output`, `input`, `temp`)
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
}

fn default_kind() -> String {
    "output".to_string()
}

impl AudioRef {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            subfolder: String::new(),
            kind: default_kind(),
        }
    }

    pub fn with_subfolder(mut self, subfolder: impl Into<String>) -> Self {
        self.subfolder = subfolder.into();
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    /// Host-relative URL the audio can be fetched from
    pub fn view_url(&self) -> String {
        let kind = if self.kind.is_empty() { "output" } else { &self.kind };
        let mut url = format!(
            "/view?filename={}&type={}",
            urlencoding::encode(&self.filename),
            kind
        );
        if !self.subfolder.is_empty() {
            url.push_str("&subfolder=");
            url.push_str(&urlencoding::encode(&self.subfolder));
        }
        url
    }
}

/// Errors reading a host UI payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleError {
    NotAnObject,
    MissingAudio,
    InvalidAudio(String),
}

impl std::fmt::Display for BundleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BundleError::NotAnObject => write!(f, "UI payload is not an object"),
            BundleError::MissingAudio => write!(f, "UI payload has no audio entry"),
            BundleError::InvalidAudio(e) => write!(f, "Invalid audio entry: {}", e),
        }
    }
}

impl std::error::Error for BundleError {}

/// Everything a player view needs to start playback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerBundle {
    pub audio: AudioRef,
    /// Raw lyric text; parsed by the view's sync controller
    pub lyrics: Option<String>,
    /// Title shown by the player
    pub filename: String,
    pub autoplay: bool,
    pub show_visualizer: bool,
}

impl PlayerBundle {
    pub fn new(audio: AudioRef, lyrics: Option<String>) -> Self {
        let filename = display_name(Path::new(&audio.filename));
        Self {
            audio,
            lyrics,
            filename,
            autoplay: true,
            show_visualizer: true,
        }
    }

    pub fn with_settings(mut self, settings: &PlayerSettings) -> Self {
        self.autoplay = settings.autoplay;
        self.show_visualizer = settings.show_visualizer;
        self
    }

    pub fn display_name(&self) -> &str {
        &self.filename
    }

    /// Whether there is any lyric text worth showing
    pub fn has_lyrics(&self) -> bool {
        self.lyrics.as_deref().is_some_and(|l| !l.trim().is_empty())
    }

    /// The visualizer is shown by default only when there are no lyrics
    pub fn starts_with_visualizer(&self) -> bool {
        self.show_visualizer && !self.has_lyrics()
    }

    /// Host payload with every value wrapped in a one-element array
    pub fn to_host_ui(&self) -> Value {
        let mut ui = Map::new();
        ui.insert("audio".to_string(), json!([self.audio]));
        if let Some(lyrics) = &self.lyrics {
            ui.insert("lyrics".to_string(), json!([lyrics]));
        }
        ui.insert("filename".to_string(), json!([self.filename]));
        ui.insert("autoplay".to_string(), json!([self.autoplay]));
        ui.insert("show_visualizer".to_string(), json!([self.show_visualizer]));
        Value::Object(ui)
    }

    /// Read a host payload. Values may be wrapped in arrays or bare; lyric
    /// arrays with several elements are joined with newlines.
    pub fn from_host_ui(ui: &Value) -> Result<Self, BundleError> {
        let ui = ui.as_object().ok_or(BundleError::NotAnObject)?;

        let audio = ui
            .get("audio")
            .and_then(|v| unwrap_scalar(v).cloned())
            .ok_or(BundleError::MissingAudio)?;
        let audio: AudioRef = serde_json::from_value(audio)
            .map_err(|e| BundleError::InvalidAudio(e.to_string()))?;

        let lyrics = ["lyrics", "lyric", "text"]
            .iter()
            .find_map(|key| ui.get(*key))
            .and_then(lyrics_text);

        let mut bundle = Self::new(audio, lyrics);
        if let Some(name) = ui
            .get("filename")
            .and_then(unwrap_scalar)
            .and_then(Value::as_str)
        {
            bundle.filename = name.to_string();
        }
        if let Some(autoplay) = ui.get("autoplay").and_then(unwrap_scalar).and_then(Value::as_bool) {
            bundle.autoplay = autoplay;
        }
        if let Some(show) = ui
            .get("show_visualizer")
            .and_then(unwrap_scalar)
            .and_then(Value::as_bool)
        {
            bundle.show_visualizer = show;
        }
        Ok(bundle)
    }
}

fn unwrap_scalar(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.first(),
        Value::Null => None,
        other => Some(other),
    }
}

fn lyrics_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(lyrics_text).collect();
            (!parts.is_empty()).then(|| parts.join("\n"))
        }
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Clean up lyrics typed or pasted by the user
pub fn process_lyrics_input(text: &str) -> String {
    text.trim().to_string()
}
