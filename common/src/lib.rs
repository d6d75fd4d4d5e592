//! Common types and utilities for Marquee.
//!
//! This crate defines the shared data model and IPC protocol used for
//! communication between the player daemon (`marquee`) and the control
//! client (`mqctl`).
//!
//! # IPC Protocol
//!
//! Communication happens over a Unix domain socket using newline-delimited
//! JSON. The client sends [`Command`] variants and receives [`Response`]
//! variants. User input (keys, pointer movement, clicks) and environment
//! notifications (fullscreen changes) travel as [`Command::Input`].
//!
//! # Examples
//!
//! ```no_run
//! use common::{Command, InputEvent, Key};
//!
//! // Forward a space-bar press from the front end
//! let cmd = Command::Input(InputEvent::Key(Key::Space));
//!
//! // Serialize for sending over IPC
//! let json = serde_json::to_string(&cmd).unwrap();
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Common error types shared between client and daemon.
///
/// All errors are serializable for transmission over IPC.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlayerError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("IPC error: {0}")]
    Ipc(String),

    #[error("Playlist error: {0}")]
    Playlist(String),

    #[error("Media error: {0}")]
    Media(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl From<std::io::Error> for PlayerError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<serde_json::Error> for PlayerError {
    fn from(e: serde_json::Error) -> Self {
        Self::Ipc(e.to_string())
    }
}

/// How the active entry is rendered and how much of it can be controlled.
///
/// Derived from the entry URL, never trusted from playlist metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceVariant {
    /// First external embed family (YouTube-style player). Opaque surface.
    ExternalEmbedA,
    /// Second external embed family (ok.ru-style player). Opaque surface.
    ExternalEmbedB,
    /// Directly controllable media element.
    Direct,
}

impl SourceVariant {
    /// Whether the unified control bar can drive this source.
    pub fn is_direct(&self) -> bool {
        matches!(self, Self::Direct)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ExternalEmbedA => "embed-a",
            Self::ExternalEmbedB => "embed-b",
            Self::Direct => "direct",
        }
    }
}

/// A subtitle or audio track advertised by a playlist entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackSource {
    pub label: String,
    pub src: String,
}

/// The `type` field of a playlist entry.
///
/// Display-only. Both the generic names (`embedA`, `embedB`, `standard`) and
/// the provider names (`youtube`, `okru`) are accepted; anything else is kept
/// verbatim so a single odd entry never fails the whole playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum DeclaredType {
    EmbedA,
    EmbedB,
    #[default]
    Standard,
    Other(String),
}

impl From<String> for DeclaredType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "embedA" | "youtube" => Self::EmbedA,
            "embedB" | "okru" => Self::EmbedB,
            "standard" => Self::Standard,
            _ => Self::Other(s),
        }
    }
}

impl From<DeclaredType> for String {
    fn from(t: DeclaredType) -> Self {
        t.label().to_string()
    }
}

impl DeclaredType {
    /// Label shown on the playlist selector
    pub fn label(&self) -> &str {
        match self {
            Self::EmbedA => "embedA",
            Self::EmbedB => "embedB",
            Self::Standard => "standard",
            Self::Other(s) => s,
        }
    }
}

/// One playlist entry as stored in the playlist source file.
///
/// ```
/// use common::PlaylistEntry;
///
/// let json = r#"{"url": "/video.mp4", "name": "Intro", "type": "standard"}"#;
/// let entry: PlaylistEntry = serde_json::from_str(json).unwrap();
/// assert_eq!(entry.display_name, "Intro");
/// assert!(entry.subtitle_tracks.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    pub url: String,

    #[serde(rename = "name", default)]
    pub display_name: String,

    #[serde(rename = "type", default)]
    pub declared_type: DeclaredType,

    #[serde(rename = "subtitles", default)]
    pub subtitle_tracks: Vec<TrackSource>,

    #[serde(rename = "audioTracks", default)]
    pub audio_tracks: Vec<TrackSource>,
}

impl PlaylistEntry {
    /// Whether `label` names one of this entry's subtitle tracks
    pub fn has_subtitle(&self, label: &str) -> bool {
        self.subtitle_tracks.iter().any(|t| t.label == label)
    }
}

/// Visual filter channels applied to the direct media surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterChannel {
    Brightness,
    Contrast,
    Saturation,
}

impl FilterChannel {
    pub const ALL: [FilterChannel; 3] = [Self::Brightness, Self::Contrast, Self::Saturation];

    /// Parse channel name from string
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "brightness" | "bright" => Some(Self::Brightness),
            "contrast" => Some(Self::Contrast),
            "saturation" | "saturate" | "sat" => Some(Self::Saturation),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Brightness => "brightness",
            Self::Contrast => "contrast",
            Self::Saturation => "saturation",
        }
    }

    /// CSS filter function name for this channel
    pub fn css_function(&self) -> &'static str {
        match self {
            Self::Brightness => "brightness",
            Self::Contrast => "contrast",
            Self::Saturation => "saturate",
        }
    }
}

/// Physical keys the player understands. Anything else arrives as `Char`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Space,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Char(char),
}

impl Key {
    /// Parse a key name as a front end would report it (`" "`, `"ArrowLeft"`, `"f"`).
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            " " | "space" | "Space" => Some(Self::Space),
            "ArrowLeft" | "left" => Some(Self::ArrowLeft),
            "ArrowRight" | "right" => Some(Self::ArrowRight),
            "ArrowUp" | "up" => Some(Self::ArrowUp),
            "ArrowDown" | "down" => Some(Self::ArrowDown),
            _ => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(Self::Char(c)),
                    _ => None,
                }
            }
        }
    }
}

/// Input and environment notifications forwarded by a front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    /// Pointer entered the player container
    PointerEnter,
    /// Pointer left the player container
    PointerLeave,
    /// Pointer moved over the player container
    PointerMove,
    /// Single click on the player surface.
    ///
    /// `y` is measured from the top of the container, `height` is the
    /// container height, both in the same unit as the control-bar height.
    Click { y: f32, height: f32 },
    /// Key press
    Key(Key),
    /// Scrub gesture started on the timeline at `time` seconds
    ScrubStart { time: f64 },
    /// Scrub gesture moved to `time` seconds
    ScrubMove { time: f64 },
    /// Scrub gesture released at `time` seconds (seeks there)
    ScrubCommit { time: f64 },
    /// Scrub gesture ended
    ScrubEnd,
    /// The environment reports the fullscreen state changed, for any reason
    FullscreenChanged { active: bool },
}

/// Commands sent from client to daemon via IPC.
///
/// # Examples
///
/// ```
/// use common::{Command, FilterChannel};
///
/// let cmd = Command::SetFilter {
///     channel: FilterChannel::Brightness,
///     value: 120,
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Ping the daemon
    Ping,
    /// Query the player status snapshot
    Status,
    /// Kill the daemon
    Kill,
    /// List playlist entries
    ListPlaylist,
    /// Reload the playlist from its source, replacing the current list
    ReloadPlaylist,
    /// Make the entry at `index` active
    Select { index: usize },
    Play,
    Pause,
    TogglePlay,
    /// Relative seek; the engine clamps to the media bounds
    SeekBy { seconds: f64 },
    /// Absolute seek; the engine clamps to the media bounds
    SeekTo { seconds: f64 },
    /// Set volume (clamped to 0.0-1.0)
    SetVolume { volume: f64 },
    SetMuted { muted: bool },
    ToggleMute,
    /// Select a subtitle track by label
    SelectSubtitle { label: String },
    /// Select an audio track by label (advisory, playback is unchanged)
    SelectAudioTrack { label: String },
    /// Set a visual filter channel (clamped to 0-200)
    SetFilter { channel: FilterChannel, value: i32 },
    /// Reset a visual filter channel to 100
    ResetFilter { channel: FilterChannel },
    ToggleFullscreen,
    /// Forward a user input or environment notification
    Input(InputEvent),
}

/// Response from daemon to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Response {
    Ok,
    Error(PlayerError),
    Status(Box<PlayerStatus>),
    Playlist(Vec<PlaylistItemInfo>),
    Pong,
}

/// Transient play/pause glyph flashed over the media surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Glyph {
    Play,
    Pause,
}

/// A fullscreen transition the front end has been asked to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FullscreenRequest {
    Enter,
    Exit,
}

/// Playlist entry summary for the selector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistItemInfo {
    pub index: usize,
    pub name: String,
    pub url: String,
    pub declared_type: DeclaredType,
    pub variant: SourceVariant,
    pub active: bool,
}

/// Full player snapshot published after every state change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PlayerStatus {
    pub version: String,
    pub uptime_secs: u64,
    pub active_index: Option<usize>,
    pub entry_name: Option<String>,
    pub entry_url: Option<String>,
    pub variant: Option<SourceVariant>,
    /// Whether the unified controls can drive the active source
    pub controls_enabled: bool,
    pub current_time: f64,
    pub duration: f64,
    /// `MM:SS` label for the elapsed time
    pub elapsed: String,
    /// `MM:SS` label for the total time
    pub total: String,
    pub is_playing: bool,
    pub volume: f64,
    pub muted: bool,
    pub brightness: i32,
    pub contrast: i32,
    pub saturation: i32,
    /// Derived filter effect, present only while the active source is direct
    pub filter_effect: Option<String>,
    pub subtitle: Option<String>,
    pub audio_track: Option<String>,
    pub subtitle_labels: Vec<String>,
    pub audio_labels: Vec<String>,
    pub controls_visible: bool,
    pub glyph: Option<Glyph>,
    pub fullscreen: bool,
    pub pending_fullscreen: Option<FullscreenRequest>,
    pub pointer_over: bool,
    pub hover_preview: Option<f64>,
    pub media_error: Option<String>,
    pub audio_switches: usize,
}

/// Format seconds as `MM:SS`.
///
/// Seconds are floored, minutes are unbounded, both are zero-padded to two
/// digits. Negative and non-finite inputs format as `00:00`.
///
/// ```
/// assert_eq!(common::format_time(65.4), "01:05");
/// assert_eq!(common::format_time(3599.9), "59:59");
/// ```
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// IPC socket path helper
pub fn get_socket_path() -> std::path::PathBuf {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR")
        .unwrap_or_else(|_| format!("/run/user/{}", unsafe { libc::getuid() }));

    std::path::PathBuf::from(runtime_dir).join("marquee.sock")
}
