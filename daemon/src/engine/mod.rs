//! Playback engine for direct sources.
//!
//! [`PlaybackEngine`] wraps one [`MediaBackend`] and owns the notion of a
//! *binding*: every `bind` gets a fresh [`BindingId`] and every event the
//! engine emits carries the binding that produced it. The coordinator drops
//! events whose binding is no longer current.
//!
//! Backends:
//!
//! - `simulated`: headless, clock-driven media element (always built)
//! - `gstreamer`: `playbin` based backend (feature `video`)

#[cfg(feature = "video")]
mod gst_backend;
mod simulated;

#[cfg(feature = "video")]
pub use gst_backend::GstBackend;
pub use simulated::SimulatedBackend;

use anyhow::Result;
use common::TrackSource;
use std::time::Instant;

use crate::filters::VisualFilter;

/// Identifies one bind of the engine to a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(u64);

impl std::fmt::Display for BindingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What to load into the backend
#[derive(Debug, Clone, PartialEq)]
pub struct MediaSource {
    pub url: String,
    pub subtitles: Vec<TrackSource>,
}

/// Visibility of a native text track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextTrackMode {
    Showing,
    Hidden,
}

/// Native text track exposed by a backend
#[derive(Debug, Clone, PartialEq)]
pub struct TextTrack {
    pub language: String,
    pub label: String,
    pub mode: TextTrackMode,
}

impl TextTrack {
    /// Whether this track answers to the given selection label
    pub fn matches(&self, selection: &str) -> bool {
        !selection.is_empty() && (self.language == selection || self.label == selection)
    }
}

/// Asynchronous notifications from a backend
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    TimeUpdate(f64),
    DurationKnown(f64),
    Ended,
    LoadFailed(String),
}

/// Backend event tagged with the binding that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct EngineEvent {
    pub binding: BindingId,
    pub kind: BackendEvent,
}

/// A single controllable media handle.
///
/// Commands take effect asynchronously; their results are observed through
/// [`MediaBackend::poll`].
pub trait MediaBackend: Send {
    /// Load a new source, paused at time zero. Does not auto-play.
    fn load(&mut self, source: &MediaSource) -> Result<()>;

    /// Release the current source
    fn unload(&mut self);

    fn play(&mut self) -> Result<()>;

    fn pause(&mut self) -> Result<()>;

    /// Jump to `seconds`. The backend clamps to `[0, duration]`.
    fn seek_to(&mut self, seconds: f64) -> Result<()>;

    /// Last known playback position in seconds
    fn position(&self) -> f64;

    fn set_volume(&mut self, volume: f64) -> Result<()>;

    fn set_muted(&mut self, muted: bool) -> Result<()>;

    fn text_tracks(&self) -> Vec<TextTrack>;

    fn set_text_track_mode(&mut self, index: usize, mode: TextTrackMode) -> Result<()>;

    fn apply_filter(&mut self, filter: &VisualFilter) -> Result<()>;

    /// Drain notifications produced since the last poll
    fn poll(&mut self, now: Instant) -> Vec<BackendEvent>;
}

/// Wraps a backend and tracks which source it is bound to
pub struct PlaybackEngine {
    backend: Box<dyn MediaBackend>,
    binding: Option<BindingId>,
    next_id: u64,
    /// Last play/pause command issued to the backend
    playing: bool,
    /// Events produced synchronously (load failures) waiting for the next poll
    pending: Vec<EngineEvent>,
}

impl PlaybackEngine {
    pub fn new(backend: Box<dyn MediaBackend>) -> Self {
        Self {
            backend,
            binding: None,
            next_id: 0,
            playing: false,
            pending: Vec::new(),
        }
    }

    /// Detach any previous source and load `source` paused at time zero.
    pub fn bind(&mut self, source: &MediaSource) -> BindingId {
        self.detach();

        self.next_id += 1;
        let binding = BindingId(self.next_id);
        self.binding = Some(binding);
        self.playing = false;

        match self.backend.load(source) {
            Ok(()) => log::info!("Engine {} bound to {}", binding, source.url),
            Err(e) => {
                log::warn!("Engine {} failed to load {}: {:#}", binding, source.url, e);
                self.pending.push(EngineEvent {
                    binding,
                    kind: BackendEvent::LoadFailed(format!("{:#}", e)),
                });
            }
        }

        binding
    }

    /// Pause and release the bound source, if any
    pub fn detach(&mut self) {
        if let Some(binding) = self.binding.take() {
            if self.playing {
                crate::log_and_continue!(self.backend.pause(), "pause before detach");
            }
            self.backend.unload();
            self.playing = false;
            self.pending.clear();
            log::info!("Engine {} detached", binding);
        }
    }

    pub fn binding(&self) -> Option<BindingId> {
        self.binding
    }

    /// Start playback. Repeated calls do not reach the backend.
    pub fn play(&mut self) -> Result<()> {
        if self.binding.is_none() || self.playing {
            return Ok(());
        }
        self.backend.play()?;
        self.playing = true;
        Ok(())
    }

    /// Pause playback. Repeated calls do not reach the backend.
    pub fn pause(&mut self) -> Result<()> {
        if self.binding.is_none() || !self.playing {
            return Ok(());
        }
        self.backend.pause()?;
        self.playing = false;
        Ok(())
    }

    /// Relative seek from the current position, unclamped
    pub fn seek_by(&mut self, delta: f64) -> Result<()> {
        if self.binding.is_none() {
            return Ok(());
        }
        let target = self.backend.position() + delta;
        self.backend.seek_to(target)
    }

    pub fn seek_to(&mut self, seconds: f64) -> Result<()> {
        if self.binding.is_none() {
            return Ok(());
        }
        self.backend.seek_to(seconds)
    }

    pub fn set_volume(&mut self, volume: f64) -> Result<()> {
        if self.binding.is_none() {
            return Ok(());
        }
        self.backend.set_volume(volume)
    }

    pub fn set_muted(&mut self, muted: bool) -> Result<()> {
        if self.binding.is_none() {
            return Ok(());
        }
        self.backend.set_muted(muted)
    }

    /// Show the first track matching `selection` and hide every other one.
    ///
    /// At most one track ends up showing.
    pub fn show_text_track(&mut self, selection: &str) -> Result<()> {
        if self.binding.is_none() {
            return Ok(());
        }
        let tracks = self.backend.text_tracks();
        let showing = tracks.iter().position(|t| t.matches(selection));
        for (index, _) in tracks.iter().enumerate() {
            let mode = if Some(index) == showing {
                TextTrackMode::Showing
            } else {
                TextTrackMode::Hidden
            };
            self.backend.set_text_track_mode(index, mode)?;
        }
        Ok(())
    }

    pub fn apply_filter(&mut self, filter: &VisualFilter) -> Result<()> {
        if self.binding.is_none() {
            return Ok(());
        }
        self.backend.apply_filter(filter)
    }

    /// Collect backend notifications, tagged with the current binding
    pub fn poll(&mut self, now: Instant) -> Vec<EngineEvent> {
        let mut events = std::mem::take(&mut self.pending);
        let Some(binding) = self.binding else {
            return events;
        };

        for kind in self.backend.poll(now) {
            if matches!(kind, BackendEvent::Ended | BackendEvent::LoadFailed(_)) {
                self.playing = false;
            }
            events.push(EngineEvent { binding, kind });
        }
        events
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.detach();
    }
}
