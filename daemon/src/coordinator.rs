//! Playback control coordinator.
//!
//! The coordinator is the single writer of player state. Commands, input
//! events, timer expiries and engine notifications are all delivered to it one
//! at a time, and each is applied completely before the next one. Time is
//! passed in explicitly so timer behaviour does not depend on the wall clock.
//!
//! After a mutation the coordinator marks itself dirty; the session publishes
//! a fresh [`PlayerStatus`] snapshot when [`Coordinator::take_dirty`] reports
//! a change.

use common::{
    Command, FilterChannel, Glyph, InputEvent, PlayerError, PlayerStatus, PlaylistEntry, Response,
    SourceVariant,
};
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::controls::ControlsVisibility;
use crate::engine::{BackendEvent, EngineEvent, MediaSource, PlaybackEngine};
use crate::filters::VisualFilter;
use crate::fullscreen::{FullscreenController, FullscreenSurface};
use crate::keyboard::{KeyAction, KeyboardRouter};
use crate::log_and_continue;
use crate::playlist::PlaylistStore;
use crate::timers::{self, OneShot};
use crate::tracks::{AudioTrackHook, TrackSelection};

/// Tunables for the coordinator, usually taken from [`Config`]
#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    pub hide_after: Duration,
    pub glyph_flash: Duration,
    pub control_bar_height: f32,
    pub seek_step: f64,
    pub volume_step: f64,
    pub initial_volume: f64,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl CoordinatorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            hide_after: config.controls.hide_after(),
            glyph_flash: config.controls.glyph_flash(),
            control_bar_height: config.controls.control_bar_height,
            seek_step: config.controls.seek_step_secs,
            volume_step: config.controls.volume_step,
            initial_volume: config.engine.initial_volume.clamp(0.0, 1.0),
        }
    }
}

/// Playback state of the active direct entry
#[derive(Debug, Clone, PartialEq)]
struct PlaybackState {
    current_time: f64,
    duration: f64,
    /// Intent: follows the last play/pause command, corrected by `Ended`
    is_playing: bool,
    volume: f64,
    muted: bool,
}

impl PlaybackState {
    /// Back to time zero, paused. Volume and mute are listener preferences
    /// and carry over.
    fn reset(&mut self) {
        self.current_time = 0.0;
        self.duration = 0.0;
        self.is_playing = false;
    }
}

/// Short-lived UI state, reset on every entry change
#[derive(Debug, Default)]
struct UiEphemeral {
    glyph: Option<Glyph>,
    glyph_timer: OneShot,
    /// Timeline position under the pointer while scrubbing
    hover_preview: Option<f64>,
}

impl UiEphemeral {
    fn reset(&mut self) {
        self.glyph = None;
        self.glyph_timer.cancel();
        self.hover_preview = None;
    }
}

pub struct Coordinator {
    settings: CoordinatorSettings,
    playlist: PlaylistStore,
    engine: PlaybackEngine,
    playback: PlaybackState,
    filter: VisualFilter,
    tracks: TrackSelection,
    controls: ControlsVisibility,
    keyboard: KeyboardRouter,
    fullscreen: FullscreenController,
    ui: UiEphemeral,
    media_error: Option<String>,
    live: bool,
    dirty: bool,
    started_at: Instant,
}

impl Coordinator {
    pub fn new(
        settings: CoordinatorSettings,
        engine: PlaybackEngine,
        surface: Box<dyn FullscreenSurface>,
        audio_hook: Box<dyn AudioTrackHook>,
        now: Instant,
    ) -> Self {
        Self {
            playback: PlaybackState {
                current_time: 0.0,
                duration: 0.0,
                is_playing: false,
                volume: settings.initial_volume,
                muted: false,
            },
            controls: ControlsVisibility::new(settings.hide_after),
            keyboard: KeyboardRouter::new(settings.seek_step, settings.volume_step),
            settings,
            playlist: PlaylistStore::new(),
            engine,
            filter: VisualFilter::default(),
            tracks: TrackSelection::new(audio_hook),
            fullscreen: FullscreenController::new(surface),
            ui: UiEphemeral::default(),
            media_error: None,
            live: false,
            dirty: true,
            started_at: now,
        }
    }

    /// Begin the session: subscribe to keyboard input and load `entries`
    pub fn start(&mut self, entries: Vec<PlaylistEntry>) {
        self.live = true;
        self.keyboard.attach();
        self.replace_playlist(entries);
        log::info!("Player session started");
    }

    /// End the session. Every later event is ignored.
    pub fn teardown(&mut self) {
        if !self.live {
            return;
        }
        self.controls.cancel();
        self.ui.reset();
        self.engine.detach();
        self.keyboard.detach();
        self.playback.is_playing = false;
        self.live = false;
        self.dirty = true;
        log::info!("Player session ended");
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    /// Replace the playlist wholesale and activate its first entry
    pub fn replace_playlist(&mut self, entries: Vec<PlaylistEntry>) {
        if !self.live {
            return;
        }
        self.playlist.replace(entries);
        self.activate_current();
    }

    /// Make `index` the active entry and run the reset cascade, even when it
    /// is already active. Out-of-range indices leave everything unchanged.
    pub fn select(&mut self, index: usize) -> bool {
        if !self.live {
            return false;
        }
        if !self.playlist.select(index) {
            return false;
        }
        self.activate_current();
        true
    }

    /// Reset cascade for an active-entry change
    fn activate_current(&mut self) {
        self.engine.detach();
        self.playback.reset();
        self.tracks.reset();
        self.ui.reset();
        self.media_error = None;
        self.dirty = true;

        let Some(entry) = self.playlist.current() else {
            log::info!("Playlist is empty, nothing to show");
            return;
        };
        let variant = self.playlist.current_variant().unwrap_or(SourceVariant::Direct);

        log::info!(
            "Selected entry {:?} '{}' ({})",
            self.playlist.active_index(),
            entry.display_name,
            variant.name()
        );

        if !variant.is_direct() {
            log::debug!("Showing opaque embed for {}", entry.url);
            return;
        }

        let source = MediaSource {
            url: entry.url.clone(),
            subtitles: entry.subtitle_tracks.clone(),
        };
        self.engine.bind(&source);
        log_and_continue!(self.engine.set_volume(self.playback.volume), "apply volume");
        log_and_continue!(self.engine.set_muted(self.playback.muted), "apply mute");
        self.apply_filter();
    }

    fn is_direct(&self) -> bool {
        self.playlist
            .current_variant()
            .is_some_and(|variant| variant.is_direct())
    }

    // Playback

    pub fn play(&mut self, now: Instant) {
        self.set_playing(true, now);
    }

    pub fn pause(&mut self, now: Instant) {
        self.set_playing(false, now);
    }

    pub fn toggle_play(&mut self, now: Instant) {
        self.set_playing(!self.playback.is_playing, now);
    }

    fn set_playing(&mut self, playing: bool, now: Instant) {
        if !self.live || !self.is_direct() {
            log::debug!("Play/pause ignored: no direct source");
            return;
        }

        let result = if playing {
            self.engine.play()
        } else {
            self.engine.pause()
        };
        // Intent follows the command even when the engine refuses it
        self.playback.is_playing = playing;
        if let Err(e) = result {
            log::warn!("Failed to {}: {:#}", if playing { "play" } else { "pause" }, e);
        }

        self.flash_glyph(now);
        self.dirty = true;
    }

    /// Show the glyph for the resulting state, replacing any pending hide
    fn flash_glyph(&mut self, now: Instant) {
        self.ui.glyph = Some(if self.playback.is_playing {
            Glyph::Pause
        } else {
            Glyph::Play
        });
        self.ui.glyph_timer.schedule(now, self.settings.glyph_flash);
    }

    pub fn seek_by(&mut self, delta: f64) {
        if !self.live || !self.is_direct() {
            return;
        }
        log_and_continue!(self.engine.seek_by(delta), "seek");
    }

    pub fn seek_to(&mut self, seconds: f64) {
        if !self.live || !self.is_direct() {
            return;
        }
        log_and_continue!(self.engine.seek_to(seconds), "seek");
    }

    /// Set the volume, clamped to [0, 1]
    pub fn set_volume(&mut self, volume: f64) {
        if !self.live {
            return;
        }
        let volume = if volume.is_finite() {
            volume.clamp(0.0, 1.0)
        } else {
            self.playback.volume
        };
        self.playback.volume = volume;
        log_and_continue!(self.engine.set_volume(volume), "apply volume");
        self.dirty = true;
    }

    pub fn set_muted(&mut self, muted: bool) {
        if !self.live {
            return;
        }
        self.playback.muted = muted;
        log_and_continue!(self.engine.set_muted(muted), "apply mute");
        self.dirty = true;
    }

    pub fn toggle_mute(&mut self) {
        self.set_muted(!self.playback.muted);
    }

    // Tracks

    pub fn select_subtitle(&mut self, label: &str) {
        if !self.live {
            return;
        }
        let showing = self
            .tracks
            .select_subtitle(label, self.playlist.current())
            .unwrap_or_default()
            .to_string();
        log_and_continue!(self.engine.show_text_track(&showing), "switch subtitles");
        self.dirty = true;
    }

    pub fn select_audio_track(&mut self, label: &str) {
        if !self.live {
            return;
        }
        self.tracks.select_audio_track(label);
        self.dirty = true;
    }

    // Filters

    pub fn set_filter(&mut self, channel: FilterChannel, value: i32) {
        if self.live && self.filter.set(channel, value) {
            self.apply_filter();
            self.dirty = true;
        }
    }

    pub fn reset_filter(&mut self, channel: FilterChannel) {
        if self.live && self.filter.reset(channel) {
            self.apply_filter();
            self.dirty = true;
        }
    }

    /// Push the combined filter to the media surface. Embeds get nothing.
    fn apply_filter(&mut self) {
        if self.is_direct() {
            log_and_continue!(self.engine.apply_filter(&self.filter), "apply filter");
        }
    }

    // Fullscreen

    pub fn toggle_fullscreen(&mut self) {
        if !self.live {
            return;
        }
        log_and_continue!(self.fullscreen.toggle(), "request fullscreen");
        self.dirty = true;
    }

    // Input

    /// Apply a user input or environment notification
    pub fn handle_input(&mut self, event: InputEvent, now: Instant) {
        if !self.live {
            return;
        }

        match event {
            InputEvent::PointerEnter => {
                self.keyboard.set_pointer_over(true);
                self.activity(now);
            }
            InputEvent::PointerLeave => {
                self.keyboard.set_pointer_over(false);
                self.dirty = true;
            }
            InputEvent::PointerMove => self.activity(now),
            InputEvent::Click { y, height } => {
                if y < height - self.settings.control_bar_height {
                    self.toggle_play(now);
                } else {
                    log::debug!("Click at y={} belongs to the control bar", y);
                }
            }
            InputEvent::Key(key) => {
                let Some(action) = self.keyboard.dispatch(key) else {
                    return;
                };
                self.activity(now);
                match action {
                    KeyAction::TogglePlay => self.toggle_play(now),
                    KeyAction::SeekBy(delta) => self.seek_by(delta),
                    KeyAction::VolumeBy(delta) => self.set_volume(self.playback.volume + delta),
                    KeyAction::ToggleFullscreen => self.toggle_fullscreen(),
                }
            }
            InputEvent::ScrubStart { time } | InputEvent::ScrubMove { time } => {
                self.ui.hover_preview = Some(if time.is_finite() { time.max(0.0) } else { 0.0 });
                self.dirty = true;
            }
            InputEvent::ScrubCommit { time } => self.seek_to(time),
            InputEvent::ScrubEnd => {
                self.ui.hover_preview = None;
                self.dirty = true;
            }
            InputEvent::FullscreenChanged { active } => {
                self.fullscreen.environment_changed(active);
                self.dirty = true;
            }
        }
    }

    fn activity(&mut self, now: Instant) {
        self.controls.activity(now);
        self.dirty = true;
    }

    // Engine callbacks and timers

    /// Apply one engine notification. Events from an old binding are dropped.
    pub fn handle_engine_event(&mut self, event: EngineEvent) {
        if !self.live {
            return;
        }
        if self.engine.binding() != Some(event.binding) {
            log::debug!(
                "Discarding stale {:?} from engine binding {}",
                event.kind,
                event.binding
            );
            return;
        }

        match event.kind {
            BackendEvent::TimeUpdate(time) => {
                if time.is_finite() {
                    self.playback.current_time = time.max(0.0);
                }
            }
            BackendEvent::DurationKnown(duration) => {
                self.playback.duration = if duration.is_finite() && duration > 0.0 {
                    duration
                } else {
                    0.0
                };
            }
            BackendEvent::Ended => {
                log::info!("Playback ended");
                self.playback.is_playing = false;
            }
            BackendEvent::LoadFailed(message) => {
                log::warn!("Media failed to load: {}", message);
                self.playback.reset();
                self.media_error = Some(message);
            }
        }
        self.dirty = true;
    }

    /// Drain and apply engine notifications
    pub fn poll_engine(&mut self, now: Instant) {
        if !self.live {
            return;
        }
        for event in self.engine.poll(now) {
            self.handle_engine_event(event);
        }
    }

    /// Fire every timer that is due at `now`
    pub fn fire_timers(&mut self, now: Instant) {
        if !self.live {
            return;
        }
        if self.controls.tick(now) {
            self.dirty = true;
        }
        if self.ui.glyph_timer.fire_if_due(now) {
            self.ui.glyph = None;
            self.dirty = true;
        }
    }

    /// Timers, then engine notifications
    pub fn advance(&mut self, now: Instant) {
        self.fire_timers(now);
        self.poll_engine(now);
    }

    /// Earliest pending timer deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        if !self.live {
            return None;
        }
        timers::earliest([self.controls.deadline(), self.ui.glyph_timer.deadline()])
    }

    /// Returns whether state changed since the last call
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    // Commands

    /// Apply a protocol command
    pub fn handle_command(&mut self, command: Command, now: Instant) -> Response {
        log::debug!("Handling command: {:?}", command);

        if !self.live {
            return Response::Error(PlayerError::Ipc("Player session has ended".to_string()));
        }

        match command {
            Command::Ping => Response::Pong,
            Command::Status => Response::Status(Box::new(self.status(now))),
            Command::ListPlaylist => Response::Playlist(self.playlist.items()),
            Command::Select { index } => {
                if self.select(index) {
                    Response::Ok
                } else {
                    Response::Error(PlayerError::NotFound(format!(
                        "No playlist entry at index {} ({} entries)",
                        index,
                        self.playlist.len()
                    )))
                }
            }
            Command::Play => {
                self.play(now);
                Response::Ok
            }
            Command::Pause => {
                self.pause(now);
                Response::Ok
            }
            Command::TogglePlay => {
                self.toggle_play(now);
                Response::Ok
            }
            Command::SeekBy { seconds } => {
                self.seek_by(seconds);
                Response::Ok
            }
            Command::SeekTo { seconds } => {
                self.seek_to(seconds);
                Response::Ok
            }
            Command::SetVolume { volume } => {
                self.set_volume(volume);
                Response::Ok
            }
            Command::SetMuted { muted } => {
                self.set_muted(muted);
                Response::Ok
            }
            Command::ToggleMute => {
                self.toggle_mute();
                Response::Ok
            }
            Command::SelectSubtitle { label } => {
                self.select_subtitle(&label);
                Response::Ok
            }
            Command::SelectAudioTrack { label } => {
                self.select_audio_track(&label);
                Response::Ok
            }
            Command::SetFilter { channel, value } => {
                self.set_filter(channel, value);
                Response::Ok
            }
            Command::ResetFilter { channel } => {
                self.reset_filter(channel);
                Response::Ok
            }
            Command::ToggleFullscreen => {
                self.toggle_fullscreen();
                Response::Ok
            }
            Command::Input(event) => {
                self.handle_input(event, now);
                Response::Ok
            }
            other @ (Command::ReloadPlaylist | Command::Kill) => Response::Error(
                PlayerError::Ipc(format!("{:?} must be handled by the session", other)),
            ),
        }
    }

    pub fn playlist_items(&self) -> Vec<common::PlaylistItemInfo> {
        self.playlist.items()
    }

    /// Snapshot of everything an observer renders
    pub fn status(&self, now: Instant) -> PlayerStatus {
        let entry = self.playlist.current();
        let variant = self.playlist.current_variant();
        let direct = variant.is_some_and(|v| v.is_direct());

        PlayerStatus {
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: now.saturating_duration_since(self.started_at).as_secs(),
            active_index: self.playlist.active_index(),
            entry_name: entry.map(|e| e.display_name.clone()),
            entry_url: entry.map(|e| e.url.clone()),
            variant,
            controls_enabled: direct,
            current_time: self.playback.current_time,
            duration: self.playback.duration,
            elapsed: common::format_time(self.playback.current_time),
            total: common::format_time(self.playback.duration),
            is_playing: self.playback.is_playing,
            volume: self.playback.volume,
            muted: self.playback.muted,
            brightness: self.filter.brightness,
            contrast: self.filter.contrast,
            saturation: self.filter.saturation,
            filter_effect: direct.then(|| self.filter.effect()),
            subtitle: self.tracks.subtitle().map(str::to_string),
            audio_track: self.tracks.audio().map(str::to_string),
            subtitle_labels: entry
                .map(|e| e.subtitle_tracks.iter().map(|t| t.label.clone()).collect())
                .unwrap_or_default(),
            audio_labels: entry
                .map(|e| e.audio_tracks.iter().map(|t| t.label.clone()).collect())
                .unwrap_or_default(),
            controls_visible: self.controls.is_visible(),
            glyph: self.ui.glyph,
            fullscreen: self.fullscreen.is_active(),
            pending_fullscreen: self.fullscreen.pending(),
            pointer_over: self.keyboard.pointer_over(),
            hover_preview: self.ui.hover_preview,
            media_error: self.media_error.clone(),
            audio_switches: self.tracks.audio_switches().len(),
        }
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.teardown();
    }
}
