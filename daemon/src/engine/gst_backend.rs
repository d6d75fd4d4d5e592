//! GStreamer `playbin` backend.
//!
//! Position and duration come from pipeline queries, end-of-stream and errors
//! from the bus. Visual filters go through a `videobalance` element installed
//! as the playbin video filter.

use anyhow::{Context, Result};
use gstreamer as gst;
use gstreamer::glib;
use gstreamer::prelude::*;
use std::time::Instant;

use super::{BackendEvent, MediaBackend, MediaSource, TextTrack, TextTrackMode};
use crate::filters::VisualFilter;

/// Initialize GStreamer (idempotent, safe to call multiple times)
fn initialize_gstreamer() -> Result<()> {
    static GSTREAMER_INIT: std::sync::OnceLock<Result<(), String>> = std::sync::OnceLock::new();

    GSTREAMER_INIT
        .get_or_init(|| {
            gst::init().map_err(|e| e.to_string())?;
            log::info!("GStreamer initialized");
            Ok(())
        })
        .clone()
        .map_err(|e| anyhow::anyhow!("Failed to initialize GStreamer: {}", e))
}

/// Turn a playlist URL into something playbin accepts
fn to_uri(url: &str) -> String {
    if url.contains("://") {
        url.to_string()
    } else if let Some(rest) = url.strip_prefix("//") {
        format!("https://{}", rest)
    } else {
        let expanded = shellexpand::tilde(url);
        format!("file://{}", expanded)
    }
}

fn clock_to_secs(t: gst::ClockTime) -> f64 {
    t.nseconds() as f64 / 1_000_000_000.0
}

/// Map a 0-200 percentage onto videobalance's brightness range (-1.0..1.0)
fn balance_brightness(percent: i32) -> f64 {
    ((percent as f64 - 100.0) / 100.0).clamp(-1.0, 1.0)
}

/// Map a 0-200 percentage onto videobalance's contrast/saturation range (0.0..2.0)
fn balance_gain(percent: i32) -> f64 {
    (percent as f64 / 100.0).clamp(0.0, 2.0)
}

struct Loaded {
    playbin: gst::Element,
    subtitles: Vec<(TextTrack, String)>,
    duration_reported: bool,
    last_position: f64,
    /// A seek was issued since the last poll
    seeked: bool,
    playing: bool,
}

/// Playbin-backed media element
pub struct GstBackend {
    balance: Option<gst::Element>,
    volume: f64,
    muted: bool,
    loaded: Option<Loaded>,
}

impl GstBackend {
    pub fn new() -> Result<Self> {
        initialize_gstreamer()?;

        let balance = match gst::ElementFactory::make("videobalance").build() {
            Ok(element) => Some(element),
            Err(e) => {
                log::warn!("videobalance unavailable, visual filters disabled: {}", e);
                None
            }
        };

        Ok(Self {
            balance,
            volume: 1.0,
            muted: false,
            loaded: None,
        })
    }

    fn loaded(&self) -> Result<&Loaded> {
        self.loaded.as_ref().context("No media loaded")
    }

    /// Toggle the `text` bit of playbin's flags
    fn set_text_flag(playbin: &gst::Element, enabled: bool) -> Result<()> {
        let flags = playbin.property_value("flags");
        let flags_class =
            glib::FlagsClass::with_type(flags.type_()).context("playbin flags type")?;
        let builder = flags_class
            .builder_with_value(flags)
            .context("playbin flags value")?;
        let flags = if enabled {
            builder.set_by_nick("text")
        } else {
            builder.unset_by_nick("text")
        }
        .build()
        .context("Failed to build playbin flags")?;
        playbin.set_property_from_value("flags", &flags);
        Ok(())
    }
}

impl MediaBackend for GstBackend {
    fn load(&mut self, source: &MediaSource) -> Result<()> {
        self.unload();

        let uri = to_uri(&source.url);
        log::info!("Loading media: {}", uri);

        let playbin = gst::ElementFactory::make("playbin")
            .name("marquee-playbin")
            .property("uri", &uri)
            .build()
            .context("Failed to create playbin")?;

        if let Some(ref balance) = self.balance {
            playbin.set_property("video-filter", balance);
        }
        playbin.set_property("volume", self.volume);
        playbin.set_property("mute", self.muted);
        Self::set_text_flag(&playbin, false)?;

        playbin
            .set_state(gst::State::Paused)
            .context("Failed to set pipeline to Paused state")?;

        let subtitles = source
            .subtitles
            .iter()
            .map(|t| {
                (
                    TextTrack {
                        language: t.label.clone(),
                        label: t.label.clone(),
                        mode: TextTrackMode::Hidden,
                    },
                    t.src.clone(),
                )
            })
            .collect();

        self.loaded = Some(Loaded {
            playbin,
            subtitles,
            duration_reported: false,
            last_position: 0.0,
            seeked: false,
            playing: false,
        });
        Ok(())
    }

    fn unload(&mut self) {
        if let Some(loaded) = self.loaded.take() {
            log::debug!("Stopping playbin");
            let _ = loaded.playbin.set_state(gst::State::Null);
        }
    }

    fn play(&mut self) -> Result<()> {
        let loaded = self.loaded.as_mut().context("No media loaded")?;
        loaded
            .playbin
            .set_state(gst::State::Playing)
            .context("Failed to set pipeline to Playing state")?;
        loaded.playing = true;
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        let loaded = self.loaded.as_mut().context("No media loaded")?;
        loaded
            .playbin
            .set_state(gst::State::Paused)
            .context("Failed to set pipeline to Paused state")?;
        loaded.playing = false;
        Ok(())
    }

    fn seek_to(&mut self, seconds: f64) -> Result<()> {
        let loaded = self.loaded.as_mut().context("No media loaded")?;
        let duration = loaded
            .playbin
            .query_duration::<gst::ClockTime>()
            .map(clock_to_secs);
        let mut target = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
        if let Some(duration) = duration {
            target = target.min(duration);
        }

        loaded
            .playbin
            .seek_simple(
                gst::SeekFlags::FLUSH | gst::SeekFlags::KEY_UNIT,
                gst::ClockTime::from_nseconds((target * 1_000_000_000.0) as u64),
            )
            .context("Seek failed")?;
        loaded.last_position = target;
        loaded.seeked = true;
        Ok(())
    }

    fn position(&self) -> f64 {
        self.loaded()
            .ok()
            .and_then(|l| l.playbin.query_position::<gst::ClockTime>())
            .map(clock_to_secs)
            .or_else(|| self.loaded.as_ref().map(|l| l.last_position))
            .unwrap_or(0.0)
    }

    fn set_volume(&mut self, volume: f64) -> Result<()> {
        self.volume = volume.clamp(0.0, 1.0);
        if let Some(ref loaded) = self.loaded {
            loaded.playbin.set_property("volume", self.volume);
        }
        Ok(())
    }

    fn set_muted(&mut self, muted: bool) -> Result<()> {
        self.muted = muted;
        if let Some(ref loaded) = self.loaded {
            loaded.playbin.set_property("mute", muted);
        }
        Ok(())
    }

    fn text_tracks(&self) -> Vec<TextTrack> {
        self.loaded
            .as_ref()
            .map(|l| l.subtitles.iter().map(|(t, _)| t.clone()).collect())
            .unwrap_or_default()
    }

    fn set_text_track_mode(&mut self, index: usize, mode: TextTrackMode) -> Result<()> {
        let loaded = self.loaded.as_mut().context("No media loaded")?;
        let (track, src) = loaded
            .subtitles
            .get_mut(index)
            .with_context(|| format!("No text track at index {}", index))?;
        track.mode = mode;

        match mode {
            TextTrackMode::Showing => {
                log::info!("Showing subtitles '{}' from {}", track.label, src);
                loaded.playbin.set_property("suburi", to_uri(src));
                Self::set_text_flag(&loaded.playbin, true)?;
            }
            TextTrackMode::Hidden => {
                let any_showing = loaded
                    .subtitles
                    .iter()
                    .any(|(t, _)| t.mode == TextTrackMode::Showing);
                if !any_showing {
                    Self::set_text_flag(&loaded.playbin, false)?;
                }
            }
        }
        Ok(())
    }

    fn apply_filter(&mut self, filter: &VisualFilter) -> Result<()> {
        let Some(ref balance) = self.balance else {
            return Ok(());
        };
        balance.set_property("brightness", balance_brightness(filter.brightness));
        balance.set_property("contrast", balance_gain(filter.contrast));
        balance.set_property("saturation", balance_gain(filter.saturation));
        Ok(())
    }

    fn poll(&mut self, _now: Instant) -> Vec<BackendEvent> {
        let mut events = Vec::new();
        let Some(loaded) = self.loaded.as_mut() else {
            return events;
        };

        if let Some(bus) = loaded.playbin.bus() {
            while let Some(msg) = bus.pop() {
                match msg.view() {
                    gst::MessageView::Eos(_) => {
                        log::info!("Media playback finished");
                        loaded.playing = false;
                        events.push(BackendEvent::Ended);
                    }
                    gst::MessageView::Error(err) => {
                        log::error!(
                            "GStreamer error: {} (debug: {:?})",
                            err.error(),
                            err.debug()
                        );
                        loaded.playing = false;
                        events.push(BackendEvent::LoadFailed(err.error().to_string()));
                    }
                    gst::MessageView::DurationChanged(_) => {
                        loaded.duration_reported = false;
                    }
                    _ => {}
                }
            }
        }

        if !loaded.duration_reported {
            if let Some(duration) = loaded.playbin.query_duration::<gst::ClockTime>() {
                loaded.duration_reported = true;
                events.push(BackendEvent::DurationKnown(clock_to_secs(duration)));
            }
        }

        if loaded.playing || loaded.seeked {
            loaded.seeked = false;
            if let Some(position) = loaded.playbin.query_position::<gst::ClockTime>() {
                loaded.last_position = clock_to_secs(position);
            }
            events.push(BackendEvent::TimeUpdate(loaded.last_position));
        }

        events
    }
}

impl Drop for GstBackend {
    fn drop(&mut self) {
        self.unload();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_uri() {
        assert_eq!(to_uri("https://a/b.mp4"), "https://a/b.mp4");
        assert_eq!(to_uri("//cdn.example.com/b.mp4"), "https://cdn.example.com/b.mp4");
        assert_eq!(to_uri("/video.mp4"), "file:///video.mp4");
    }

    #[test]
    fn test_balance_mapping() {
        assert_eq!(balance_brightness(100), 0.0);
        assert_eq!(balance_brightness(200), 1.0);
        assert_eq!(balance_brightness(0), -1.0);
        assert_eq!(balance_gain(100), 1.0);
        assert_eq!(balance_gain(200), 2.0);
        assert_eq!(balance_gain(0), 0.0);
    }
}
