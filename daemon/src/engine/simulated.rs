//! Headless media element.
//!
//! Position follows the wall clock while playing. Duration is announced on
//! the first poll after a load, the way a real element reports metadata some
//! time after the source is set.

use anyhow::Result;
use std::path::Path;
use std::time::Instant;

use super::{BackendEvent, MediaBackend, MediaSource, TextTrack, TextTrackMode};
use crate::filters::VisualFilter;

#[derive(Debug)]
struct SimulatedMedia {
    url: String,
    duration: f64,
    position: f64,
    playing: bool,
    last_tick: Option<Instant>,
    duration_reported: bool,
    /// A seek happened since the last poll
    seeked: bool,
    tracks: Vec<TextTrack>,
}

/// Clock-driven backend used when no real media stack is compiled in
#[derive(Debug)]
pub struct SimulatedBackend {
    default_duration: f64,
    volume: f64,
    muted: bool,
    filter: VisualFilter,
    media: Option<SimulatedMedia>,
}

impl SimulatedBackend {
    pub fn new(default_duration: f64) -> Self {
        Self {
            default_duration: default_duration.max(0.0),
            volume: 1.0,
            muted: false,
            filter: VisualFilter::default(),
            media: None,
        }
    }

    /// Check that a source could be opened
    fn probe(url: &str) -> Result<()> {
        if url.trim().is_empty() {
            anyhow::bail!("Empty media URL");
        }

        let local = if let Some(path) = url.strip_prefix("file://") {
            Some(path)
        } else if url.contains("://") || url.starts_with("//") {
            None
        } else {
            Some(url)
        };

        if let Some(path) = local {
            let expanded = shellexpand::tilde(path);
            if !Path::new(expanded.as_ref()).exists() {
                anyhow::bail!("Media file not found: {}", path);
            }
        }

        Ok(())
    }

    /// Advance the clock for a playing source
    fn advance(media: &mut SimulatedMedia, now: Instant) {
        if let Some(last) = media.last_tick {
            let elapsed = now.saturating_duration_since(last).as_secs_f64();
            media.position = (media.position + elapsed).min(media.duration);
        }
        media.last_tick = Some(now);
    }
}

impl MediaBackend for SimulatedBackend {
    fn load(&mut self, source: &MediaSource) -> Result<()> {
        self.media = None;
        Self::probe(&source.url)?;

        let tracks = source
            .subtitles
            .iter()
            .map(|t| TextTrack {
                language: t.label.clone(),
                label: t.label.clone(),
                mode: TextTrackMode::Hidden,
            })
            .collect();

        log::debug!("Simulated load of {}", source.url);
        self.media = Some(SimulatedMedia {
            url: source.url.clone(),
            duration: self.default_duration,
            position: 0.0,
            playing: false,
            last_tick: None,
            duration_reported: false,
            seeked: false,
            tracks,
        });
        Ok(())
    }

    fn unload(&mut self) {
        if let Some(media) = self.media.take() {
            log::debug!("Simulated unload of {}", media.url);
        }
    }

    fn play(&mut self) -> Result<()> {
        let media = self
            .media
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("No media loaded"))?;
        if media.position >= media.duration {
            // Playing from the end starts over
            media.position = 0.0;
            media.seeked = true;
        }
        media.playing = true;
        media.last_tick = None;
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        if let Some(media) = self.media.as_mut() {
            media.playing = false;
            media.last_tick = None;
        }
        Ok(())
    }

    fn seek_to(&mut self, seconds: f64) -> Result<()> {
        let media = self
            .media
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("No media loaded"))?;
        let target = if seconds.is_finite() { seconds } else { 0.0 };
        media.position = target.clamp(0.0, media.duration);
        media.seeked = true;
        Ok(())
    }

    fn position(&self) -> f64 {
        self.media.as_ref().map(|m| m.position).unwrap_or(0.0)
    }

    fn set_volume(&mut self, volume: f64) -> Result<()> {
        self.volume = volume.clamp(0.0, 1.0);
        log::debug!("Simulated volume {:.2} (muted: {})", self.volume, self.muted);
        Ok(())
    }

    fn set_muted(&mut self, muted: bool) -> Result<()> {
        self.muted = muted;
        log::debug!("Simulated volume {:.2} (muted: {})", self.volume, self.muted);
        Ok(())
    }

    fn text_tracks(&self) -> Vec<TextTrack> {
        self.media
            .as_ref()
            .map(|m| m.tracks.clone())
            .unwrap_or_default()
    }

    fn set_text_track_mode(&mut self, index: usize, mode: TextTrackMode) -> Result<()> {
        let track = self
            .media
            .as_mut()
            .and_then(|m| m.tracks.get_mut(index))
            .ok_or_else(|| anyhow::anyhow!("No text track at index {}", index))?;
        track.mode = mode;
        Ok(())
    }

    fn apply_filter(&mut self, filter: &VisualFilter) -> Result<()> {
        self.filter = *filter;
        log::debug!("Simulated filter {}", self.filter.effect());
        Ok(())
    }

    fn poll(&mut self, now: Instant) -> Vec<BackendEvent> {
        let mut events = Vec::new();
        let Some(media) = self.media.as_mut() else {
            return events;
        };

        if !media.duration_reported {
            media.duration_reported = true;
            events.push(BackendEvent::DurationKnown(media.duration));
        }

        if media.playing {
            Self::advance(media, now);
            events.push(BackendEvent::TimeUpdate(media.position));
            media.seeked = false;

            if media.position >= media.duration {
                media.playing = false;
                media.last_tick = None;
                events.push(BackendEvent::Ended);
            }
        } else if media.seeked {
            media.seeked = false;
            events.push(BackendEvent::TimeUpdate(media.position));
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn remote(url: &str) -> MediaSource {
        MediaSource {
            url: url.to_string(),
            subtitles: Vec::new(),
        }
    }

    #[test]
    fn test_probe_rejects_missing_local_files() {
        let mut backend = SimulatedBackend::new(60.0);
        assert!(backend.load(&remote("")).is_err());
        assert!(backend.load(&remote("/definitely/not/here.mp4")).is_err());
        assert!(backend.load(&remote("file:///definitely/not/here.mp4")).is_err());
        assert!(backend.load(&remote("https://cdn.example.com/a.mp4")).is_ok());
    }

    #[test]
    fn test_existing_local_file_loads() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut backend = SimulatedBackend::new(60.0);
        let source = remote(file.path().to_str().unwrap());
        assert!(backend.load(&source).is_ok());
    }

    #[test]
    fn test_duration_reported_once() {
        let mut backend = SimulatedBackend::new(60.0);
        backend.load(&remote("https://cdn.example.com/a.mp4")).unwrap();

        let now = Instant::now();
        assert_eq!(backend.poll(now), vec![BackendEvent::DurationKnown(60.0)]);
        assert!(backend.poll(now).is_empty());
    }

    #[test]
    fn test_playing_advances_with_clock() {
        let mut backend = SimulatedBackend::new(60.0);
        backend.load(&remote("https://cdn.example.com/a.mp4")).unwrap();
        let t0 = Instant::now();
        backend.poll(t0);

        backend.play().unwrap();
        backend.poll(t0);
        let events = backend.poll(t0 + Duration::from_secs(5));
        assert_eq!(events, vec![BackendEvent::TimeUpdate(5.0)]);

        backend.pause().unwrap();
        assert!(backend.poll(t0 + Duration::from_secs(20)).is_empty());
        assert_eq!(backend.position(), 5.0);
    }

    #[test]
    fn test_end_of_media() {
        let mut backend = SimulatedBackend::new(10.0);
        backend.load(&remote("https://cdn.example.com/a.mp4")).unwrap();
        let t0 = Instant::now();
        backend.poll(t0);
        backend.play().unwrap();
        backend.poll(t0);

        let events = backend.poll(t0 + Duration::from_secs(30));
        assert_eq!(
            events,
            vec![BackendEvent::TimeUpdate(10.0), BackendEvent::Ended]
        );
        // Ended fires once
        assert!(backend.poll(t0 + Duration::from_secs(31)).is_empty());
    }

    #[test]
    fn test_seek_clamps_to_media_bounds() {
        let mut backend = SimulatedBackend::new(100.0);
        backend.load(&remote("https://cdn.example.com/a.mp4")).unwrap();

        backend.seek_to(-10.0).unwrap();
        assert_eq!(backend.position(), 0.0);
        backend.seek_to(250.0).unwrap();
        assert_eq!(backend.position(), 100.0);
        backend.seek_to(42.5).unwrap();
        assert_eq!(backend.position(), 42.5);

        let events = backend.poll(Instant::now());
        assert!(events.contains(&BackendEvent::TimeUpdate(42.5)));
    }

    #[test]
    fn test_commands_without_media() {
        let mut backend = SimulatedBackend::new(10.0);
        assert!(backend.play().is_err());
        assert!(backend.seek_to(1.0).is_err());
        assert!(backend.pause().is_ok());
        assert!(backend.poll(Instant::now()).is_empty());
    }
}
