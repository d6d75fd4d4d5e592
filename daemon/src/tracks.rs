use common::PlaylistEntry;

/// Receives audio-track selections.
///
/// No multi-track audio path exists, so a selection never changes playback;
/// the hook is where an integration would observe it.
pub trait AudioTrackHook: Send {
    fn audio_track_selected(&mut self, label: &str);
}

/// Default hook: log the switch
#[derive(Debug, Default)]
pub struct LogAudioHook;

impl AudioTrackHook for LogAudioHook {
    fn audio_track_selected(&mut self, label: &str) {
        log::info!("Switching to audio track: {} (not applied to playback)", label);
    }
}

/// Subtitle and audio-track selection for the active entry
pub struct TrackSelection {
    subtitle: Option<String>,
    audio: Option<String>,
    hook: Box<dyn AudioTrackHook>,
    /// Every audio switch ever requested, in order
    audio_switches: Vec<String>,
}

impl TrackSelection {
    pub fn new(hook: Box<dyn AudioTrackHook>) -> Self {
        Self {
            subtitle: None,
            audio: None,
            hook,
            audio_switches: Vec::new(),
        }
    }

    /// Select a subtitle label among the active entry's tracks.
    ///
    /// Unknown or empty labels clear the selection. Returns the label that
    /// should end up showing, if any.
    pub fn select_subtitle(&mut self, label: &str, entry: Option<&PlaylistEntry>) -> Option<&str> {
        self.subtitle = if entry.is_some_and(|e| e.has_subtitle(label)) {
            Some(label.to_string())
        } else {
            if !label.is_empty() {
                log::debug!("No subtitle track labelled '{}', hiding subtitles", label);
            }
            None
        };
        self.subtitle.as_deref()
    }

    /// Record an audio-track selection and notify the hook
    pub fn select_audio_track(&mut self, label: &str) {
        self.audio = Some(label.to_string());
        self.audio_switches.push(label.to_string());
        self.hook.audio_track_selected(label);
    }

    /// Clear both selections (on active-entry change)
    pub fn reset(&mut self) {
        self.subtitle = None;
        self.audio = None;
    }

    pub fn subtitle(&self) -> Option<&str> {
        self.subtitle.as_deref()
    }

    pub fn audio(&self) -> Option<&str> {
        self.audio.as_deref()
    }

    pub fn audio_switches(&self) -> &[String] {
        &self.audio_switches
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingHook;
    use super::*;

    use common::{DeclaredType, TrackSource};

    fn with_subtitles(labels: &[&str]) -> PlaylistEntry {
        PlaylistEntry {
            url: "/movie.mp4".to_string(),
            display_name: "Movie".to_string(),
            declared_type: DeclaredType::from("standard".to_string()),
            subtitle_tracks: labels
                .iter()
                .map(|l| TrackSource {
                    label: l.to_string(),
                    src: format!("/{}.vtt", l),
                })
                .collect(),
            audio_tracks: Vec::new(),
        }
    }

    #[test]
    fn test_subtitle_must_exist() {
        let mut selection = TrackSelection::new(Box::new(LogAudioHook));
        let entry = with_subtitles(&["en", "fr"]);

        assert_eq!(selection.select_subtitle("fr", Some(&entry)), Some("fr"));
        assert_eq!(selection.subtitle(), Some("fr"));

        assert_eq!(selection.select_subtitle("de", Some(&entry)), None);
        assert_eq!(selection.subtitle(), None);

        selection.select_subtitle("en", Some(&entry));
        assert_eq!(selection.select_subtitle("", Some(&entry)), None);

        // Nothing active, nothing to show
        assert_eq!(selection.select_subtitle("en", None), None);
    }

    #[test]
    fn test_audio_selection_is_advisory() {
        let hook = RecordingHook::default();
        let mut selection = TrackSelection::new(Box::new(hook.clone()));

        selection.select_audio_track("Commentary");
        selection.select_audio_track("Original");
        assert_eq!(selection.audio(), Some("Original"));
        assert_eq!(hook.labels(), vec!["Commentary", "Original"]);
        assert_eq!(selection.audio_switches().len(), 2);
    }

    #[test]
    fn test_reset_keeps_switch_log() {
        let mut selection = TrackSelection::new(Box::new(LogAudioHook));
        selection.select_subtitle("en", Some(&with_subtitles(&["en"])));
        selection.select_audio_track("Commentary");

        selection.reset();
        assert_eq!(selection.subtitle(), None);
        assert_eq!(selection.audio(), None);
        assert_eq!(selection.audio_switches(), ["Commentary".to_string()]);
    }
}
