use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::validate_enum;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralSettings,

    #[serde(default)]
    pub controls: ControlsSettings,

    #[serde(default)]
    pub engine: EngineSettings,
}

/// General daemon settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneralSettings {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Playlist JSON file (`~` is expanded)
    #[serde(default = "default_playlist")]
    pub playlist: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            playlist: default_playlist(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_playlist() -> String {
    dirs::config_dir()
        .map(|dir| dir.join("marquee").join("playlist.json"))
        .unwrap_or_else(|| PathBuf::from("playlist.json"))
        .to_string_lossy()
        .to_string()
}

/// Control bar behaviour
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControlsSettings {
    /// Idle time before the control bar hides
    #[serde(default = "default_hide_after")]
    pub hide_after_ms: u64,

    /// How long the play/pause glyph stays up
    #[serde(default = "default_glyph_flash")]
    pub glyph_flash_ms: u64,

    /// Height of the bottom strip where clicks belong to the controls
    #[serde(default = "default_control_bar_height")]
    pub control_bar_height: f32,

    #[serde(default = "default_seek_step")]
    pub seek_step_secs: f64,

    #[serde(default = "default_volume_step")]
    pub volume_step: f64,
}

impl Default for ControlsSettings {
    fn default() -> Self {
        Self {
            hide_after_ms: default_hide_after(),
            glyph_flash_ms: default_glyph_flash(),
            control_bar_height: default_control_bar_height(),
            seek_step_secs: default_seek_step(),
            volume_step: default_volume_step(),
        }
    }
}

impl ControlsSettings {
    pub fn hide_after(&self) -> Duration {
        Duration::from_millis(self.hide_after_ms)
    }

    pub fn glyph_flash(&self) -> Duration {
        Duration::from_millis(self.glyph_flash_ms)
    }
}

fn default_hide_after() -> u64 {
    3000
}
fn default_glyph_flash() -> u64 {
    500
}
fn default_control_bar_height() -> f32 {
    100.0
}
fn default_seek_step() -> f64 {
    10.0
}
fn default_volume_step() -> f64 {
    0.1
}

/// Media engine settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineSettings {
    /// simulated | gstreamer
    #[serde(default = "default_backend")]
    pub backend: String,

    #[serde(default = "default_volume")]
    pub initial_volume: f64,

    /// Media length reported by the simulated backend
    #[serde(default = "default_simulated_duration")]
    pub simulated_duration_secs: f64,

    /// Engine polling interval (timeupdate cadence)
    #[serde(default = "default_tick")]
    pub tick_ms: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            initial_volume: default_volume(),
            simulated_duration_secs: default_simulated_duration(),
            tick_ms: default_tick(),
        }
    }
}

impl EngineSettings {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

fn default_backend() -> String {
    "simulated".to_string()
}
fn default_volume() -> f64 {
    1.0
}
fn default_simulated_duration() -> f64 {
    600.0
}
fn default_tick() -> u64 {
    250
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!(
                "Config file not found at {}, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded configuration from {}", path.display());
        config.validate()?;

        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("marquee");

        Ok(config_dir.join("config.toml"))
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        validate_enum!(
            self.general.log_level.as_str(),
            "trace",
            "debug",
            "info",
            "warn",
            "error"
        )?;
        validate_enum!(self.engine.backend.as_str(), "simulated", "gstreamer")?;

        if !(0.0..=1.0).contains(&self.engine.initial_volume) {
            anyhow::bail!(
                "Invalid initial volume: {} (must be 0.0-1.0)",
                self.engine.initial_volume
            );
        }
        if self.engine.tick_ms == 0 {
            anyhow::bail!("Engine tick interval must be greater than zero");
        }
        if self.controls.hide_after_ms == 0 || self.controls.glyph_flash_ms == 0 {
            anyhow::bail!("Control timers must be greater than zero");
        }
        if self.controls.control_bar_height < 0.0 {
            anyhow::bail!(
                "Invalid control bar height: {}",
                self.controls.control_bar_height
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.log_level, "info");
        assert!(config.general.playlist.ends_with("playlist.json"));
        assert_eq!(config.controls.hide_after_ms, 3000);
        assert_eq!(config.controls.glyph_flash_ms, 500);
        assert_eq!(config.controls.seek_step_secs, 10.0);
        assert_eq!(config.engine.backend, "simulated");
        assert_eq!(config.engine.tick_ms, 250);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config() {
        let toml = r#"
[general]
log_level = "debug"

[controls]
hide_after_ms = 1500
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.controls.hide_after(), Duration::from_millis(1500));
        // Untouched fields keep their defaults
        assert_eq!(config.controls.glyph_flash(), Duration::from_millis(500));
        assert_eq!(config.controls.control_bar_height, 100.0);
        assert_eq!(config.engine.initial_volume, 1.0);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.general.log_level = "loud".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.engine.backend = "vlc".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.engine.initial_volume = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.engine.tick_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[engine]\nbackend = \"gstreamer\"\ntick_ms = 100").unwrap();

        let config = Config::load_from_path(file.path()).unwrap();
        assert_eq!(config.engine.backend, "gstreamer");
        assert_eq!(config.engine.tick(), Duration::from_millis(100));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from_path(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[controls\nhide_after_ms = ").unwrap();
        assert!(Config::load_from_path(file.path()).is_err());
    }
}
