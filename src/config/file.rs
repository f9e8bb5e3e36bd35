//! Configuration file management for pcmviz.
//!
//! This module loads and validates application configuration from TOML files.
//! Configuration is stored in the user's config directory.

use crate::capture::default_input_format;
use crate::error::VizError;
use crate::render::scheduler::DEFAULT_TICK;
use crate::render::params::DEFAULT_CURSOR_GAP;
use crate::render::ViewParameters;
use anyhow::{anyhow, Context};
use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Audio capture configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Capture device. Options:
    /// - "default" to resolve through `preferred_device` or the backend default
    /// - a backend identifier from `pcmviz list-devices` (e.g. ":1", "audio=Mic")
    #[serde(default = "default_device")]
    pub device: String,
    /// ffmpeg input format ("avfoundation", "pulse", "alsa", "dshow")
    #[serde(default = "default_format")]
    pub input_format: String,
    /// Case-insensitive name fragment used to pick a device when `device` is "default"
    #[serde(default)]
    pub preferred_device: Option<String>,
    /// Capture sample rate in Hz
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Seconds of history kept in the ring buffer
    #[serde(default = "default_buffer_seconds")]
    pub buffer_seconds: u32,
    /// Frames per read from the capture stream
    #[serde(default = "default_block_size")]
    pub block_size: usize,
    /// How long to wait for the first block before reporting the device unavailable
    #[serde(default = "default_startup_timeout_ms")]
    pub startup_timeout_ms: u64,
    /// Start capturing as soon as the visualizer opens
    #[serde(default = "default_true")]
    pub autostart: bool,
}

fn default_device() -> String {
    "default".to_string()
}

fn default_format() -> String {
    default_input_format().to_string()
}

fn default_sample_rate() -> u32 {
    44100
}

fn default_buffer_seconds() -> u32 {
    5
}

fn default_block_size() -> usize {
    1024
}

fn default_startup_timeout_ms() -> u64 {
    3000
}

fn default_true() -> bool {
    true
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            input_format: default_format(),
            preferred_device: None,
            sample_rate: default_sample_rate(),
            buffer_seconds: default_buffer_seconds(),
            block_size: default_block_size(),
            startup_timeout_ms: default_startup_timeout_ms(),
            autostart: true,
        }
    }
}

impl AudioConfig {
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }
}

/// Waveform display configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Render period in milliseconds
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// Samples between the newest sample and the cursor line
    #[serde(default = "default_cursor_gap")]
    pub cursor_gap: usize,
    #[serde(default = "default_threshold_warning")]
    pub threshold_warning: f32,
    #[serde(default = "default_threshold_critical")]
    pub threshold_critical: f32,
    #[serde(default = "default_one")]
    pub amplitude_factor: f32,
    #[serde(default = "default_one")]
    pub time_zoom_factor: f32,
    #[serde(default)]
    pub vertical_padding_factor: f32,
    /// Color the warning and critical amplitude bands
    #[serde(default = "default_true")]
    pub banding: bool,
    /// Show the cursor line near the newest sample
    #[serde(default)]
    pub cursor: bool,
    #[serde(default = "default_wave_color")]
    pub wave_color: String,
    #[serde(default = "default_background_color")]
    pub background_color: String,
    #[serde(default = "default_warning_color")]
    pub warning_color: String,
    #[serde(default = "default_critical_color")]
    pub critical_color: String,
}

fn default_tick_ms() -> u64 {
    DEFAULT_TICK.as_millis() as u64
}

fn default_cursor_gap() -> usize {
    DEFAULT_CURSOR_GAP
}

fn default_threshold_warning() -> f32 {
    0.7
}

fn default_threshold_critical() -> f32 {
    0.9
}

fn default_one() -> f32 {
    1.0
}

fn default_wave_color() -> String {
    "white".to_string()
}

fn default_background_color() -> String {
    "black".to_string()
}

fn default_warning_color() -> String {
    "#ffa500".to_string()
}

fn default_critical_color() -> String {
    "#ff0000".to_string()
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            cursor_gap: default_cursor_gap(),
            threshold_warning: default_threshold_warning(),
            threshold_critical: default_threshold_critical(),
            amplitude_factor: 1.0,
            time_zoom_factor: 1.0,
            vertical_padding_factor: 0.0,
            banding: true,
            cursor: false,
            wave_color: default_wave_color(),
            background_color: default_background_color(),
            warning_color: default_warning_color(),
            critical_color: default_critical_color(),
        }
    }
}

/// Parsed display colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub wave: Color,
    pub background: Color,
    pub warning: Color,
    pub critical: Color,
}

impl DisplayConfig {
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// Builds the initial view parameters from this section.
    ///
    /// # Errors
    /// - `InvalidParameter` if any value is out of range
    pub fn view_parameters(&self) -> Result<ViewParameters, VizError> {
        let mut params = ViewParameters::default();
        params.set_amplitude_factor(self.amplitude_factor)?;
        params.set_time_zoom_factor(self.time_zoom_factor)?;
        params.set_vertical_padding_factor(self.vertical_padding_factor)?;
        params.set_thresholds(self.threshold_warning, self.threshold_critical)?;
        params.set_cursor_gap(self.cursor_gap);
        params.banding_enabled = self.banding;
        params.cursor_enabled = self.cursor;
        Ok(params)
    }

    /// # Errors
    /// - `InvalidParameter` naming the first color that does not parse
    pub fn palette(&self) -> Result<Palette, VizError> {
        Ok(Palette {
            wave: parse_color("wave_color", &self.wave_color)?,
            background: parse_color("background_color", &self.background_color)?,
            warning: parse_color("warning_color", &self.warning_color)?,
            critical: parse_color("critical_color", &self.critical_color)?,
        })
    }
}

/// Accepts ratatui color names ("white", "lightred") and `#rrggbb`.
fn parse_color(field: &str, value: &str) -> Result<Color, VizError> {
    Color::from_str(value.trim())
        .map_err(|_| VizError::InvalidParameter(format!("{field}: unknown color '{value}'")))
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VizConfig {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

impl VizConfig {
    /// Loads configuration from the user's config directory.
    ///
    /// # Errors
    /// - If the config directory cannot be determined
    /// - If the config file cannot be read
    /// - If the TOML is malformed or a value is out of range
    pub fn load() -> anyhow::Result<Self> {
        let config_path = get_config_path()?;
        let config_content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        Self::from_toml(&config_content)
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    /// - If the TOML is malformed or a value is out of range
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: VizConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every value the capture and render core would reject.
    ///
    /// # Errors
    /// - `InvalidParameter` describing the first bad value
    pub fn validate(&self) -> Result<(), VizError> {
        let audio = &self.audio;
        if audio.device.trim().is_empty() {
            return Err(VizError::InvalidParameter("audio.device must not be empty".into()));
        }
        if audio.input_format.trim().is_empty() {
            return Err(VizError::InvalidParameter(
                "audio.input_format must not be empty".into(),
            ));
        }
        if audio.sample_rate == 0 {
            return Err(VizError::InvalidParameter("audio.sample_rate must be positive".into()));
        }
        if audio.buffer_seconds == 0 {
            return Err(VizError::InvalidParameter(
                "audio.buffer_seconds must be positive".into(),
            ));
        }
        if audio.block_size == 0 {
            return Err(VizError::InvalidParameter("audio.block_size must be positive".into()));
        }
        if audio.startup_timeout_ms == 0 {
            return Err(VizError::InvalidParameter(
                "audio.startup_timeout_ms must be positive".into(),
            ));
        }
        if self.display.tick_ms == 0 {
            return Err(VizError::InvalidParameter("display.tick_ms must be positive".into()));
        }
        self.display.view_parameters()?;
        self.display.palette()?;
        Ok(())
    }
}

/// Retrieves the path to the config file, creating its directory if needed.
///
/// # Errors
/// - If the home directory cannot be determined
/// - If the config directory cannot be created
pub fn get_config_path() -> anyhow::Result<PathBuf> {
    let config_dir = dirs::home_dir()
        .ok_or_else(|| anyhow!("Could not determine home directory"))?
        .join(".config")
        .join("pcmviz");

    fs::create_dir_all(&config_dir)
        .map_err(|e| anyhow!("Failed to create config directory: {e}"))?;

    Ok(config_dir.join("pcmviz.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = VizConfig::from_toml("").unwrap();
        assert_eq!(config.audio.device, "default");
        assert_eq!(config.audio.sample_rate, 44100);
        assert_eq!(config.audio.buffer_seconds, 5);
        assert_eq!(config.audio.block_size, 1024);
        assert_eq!(config.display.tick_period(), Duration::from_millis(100));
        assert_eq!(config.display.cursor_gap, 5);
        assert_eq!(config.display.threshold_warning, 0.7);
        assert_eq!(config.display.threshold_critical, 0.9);
    }

    #[test]
    fn partial_sections_fill_in_defaults() {
        let config = VizConfig::from_toml(
            r##"
            [audio]
            device = ":2"
            preferred_device = "soundcraft"

            [display]
            cursor = true
            wave_color = "#009e00"
            "##,
        )
        .unwrap();
        assert_eq!(config.audio.device, ":2");
        assert_eq!(config.audio.preferred_device.as_deref(), Some("soundcraft"));
        assert_eq!(config.audio.block_size, 1024);
        assert!(config.display.cursor);
        assert!(config.display.banding);

        let palette = config.display.palette().unwrap();
        assert_eq!(palette.wave, Color::Rgb(0, 0x9e, 0));
        assert_eq!(palette.background, Color::Black);
        assert_eq!(palette.warning, Color::Rgb(0xff, 0xa5, 0));
    }

    #[test]
    fn rejects_out_of_range_values() {
        for doc in [
            "[audio]\nsample_rate = 0",
            "[audio]\nblock_size = 0",
            "[audio]\nbuffer_seconds = 0",
            "[display]\ntick_ms = 0",
            "[display]\nthreshold_warning = 0.95",
            "[display]\namplitude_factor = -1.0",
            "[display]\ncritical_color = \"not-a-color\"",
        ] {
            assert!(VizConfig::from_toml(doc).is_err(), "accepted: {doc}");
        }
    }

    #[test]
    fn view_parameters_follow_display_section() {
        let config = VizConfig::from_toml(
            "[display]\ntime_zoom_factor = 0.5\namplitude_factor = 2.0\nbanding = false",
        )
        .unwrap();
        let params = config.display.view_parameters().unwrap();
        assert_eq!(params.time_zoom_factor(), 1.0);
        assert_eq!(params.amplitude_factor(), 2.0);
        assert!(!params.banding_enabled);
    }

    #[test]
    fn round_trips_through_toml() {
        let config = VizConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed = VizConfig::from_toml(&text).unwrap();
        assert_eq!(parsed.audio.sample_rate, config.audio.sample_rate);
        assert_eq!(parsed.display.warning_color, config.display.warning_color);
    }
}
