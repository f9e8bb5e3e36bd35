//! Live waveform view.
//!
//! Wires the capture worker, ring buffer, render scheduler and terminal UI
//! together and runs the event loop. Supports external start/stop via
//! SIGUSR1.

use crate::capture::devices::list_devices;
use crate::capture::{resolve_device, CaptureExit, CaptureWorker, FfmpegSource, RingBuffer};
use crate::config::{AudioConfig, VizConfig};
use crate::render::{RenderScheduler, ViewParameters};
use crate::ui::{show_error_screen, StatusLine, ViewCommand, VizTui};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Command-line overrides for the `[audio]` section.
#[derive(Debug, Clone, Default)]
pub struct ViewOptions {
    pub device: Option<String>,
    pub sample_rate: Option<u32>,
    pub buffer_seconds: Option<u32>,
    pub block_size: Option<usize>,
    pub no_autostart: bool,
}

impl ViewOptions {
    fn apply(&self, audio: &mut AudioConfig) {
        if let Some(device) = &self.device {
            audio.device = device.clone();
        }
        if let Some(rate) = self.sample_rate {
            audio.sample_rate = rate;
        }
        if let Some(seconds) = self.buffer_seconds {
            audio.buffer_seconds = seconds;
        }
        if let Some(block) = self.block_size {
            audio.block_size = block;
        }
        if self.no_autostart {
            audio.autostart = false;
        }
    }
}

/// Opens the waveform view and runs until the user quits.
///
/// # Errors
/// - If the configuration is invalid
/// - If ffmpeg cannot be found
/// - If the terminal cannot be driven
pub fn handle_view(options: ViewOptions) -> anyhow::Result<()> {
    tracing::info!("=== pcmviz view started ===");

    let config = match load_config(&options) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("Failed to load configuration: {err}");
            show_error_screen(
                "Configuration error",
                &format!("{err}\n\nPlease check ~/.config/pcmviz/pcmviz.toml and try again."),
            )?;
            return Err(anyhow::anyhow!("Configuration error: {err}"));
        }
    };
    let audio = &config.audio;

    tracing::info!(
        "Configuration loaded: device={}, format={}, sample_rate={}Hz, buffer={}s, block={}",
        audio.device,
        audio.input_format,
        audio.sample_rate,
        audio.buffer_seconds,
        audio.block_size
    );

    let source = match FfmpegSource::locate(audio.input_format.clone()) {
        Ok(source) => source,
        Err(err) => {
            tracing::error!("{err}");
            show_error_screen("ffmpeg not found", &err.to_string())?;
            return Err(err.into());
        }
    };

    let device = configured_device(audio, &source);
    tracing::info!("Capture device: {device}");

    let initial = config.display.view_parameters()?;
    let buffer = Arc::new(RingBuffer::with_duration(audio.sample_rate, audio.buffer_seconds)?);
    let worker = CaptureWorker::new(source, Arc::clone(&buffer), audio.startup_timeout());
    let scheduler = RenderScheduler::new(config.display.tick_period())?;
    tracing::debug!(
        "Ring buffer holds {} samples, render period {:?}",
        buffer.capacity(),
        scheduler.period()
    );

    let toggle = Arc::new(AtomicBool::new(false));
    #[cfg(unix)]
    signal_hook::flag::register(signal_hook::consts::SIGUSR1, Arc::clone(&toggle))
        .map_err(|e| anyhow::anyhow!("Failed to register signal handler: {e}"))?;

    let tui = VizTui::new(config.display.palette()?)?;

    let mut view = ViewLoop {
        worker,
        buffer,
        scheduler,
        tui,
        params: initial,
        initial,
        device,
        sample_rate: audio.sample_rate,
        block_size: audio.block_size,
        notice: None,
        was_capturing: false,
    };

    if audio.autostart {
        view.toggle_capture();
    }

    let result = view.run(&toggle);
    view.worker.stop();
    view.tui.cleanup()?;

    tracing::info!(
        "=== pcmviz view exited after {} frames ===",
        view.scheduler.ticks()
    );
    result
}

fn load_config(options: &ViewOptions) -> anyhow::Result<VizConfig> {
    let mut config = VizConfig::load()?;
    options.apply(&mut config.audio);
    config.validate()?;
    Ok(config)
}

/// Resolves "default" through the device list when a preferred name is set.
fn configured_device(audio: &AudioConfig, source: &FfmpegSource) -> String {
    let wants_lookup = audio.device.trim() == "default"
        && (audio.preferred_device.is_some() || source.input_format() == "dshow");
    let devices = if wants_lookup {
        list_devices(source.ffmpeg_path(), source.input_format()).unwrap_or_else(|e| {
            tracing::warn!("Device enumeration failed: {e}");
            Vec::new()
        })
    } else {
        Vec::new()
    };
    resolve_device(
        &audio.device,
        source.input_format(),
        &devices,
        audio.preferred_device.as_deref(),
    )
}

struct ViewLoop {
    worker: CaptureWorker<FfmpegSource>,
    buffer: Arc<RingBuffer>,
    scheduler: RenderScheduler,
    tui: VizTui,
    params: ViewParameters,
    initial: ViewParameters,
    device: String,
    sample_rate: u32,
    block_size: usize,
    notice: Option<String>,
    was_capturing: bool,
}

impl ViewLoop {
    fn run(&mut self, toggle: &AtomicBool) -> anyhow::Result<()> {
        loop {
            if toggle.swap(false, Ordering::Relaxed) {
                tracing::info!("Received SIGUSR1: toggling capture");
                self.toggle_capture();
            }

            let timeout = self.scheduler.time_until_tick(Instant::now());
            match self.tui.handle_input(timeout)? {
                ViewCommand::Quit => break,
                ViewCommand::ToggleCapture => self.toggle_capture(),
                ViewCommand::CycleWaveColor => self.tui.cycle_wave_color(),
                ViewCommand::CycleBackgroundColor => self.tui.cycle_background_color(),
                command => apply_command(&mut self.params, &self.initial, command)?,
            }

            self.observe_capture(Instant::now());
            self.tui.set_status(self.status_line());
            self.scheduler
                .tick_if_due(Instant::now(), &self.buffer, &self.params, &mut self.tui)?;
        }
        Ok(())
    }

    /// Stops an active session or starts a new one. A start only spawns
    /// the source; the first-block handshake settles in `observe_capture`.
    fn toggle_capture(&mut self) {
        if self.worker.is_active() {
            self.worker.stop();
            self.notice = None;
        } else {
            tracing::info!("Starting capture on {}", self.device);
            match self.worker.start(&self.device, self.sample_rate, self.block_size) {
                Ok(()) => self.notice = None,
                Err(e) => {
                    tracing::warn!("Capture start failed: {e}");
                    self.notice = Some(e.to_string());
                }
            }
        }
        self.was_capturing = self.worker.is_capturing();
    }

    /// Settles a pending start and turns a session that ended on its own
    /// into a footer notice.
    fn observe_capture(&mut self, now: Instant) {
        if let Some(Err(e)) = self.worker.poll_startup(now) {
            tracing::warn!("Capture start failed: {e}");
            self.notice = Some(e.to_string());
        }

        let capturing = self.worker.is_capturing();
        if self.was_capturing && !capturing {
            self.notice = match self.worker.status().last_exit {
                Some(CaptureExit::StreamEnded) => Some("capture stream ended".to_string()),
                Some(CaptureExit::Failed(message)) => Some(message),
                Some(CaptureExit::Stopped) | None => None,
            };
        }
        self.was_capturing = capturing;
    }

    fn status_line(&self) -> StatusLine {
        StatusLine {
            capturing: self.was_capturing,
            starting: self.worker.is_active() && !self.was_capturing,
            device: self.device.clone(),
            sample_rate: self.sample_rate,
            amplitude: self.params.amplitude_factor(),
            zoom: self.params.time_zoom_factor(),
            padding: self.params.vertical_padding_factor(),
            banding: self.params.banding_enabled,
            cursor: self.params.cursor_enabled,
            notice: self.notice.clone(),
        }
    }
}

/// Applies a parameter command. Commands that are not about view
/// parameters are ignored.
///
/// # Errors
/// - If restoring the initial values fails validation
fn apply_command(
    params: &mut ViewParameters,
    initial: &ViewParameters,
    command: ViewCommand,
) -> anyhow::Result<()> {
    match command {
        ViewCommand::Gain(steps) => params.adjust_amplitude(steps),
        ViewCommand::Zoom(steps) => params.adjust_zoom(steps),
        ViewCommand::Padding(steps) => params.adjust_padding(steps),
        ViewCommand::ToggleBanding => params.banding_enabled = !params.banding_enabled,
        ViewCommand::ToggleCursor => params.cursor_enabled = !params.cursor_enabled,
        ViewCommand::Reset => {
            params.set_amplitude_factor(initial.amplitude_factor())?;
            params.set_time_zoom_factor(initial.time_zoom_factor())?;
            params.set_vertical_padding_factor(initial.vertical_padding_factor())?;
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_override_audio_section() {
        let mut audio = AudioConfig::default();
        let options = ViewOptions {
            device: Some(":2".into()),
            block_size: Some(512),
            no_autostart: true,
            ..ViewOptions::default()
        };
        options.apply(&mut audio);
        assert_eq!(audio.device, ":2");
        assert_eq!(audio.block_size, 512);
        assert_eq!(audio.sample_rate, 44100);
        assert!(!audio.autostart);
    }

    #[test]
    fn commands_adjust_parameters() {
        let initial = ViewParameters::default();
        let mut params = initial;

        apply_command(&mut params, &initial, ViewCommand::Gain(5)).unwrap();
        apply_command(&mut params, &initial, ViewCommand::Zoom(10)).unwrap();
        apply_command(&mut params, &initial, ViewCommand::ToggleBanding).unwrap();
        apply_command(&mut params, &initial, ViewCommand::ToggleCursor).unwrap();

        assert!((params.amplitude_factor() - 1.5).abs() < 1e-5);
        assert!((params.time_zoom_factor() - 2.0).abs() < 1e-5);
        assert!(!params.banding_enabled);
        assert!(params.cursor_enabled);
    }

    #[test]
    fn reset_restores_scaling_but_keeps_toggles() {
        let mut initial = ViewParameters::default();
        initial.set_amplitude_factor(2.0).unwrap();
        let mut params = initial;

        apply_command(&mut params, &initial, ViewCommand::Gain(-3)).unwrap();
        apply_command(&mut params, &initial, ViewCommand::Padding(4)).unwrap();
        apply_command(&mut params, &initial, ViewCommand::ToggleCursor).unwrap();
        apply_command(&mut params, &initial, ViewCommand::Reset).unwrap();

        assert_eq!(params.amplitude_factor(), 2.0);
        assert_eq!(params.vertical_padding_factor(), 0.0);
        assert!(params.cursor_enabled);
    }
}
