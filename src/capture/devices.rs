//! Input device enumeration through ffmpeg.
//!
//! Each capture backend prints its device list differently. The parsers here
//! turn that output into `(index, name)` pairs plus the identifier ffmpeg
//! expects on `-i`. Resolution of the "default" device happens here too, so
//! the capture core only ever sees a concrete identifier.

use anyhow::anyhow;
use regex::Regex;
use std::path::Path;
use std::process::Command;

/// One capture device as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDevice {
    pub index: usize,
    pub name: String,
    /// Value passed to ffmpeg's `-i`.
    pub id: String,
}

/// Device list plus the entry that should be pre-selected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceList {
    pub devices: Vec<InputDevice>,
    pub preferred: Option<usize>,
}

/// Queries ffmpeg for the input devices of `input_format`.
///
/// # Errors
/// - If ffmpeg cannot be executed
/// - If the backend has no known listing format
pub fn list_devices(ffmpeg: &Path, input_format: &str) -> anyhow::Result<Vec<InputDevice>> {
    match input_format {
        "avfoundation" => {
            let output = Command::new(ffmpeg)
                .args(["-hide_banner", "-f", "avfoundation", "-list_devices", "true", "-i", ""])
                .output()
                .map_err(|e| anyhow!("Failed to run ffmpeg: {e}"))?;
            // The listing goes to stderr and ffmpeg exits non-zero by design.
            parse_avfoundation(&String::from_utf8_lossy(&output.stderr))
        }
        "dshow" => {
            let output = Command::new(ffmpeg)
                .args(["-hide_banner", "-list_devices", "true", "-f", "dshow", "-i", "dummy"])
                .output()
                .map_err(|e| anyhow!("Failed to run ffmpeg: {e}"))?;
            parse_dshow(&String::from_utf8_lossy(&output.stderr))
        }
        "pulse" | "alsa" => {
            let output = Command::new(ffmpeg)
                .args(["-hide_banner", "-sources", input_format])
                .output()
                .map_err(|e| anyhow!("Failed to run ffmpeg: {e}"))?;
            parse_sources(&String::from_utf8_lossy(&output.stdout))
        }
        other => Err(anyhow!(
            "Device listing is not supported for input format '{other}'"
        )),
    }
}

/// Parses `-f avfoundation -list_devices true` output, audio section only.
pub fn parse_avfoundation(output: &str) -> anyhow::Result<Vec<InputDevice>> {
    let Some((_, audio_section)) = output.split_once("AVFoundation audio devices:") else {
        return Ok(Vec::new());
    };
    let line_re = Regex::new(r"\[(\d+)\]\s+(.+)$")?;

    let devices = audio_section
        .lines()
        .filter_map(|line| {
            let caps = line_re.captures(line.trim_end())?;
            let index: usize = caps[1].parse().ok()?;
            let name = caps[2].trim().to_string();
            Some(InputDevice {
                index,
                id: format!(":{index}"),
                name,
            })
        })
        .collect();
    Ok(devices)
}

/// Parses `-f dshow -list_devices true` output, keeping audio devices.
pub fn parse_dshow(output: &str) -> anyhow::Result<Vec<InputDevice>> {
    let line_re = Regex::new(r#""([^"]+)"\s+\(audio\)"#)?;

    let devices = line_re
        .captures_iter(output)
        .enumerate()
        .map(|(index, caps)| {
            let name = caps[1].to_string();
            InputDevice {
                index,
                id: format!("audio={name}"),
                name,
            }
        })
        .collect();
    Ok(devices)
}

/// Parses `ffmpeg -sources <backend>` output.
///
/// Lines look like `* alsa_input.usb-Mixer.analog-stereo [Mixer Analog Stereo]`,
/// where the leading `*` marks the backend's default.
pub fn parse_sources(output: &str) -> anyhow::Result<Vec<InputDevice>> {
    let line_re = Regex::new(r"^\s*\*?\s*(\S+)\s+\[(.+)\]\s*$")?;

    let devices = output
        .lines()
        .filter_map(|line| line_re.captures(line))
        .enumerate()
        .map(|(index, caps)| InputDevice {
            index,
            id: caps[1].to_string(),
            name: caps[2].to_string(),
        })
        .collect();
    Ok(devices)
}

/// Picks the device whose name contains `hint` (case-insensitive).
pub fn preferred_index(devices: &[InputDevice], hint: Option<&str>) -> Option<usize> {
    let hint = hint.map(str::trim).filter(|h| !h.is_empty())?.to_lowercase();
    devices
        .iter()
        .position(|d| d.name.to_lowercase().contains(&hint))
}

/// Builds the list shown to the user with the preferred entry marked.
pub fn device_list(devices: Vec<InputDevice>, hint: Option<&str>) -> DeviceList {
    let preferred = preferred_index(&devices, hint);
    DeviceList { devices, preferred }
}

/// The identifier that means "system default" for a backend.
pub fn backend_default_id(input_format: &str) -> &'static str {
    match input_format {
        "avfoundation" => ":0",
        _ => "default",
    }
}

/// Turns the configured device into a concrete ffmpeg identifier.
///
/// Anything other than `"default"` passes through unchanged. For
/// `"default"`, the preferred-name hint wins, then the backend's own default;
/// DirectShow has no default so its first device is used.
pub fn resolve_device(
    configured: &str,
    input_format: &str,
    devices: &[InputDevice],
    hint: Option<&str>,
) -> String {
    if configured.trim() != "default" {
        return configured.trim().to_string();
    }
    if let Some(index) = preferred_index(devices, hint) {
        tracing::debug!("Preferred device matched: {}", devices[index].name);
        return devices[index].id.clone();
    }
    if input_format == "dshow" {
        if let Some(first) = devices.first() {
            return first.id.clone();
        }
    }
    backend_default_id(input_format).to_string()
}
