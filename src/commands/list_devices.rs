//! List available audio input devices.

use crate::capture::devices::{backend_default_id, device_list, list_devices};
use crate::capture::find_ffmpeg;
use crate::config::VizConfig;

/// Prints the capture devices ffmpeg reports for the configured backend.
///
/// The device that `device = "default"` would resolve to through
/// `preferred_device` is marked.
///
/// # Errors
/// - If ffmpeg cannot be found or run
/// - If the backend's device listing cannot be parsed
pub fn handle_list_devices() -> anyhow::Result<()> {
    // A broken config should not stop the user from finding a device id.
    let audio = VizConfig::load().map(|c| c.audio).unwrap_or_default();
    let ffmpeg = find_ffmpeg()?;
    let list = device_list(
        list_devices(&ffmpeg, &audio.input_format)?,
        audio.preferred_device.as_deref(),
    );

    if list.devices.is_empty() {
        println!("No audio input devices found for '{}'.", audio.input_format);
        return Ok(());
    }

    println!();
    println!("Audio input devices ({}):", audio.input_format);
    println!();

    for (position, device) in list.devices.iter().enumerate() {
        let marker = if list.preferred == Some(position) {
            " [PREFERRED]"
        } else {
            ""
        };
        println!("  [{}] {}{}", device.index, device.name, marker);
        println!("      device = \"{}\"", device.id);
    }

    println!();
    println!(
        "Without a preferred match, \"default\" uses \"{}\".",
        backend_default_id(&audio.input_format)
    );

    Ok(())
}
