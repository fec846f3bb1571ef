//! Lists audio input and output devices.

use crate::error::VoxError;
use crate::recording::microphone::suppress_alsa_warnings;
use cpal::traits::{DeviceTrait, HostTrait};

/// Prints every input device (usable as `[audio] device`) and every output device.
///
/// # Errors
/// - If the audio host cannot enumerate devices
pub fn handle_list_devices() -> anyhow::Result<()> {
    let (inputs, outputs, default_input, default_output) = suppress_alsa_warnings(|| {
        let host = cpal::default_host();
        let inputs: Vec<cpal::Device> = host
            .input_devices()
            .map_err(|e| VoxError::device(format!("Failed to enumerate audio devices: {e}")))?
            .filter(|d| d.name().is_ok())
            .collect();
        let outputs: Vec<cpal::Device> = host
            .output_devices()
            .map(|devices| devices.filter(|d| d.name().is_ok()).collect())
            .unwrap_or_default();
        let default_input = host.default_input_device().and_then(|d| d.name().ok());
        let default_output = host.default_output_device().and_then(|d| d.name().ok());
        Ok((inputs, outputs, default_input, default_output))
    })?;

    if inputs.is_empty() {
        println!("No audio input devices found on this system.");
    } else {
        println!("Audio input devices:");
        println!();
        for (index, device) in inputs.iter().enumerate() {
            print_device(index, device, default_input.as_deref(), |d| {
                d.default_input_config().ok().map(|c| (c.sample_rate().0, c.channels()))
            });
        }
    }

    if !outputs.is_empty() {
        println!("Audio output devices:");
        println!();
        for (index, device) in outputs.iter().enumerate() {
            print_device(index, device, default_output.as_deref(), |d| {
                d.default_output_config().ok().map(|c| (c.sample_rate().0, c.channels()))
            });
        }
    }

    Ok(())
}

fn print_device(
    index: usize,
    device: &cpal::Device,
    default_name: Option<&str>,
    config: impl Fn(&cpal::Device) -> Option<(u32, u16)>,
) {
    let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    let default_indicator = if default_name == Some(name.as_str()) {
        " [DEFAULT]"
    } else {
        ""
    };
    let config_info = match config(device) {
        Some((rate, channels)) => format!(" ({rate}Hz, {channels} channels)"),
        None => " (configuration unavailable)".to_string(),
    };

    println!("  ID: {index}");
    println!("    Name: {name}{default_indicator}");
    println!("    Config:{config_info}");
    println!();
}
