use cpal::traits::{DeviceTrait, HostTrait};
use serde::{Deserialize, Serialize};

/// Information about an audio output device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioDeviceInfo {
    pub name: String,
    pub is_default: bool,
    /// Maximum number of output channels across the supported configs
    pub max_channels: u16,
}

/// Enumerate all available audio output devices
pub fn enumerate_audio_devices() -> Result<Vec<AudioDeviceInfo>, String> {
    let host = cpal::default_host();

    let default_device_name = host.default_output_device().and_then(|d| d.name().ok());

    let devices = host
        .output_devices()
        .map_err(|e| format!("Failed to enumerate audio devices: {e}"))?;

    let mut device_list = Vec::new();

    for device in devices {
        if let Ok(name) = device.name() {
            let max_channels = device
                .supported_output_configs()
                .ok()
                .and_then(|configs| configs.map(|c| c.channels()).max())
                .unwrap_or(2);
            let is_default = default_device_name.as_ref() == Some(&name);
            device_list.push(AudioDeviceInfo {
                name,
                is_default,
                max_channels,
            });
        }
    }

    // If no devices found, add a fallback
    if device_list.is_empty() {
        device_list.push(AudioDeviceInfo {
            name: "Default".to_string(),
            is_default: true,
            max_channels: 2,
        });
    }

    Ok(device_list)
}

/// Get the default audio device name
pub fn get_default_audio_device() -> String {
    let host = cpal::default_host();
    host.default_output_device()
        .and_then(|d| d.name().ok())
        .unwrap_or_else(|| "Default".to_string())
}
