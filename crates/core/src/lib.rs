//! Shared settings and device plumbing for twindeck.

pub use audio::device_enumerator::{
    enumerate_audio_devices, get_default_audio_device, AudioDeviceInfo,
};
pub use config::{ConfigError, ConfigManager, ConfigOption, ConfigSchema};
pub use settings::Settings;

mod audio;
mod config;
mod settings;
