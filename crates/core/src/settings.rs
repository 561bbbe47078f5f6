use serde::{Deserialize, Serialize};

/// Settings configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    // Audio settings
    pub audio_device: String,
    pub audio_buffer_size: u32,
    pub audio_sample_rate: u32,
    pub output_channels: u16,

    // Library settings
    pub library_path: String,

    // Spectrogram settings
    pub spectrogram_width: u32,
    pub spectrogram_height: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            // Audio defaults
            audio_device: "Default".to_string(),
            audio_buffer_size: 512,
            audio_sample_rate: 44100,
            output_channels: 2,

            // Library defaults
            library_path: "library.json".to_string(),

            // Spectrogram defaults
            spectrogram_width: 1000,
            spectrogram_height: 200,
        }
    }
}

impl Settings {
    /// Device name to search for, empty when the system default should be used.
    pub fn device_query(&self) -> &str {
        if self.audio_device.eq_ignore_ascii_case("default") {
            ""
        } else {
            &self.audio_device
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_device_query_is_empty() {
        let settings = Settings::default();
        assert_eq!(settings.device_query(), "");

        let settings = Settings {
            audio_device: "Motu M4".to_string(),
            ..Settings::default()
        };
        assert_eq!(settings.device_query(), "Motu M4");
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"audio_sample_rate": 48000}"#).unwrap();
        assert_eq!(settings.audio_sample_rate, 48000);
        assert_eq!(settings.audio_buffer_size, 512);
        assert_eq!(settings.library_path, "library.json");
    }
}
