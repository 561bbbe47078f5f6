use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::Settings;

/// Configuration manager for twindeck settings
/// Provides a layered configuration system that separates schema, available options, and persisted
/// values. Configuration is stored in config.json in the working directory by default
pub struct ConfigManager {
    config_path: PathBuf,
    settings: Settings,
}

/// Available configuration options with validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSchema {
    pub audio: AudioConfigSchema,
    pub library: LibraryConfigSchema,
    pub spectrogram: SpectrogramConfigSchema,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfigSchema {
    pub audio_device: ConfigOption<String>,
    pub audio_buffer_size: ConfigOption<u32>,
    pub audio_sample_rate: ConfigOption<u32>,
    pub output_channels: ConfigOption<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfigSchema {
    pub library_path: ConfigOption<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectrogramConfigSchema {
    pub spectrogram_width: ConfigOption<u32>,
    pub spectrogram_height: ConfigOption<u32>,
}

/// Configuration option with validation and available choices
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigOption<T> {
    pub default: T,
    pub valid_range: Option<(T, T)>,
    pub valid_choices: Option<Vec<T>>,
    pub description: String,
    pub requires_restart: bool,
}

/// Persisted configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    pub settings: Settings,
    pub created_at: String,
    pub modified_at: String,
}

impl ConfigManager {
    /// Create a new configuration manager
    /// If no path is provided, defaults to 'config.json' in the current working directory
    pub fn new(config_path: Option<PathBuf>) -> Self {
        let config_path = config_path.unwrap_or_else(|| PathBuf::from("config.json"));

        Self {
            config_path,
            settings: Settings::default(),
        }
    }

    /// Load settings from configuration file
    /// Writes and returns default settings if the file doesn't exist
    pub fn load(&mut self) -> Result<Settings, ConfigError> {
        if !self.config_path.exists() {
            self.save()?;
            return Ok(self.settings.clone());
        }

        let content = fs::read_to_string(&self.config_path)
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;

        let config_file: ConfigFile =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        if config_file.version != env!("CARGO_PKG_VERSION") {
            log::warn!(
                "Config file version {} doesn't match application version {}. Using defaults for new settings.",
                config_file.version,
                env!("CARGO_PKG_VERSION")
            );
        }

        Self::validate_settings(&config_file.settings).map_err(ConfigError::ValidationError)?;

        self.settings = config_file.settings;
        Ok(self.settings.clone())
    }

    /// Save current settings to configuration file
    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.config_path.parent() {
            if parent != Path::new("") && parent != Path::new(".") {
                fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError(e.to_string()))?;
            }
        }

        let now = chrono::Utc::now().to_rfc3339();
        let config_file = ConfigFile {
            version: env!("CARGO_PKG_VERSION").to_string(),
            settings: self.settings.clone(),
            created_at: now.clone(),
            modified_at: now,
        };

        let content = serde_json::to_string_pretty(&config_file)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        fs::write(&self.config_path, content)
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        log::debug!("Saved settings to {:?}", self.config_path);
        Ok(())
    }

    /// Validate, update and save settings
    pub fn update_settings(&mut self, settings: Settings) -> Result<(), ConfigError> {
        Self::validate_settings(&settings).map_err(ConfigError::ValidationError)?;
        self.settings = settings;
        self.save()
    }

    /// Get current settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get configuration file path
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Get configuration schema with available options
    pub fn schema() -> ConfigSchema {
        let defaults = Settings::default();
        ConfigSchema {
            audio: AudioConfigSchema {
                audio_device: ConfigOption {
                    default: defaults.audio_device,
                    valid_range: None,
                    valid_choices: None, // Populated from system enumeration
                    description: "Audio output device for playback".to_string(),
                    requires_restart: true,
                },
                audio_buffer_size: ConfigOption {
                    default: defaults.audio_buffer_size,
                    valid_range: None,
                    valid_choices: Some(vec![128, 256, 512, 1024, 2048]),
                    description: "Audio buffer size in samples".to_string(),
                    requires_restart: true,
                },
                audio_sample_rate: ConfigOption {
                    default: defaults.audio_sample_rate,
                    valid_range: None,
                    valid_choices: Some(vec![44100, 48000, 96000]),
                    description: "Audio sample rate in Hz".to_string(),
                    requires_restart: true,
                },
                output_channels: ConfigOption {
                    default: defaults.output_channels,
                    valid_range: Some((1, 8)),
                    valid_choices: None,
                    description: "Number of output channels the mix bus renders".to_string(),
                    requires_restart: true,
                },
            },
            library: LibraryConfigSchema {
                library_path: ConfigOption {
                    default: defaults.library_path,
                    valid_range: None,
                    valid_choices: None,
                    description: "JSON file holding the track library".to_string(),
                    requires_restart: false,
                },
            },
            spectrogram: SpectrogramConfigSchema {
                spectrogram_width: ConfigOption {
                    default: defaults.spectrogram_width,
                    valid_range: Some((16, 8192)),
                    valid_choices: None,
                    description: "Spectrogram image width in pixels".to_string(),
                    requires_restart: false,
                },
                spectrogram_height: ConfigOption {
                    default: defaults.spectrogram_height,
                    valid_range: Some((16, 4096)),
                    valid_choices: None,
                    description: "Spectrogram image height in pixels".to_string(),
                    requires_restart: false,
                },
            },
        }
    }

    /// Validate settings against schema
    pub fn validate_settings(settings: &Settings) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let schema = Self::schema();

        // Validate audio settings
        if let Some(choices) = &schema.audio.audio_buffer_size.valid_choices {
            if !choices.contains(&settings.audio_buffer_size) {
                errors.push(format!("audio_buffer_size must be one of: {:?}", choices));
            }
        }

        if let Some(choices) = &schema.audio.audio_sample_rate.valid_choices {
            if !choices.contains(&settings.audio_sample_rate) {
                errors.push(format!("audio_sample_rate must be one of: {:?}", choices));
            }
        }

        if let Some((min, max)) = schema.audio.output_channels.valid_range {
            if settings.output_channels < min || settings.output_channels > max {
                errors.push(format!("output_channels must be between {} and {}", min, max));
            }
        }

        // Validate library settings
        if settings.library_path.trim().is_empty() {
            errors.push("library_path must not be empty".to_string());
        }

        // Validate spectrogram settings
        if let Some((min, max)) = schema.spectrogram.spectrogram_width.valid_range {
            if settings.spectrogram_width < min || settings.spectrogram_width > max {
                errors.push(format!(
                    "spectrogram_width must be between {} and {}",
                    min, max
                ));
            }
        }

        if let Some((min, max)) = schema.spectrogram.spectrogram_height.valid_range {
            if settings.spectrogram_height < min || settings.spectrogram_height > max {
                errors.push(format!(
                    "spectrogram_height must be between {} and {}",
                    min, max
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Reset settings to defaults
    pub fn reset_to_defaults(&mut self) -> Result<(), ConfigError> {
        self.settings = Settings::default();
        self.save()
    }
}

/// Configuration error types
#[derive(Debug)]
pub enum ConfigError {
    ReadError(String),
    WriteError(String),
    ParseError(String),
    SerializeError(String),
    ValidationError(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(msg) => write!(f, "Failed to read config file: {}", msg),
            ConfigError::WriteError(msg) => write!(f, "Failed to write config file: {}", msg),
            ConfigError::ParseError(msg) => write!(f, "Failed to parse config file: {}", msg),
            ConfigError::SerializeError(msg) => write!(f, "Failed to serialize config: {}", msg),
            ConfigError::ValidationError(errors) => {
                write!(f, "Config validation errors: {}", errors.join(", "))
            }
        }
    }
}

impl std::error::Error for ConfigError {}
