//! Library record types.

use serde::{Deserialize, Serialize};

use crate::deck::format_clock;

/// Audio formats the library accepts on import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
    Wav,
    Aiff,
    Unknown,
}

impl AudioFormat {
    /// Determine format from file extension.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "mp3" => Self::Mp3,
            "wav" => Self::Wav,
            "aiff" | "aif" => Self::Aiff,
            _ => Self::Unknown,
        }
    }
}

/// One track in the library.
///
/// Serialised with exactly the keys `title`, `duration`, `artist`, `url` and
/// `bpm`, so library files stay interchangeable with older players.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    /// Display title (the file name on import).
    pub title: String,
    /// Duration in whole seconds.
    pub duration: i32,
    pub artist: String,
    /// Locator of the audio file.
    pub url: String,
    /// Estimated tempo, 0.0 when unknown.
    #[serde(default)]
    pub bpm: f64,
}

impl TrackRecord {
    /// Duration as `M:SS`.
    pub fn duration_display(&self) -> String {
        format_clock(self.duration.max(0) as f64)
    }

    /// Integer BPM, or `--` when unknown.
    pub fn bpm_display(&self) -> String {
        if self.bpm > 0.0 {
            format!("{}", self.bpm as i64)
        } else {
            "--".to_string()
        }
    }
}
