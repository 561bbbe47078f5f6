//! Deck identifiers, transport modes and status snapshots.

use serde::{Deserialize, Serialize};

/// Deck identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeckId {
    A,
    B,
}

impl std::fmt::Display for DeckId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
        }
    }
}

/// Transport mode of a deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransportMode {
    #[default]
    Stopped,
    Playing,
}

impl TransportMode {
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            Self::Stopped => 0,
            Self::Playing => 1,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Playing,
            _ => Self::Stopped,
        }
    }
}

/// Point-in-time view of a deck, for displays and logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckStatus {
    pub id: DeckId,
    pub mode: TransportMode,
    /// Locator of the loaded track.
    pub locator: Option<String>,
    pub position_seconds: f64,
    pub duration_seconds: f64,
    /// Position as a fraction of the duration (0.0 when nothing is loaded).
    pub position_relative: f64,
    pub gain: f64,
    pub speed: f64,
    pub looping: bool,
}

impl DeckStatus {
    /// Format the position as `M:SS / M:SS`.
    pub fn time_display(&self) -> String {
        format!(
            "{} / {}",
            format_clock(self.position_seconds),
            format_clock(self.duration_seconds)
        )
    }
}

/// Format whole seconds as `M:SS`.
pub fn format_clock(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deck_id() {
        assert_eq!(DeckId::A.to_string(), "A");
        assert_eq!(DeckId::B.to_string(), "B");
    }

    #[test]
    fn test_transport_mode_round_trip() {
        for mode in [TransportMode::Stopped, TransportMode::Playing] {
            assert_eq!(TransportMode::from_u8(mode.as_u8()), mode);
        }
        assert_eq!(TransportMode::from_u8(42), TransportMode::Stopped);
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0.0), "0:00");
        assert_eq!(format_clock(65.9), "1:05");
        assert_eq!(format_clock(-3.0), "0:00");
    }
}
