//! Failure taxonomy shared by the deck engine and the offline analyzers.

use thiserror::Error;

/// Errors reported by decks, decoders and analysis jobs.
///
/// None of these are fatal: a failed operation leaves the state it was
/// called on untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeckError {
    /// File missing, corrupt or in an unsupported format.
    #[error("cannot decode '{locator}': {reason}")]
    Undecodable { locator: String, reason: String },

    /// A setter was called with a value outside its domain.
    #[error("{parameter} {value} is outside {expected}")]
    InvalidParameter {
        parameter: &'static str,
        value: f64,
        expected: &'static str,
    },

    /// A duration based computation was attempted on an empty track.
    #[error("track has zero length")]
    ZeroLengthTrack,
}

impl DeckError {
    pub(crate) fn undecodable(locator: &str, reason: impl ToString) -> Self {
        Self::Undecodable {
            locator: locator.to_string(),
            reason: reason.to_string(),
        }
    }
}
