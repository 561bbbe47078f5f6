//! Twindeck DJ core
//!
//! Two-deck playback, mixing and offline analysis.
//!
//! # Features
//!
//! - Per-deck playback with gain, varispeed, seeking and looping
//! - Lock-free parameter and track handoff to the audio callback
//! - Unclamped mix bus feeding a cpal output stream
//! - BPM estimation by amplitude peak counting
//! - FFT spectrogram rendering with a five-colour palette
//! - JSON track library with tag import

pub mod analysis;
pub mod deck;
pub mod decoder;
pub mod engine;
pub mod error;
pub mod library;
pub mod signal;

// Re-export main types
pub use analysis::{
    estimate_bpm, estimate_bpm_for, try_estimate_bpm, SpectrogramBuilder, SpectrogramImage,
    SpectrogramLevel,
};
pub use deck::{DeckId, DeckStatus, TransportMode};
pub use decoder::{decode_all, Decoder, InMemoryDecoder, SampleReader, StreamInfo, SymphoniaDecoder};
pub use engine::{
    render_interleaved, AudioEngineConfig, BlockSource, DeckAudioEngine, DeckSource, InputId,
    MixBus, PlaybackEngine,
};
pub use error::DeckError;
pub use library::{Library, TrackRecord};
pub use signal::{AudioBlock, DecodedSignal};
