//! Real-time playback: deck engines, the mix bus and the output stream.
//!
//! Control code owns a [`PlaybackEngine`] per deck and changes its parameters
//! from any thread. The audio callback owns a [`MixBus`] holding the decks'
//! [`DeckSource`]s and pulls blocks from it at the device cadence.

mod audio_engine;
mod deck_player;
mod mixer;

pub use audio_engine::{render_interleaved, AudioEngineConfig, DeckAudioEngine};
pub use deck_player::{DeckSource, PlaybackEngine, MAX_SPEED};
pub use mixer::{InputId, MixBus};

use crate::signal::AudioBlock;

/// A pull-based producer of audio blocks.
///
/// `produce_block` runs on the audio thread and must not block, allocate or
/// touch the filesystem.
pub trait BlockSource: Send {
    /// Called before the first block and whenever the stream format changes.
    fn prepare(&mut self, _sample_rate: u32, _max_block_size: usize) {}

    /// Overwrite `block.frames()` frames on every channel of `block`.
    fn produce_block(&mut self, block: &mut AudioBlock);

    /// Called when the source is detached from the stream.
    fn release(&mut self) {}
}
