//! Deck playback engine.
//!
//! A deck is split in two halves sharing one block of atomics:
//!
//! - [`PlaybackEngine`] is the control handle. It decodes tracks and validates
//!   and publishes parameter changes (gain, speed, seek, loop, transport).
//! - [`DeckSource`] is the render half registered on the [`MixBus`](super::MixBus).
//!   It observes the latest published values at the start of each block and
//!   resamples the loaded track at the current speed (varispeed, pitch follows
//!   tempo).
//!
//! The decoded track is swapped through an `ArcSwapOption`, so a block is
//! always rendered entirely from either the old or the new track. A replaced
//! track is kept alive by the control handle until the render side has left
//! the block that may still be reading it, so decoded buffers are only ever
//! freed on the control thread.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;

use super::BlockSource;
use crate::decoder::{decode_all, Decoder};
use crate::deck::{DeckId, DeckStatus, TransportMode};
use crate::error::DeckError;
use crate::signal::{AudioBlock, DecodedSignal};

/// Highest accepted speed ratio.
pub const MAX_SPEED: f64 = 100.0;

/// Output rate assumed until the source is prepared by a stream.
const DEFAULT_OUTPUT_RATE: u32 = 44100;

/// An `f64` stored as raw bits in an `AtomicU64`.
struct AtomicF64(AtomicU64);

impl AtomicF64 {
    fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Release);
    }
}

/// A decoded track installed on a deck.
struct LoadedTrack {
    locator: String,
    signal: Arc<DecodedSignal>,
    /// Increments on every load so the render side can detect swaps.
    generation: u64,
}

/// State published by the control handle and read by the render side.
struct DeckShared {
    track: ArcSwapOption<LoadedTrack>,
    mode: AtomicU8,
    gain: AtomicF64,
    speed: AtomicF64,
    looping: AtomicBool,
    /// Last known position in seconds.
    position: AtomicF64,
    /// Pending seek target in seconds.
    seek_target: AtomicF64,
    /// Generation of the track the pending seek applies to (0 = no seek).
    seek_generation: AtomicU64,
    /// Incremented on entry to and exit from every rendered block; odd while
    /// the render side may hold a track.
    render_passes: AtomicU64,
}

impl DeckShared {
    fn new() -> Self {
        Self {
            track: ArcSwapOption::empty(),
            mode: AtomicU8::new(TransportMode::Stopped.as_u8()),
            gain: AtomicF64::new(1.0),
            speed: AtomicF64::new(1.0),
            looping: AtomicBool::new(false),
            position: AtomicF64::new(0.0),
            seek_target: AtomicF64::new(0.0),
            seek_generation: AtomicU64::new(0),
            render_passes: AtomicU64::new(0),
        }
    }

    fn mode(&self) -> TransportMode {
        TransportMode::from_u8(self.mode.load(Ordering::Acquire))
    }

    fn set_mode(&self, mode: TransportMode) {
        self.mode.store(mode.as_u8(), Ordering::Release);
    }
}

/// Control handle for one deck.
pub struct PlaybackEngine {
    deck_id: DeckId,
    decoder: Arc<dyn Decoder>,
    shared: Arc<DeckShared>,
    generation: u64,
    /// Replaced tracks with the render pass count seen when they were swapped out.
    retired: Vec<(u64, Arc<LoadedTrack>)>,
}

impl PlaybackEngine {
    /// Create an empty, stopped deck that decodes through `decoder`.
    pub fn new(deck_id: DeckId, decoder: Arc<dyn Decoder>) -> Self {
        Self {
            deck_id,
            decoder,
            shared: Arc::new(DeckShared::new()),
            generation: 0,
            retired: Vec::new(),
        }
    }

    pub fn deck_id(&self) -> DeckId {
        self.deck_id
    }

    /// Create the render half of this deck, to be added to a mix bus.
    ///
    /// At most one render half may be producing blocks at a time.
    pub fn source(&self) -> DeckSource {
        DeckSource {
            shared: Arc::clone(&self.shared),
            output_rate: DEFAULT_OUTPUT_RATE,
            cursor: 0.0,
            generation: 0,
        }
    }

    /// Decode and install a track, rewinding to the start.
    ///
    /// The transport mode is left as it was. On failure the previously loaded
    /// track and all parameters are kept.
    pub fn load_track(&mut self, locator: &str) -> Result<(), DeckError> {
        log::info!("Deck {}: Loading {}", self.deck_id, locator);

        let signal = decode_all(self.decoder.as_ref(), locator).map_err(|e| {
            log::warn!("Deck {}: Load failed: {}", self.deck_id, e);
            e
        })?;

        self.load_decoded(locator, signal);
        Ok(())
    }

    /// Install an already decoded track, rewinding to the start.
    pub fn load_decoded(&mut self, locator: &str, signal: Arc<DecodedSignal>) {
        self.generation += 1;

        log::info!(
            "Deck {}: Loaded {} Hz, {} channels, {} samples ({:.2}s)",
            self.deck_id,
            signal.sample_rate(),
            signal.channel_count(),
            signal.len(),
            signal.duration_seconds()
        );

        self.shared.seek_generation.store(0, Ordering::Release);
        self.shared.position.store(0.0);
        self.install(Some(Arc::new(LoadedTrack {
            locator: locator.to_string(),
            signal,
            generation: self.generation,
        })));
    }

    /// Unload the current track. The deck renders silence afterwards.
    pub fn eject(&mut self) {
        self.install(None);
        self.shared.seek_generation.store(0, Ordering::Release);
        self.shared.position.store(0.0);
        log::debug!("Deck {}: Ejected", self.deck_id);
    }

    /// Publish `track` and retire the one it replaces.
    fn install(&mut self, track: Option<Arc<LoadedTrack>>) {
        let previous = self.shared.track.swap(track);
        if let Some(previous) = previous {
            let passes = self.shared.render_passes.load(Ordering::SeqCst);
            self.retired.push((passes, previous));
        }
        self.collect_retired();
    }

    /// Drop retired tracks the render side can no longer be reading.
    ///
    /// A track swapped out while no block was in progress (even count) is
    /// unreachable at once; otherwise it is held until that block finishes.
    fn collect_retired(&mut self) {
        let passes = self.shared.render_passes.load(Ordering::SeqCst);
        self.retired.retain(|(mark, _)| mark % 2 == 1 && passes == *mark);
    }

    /// Start playback.
    pub fn start(&self) {
        if self.shared.mode() != TransportMode::Playing {
            self.shared.set_mode(TransportMode::Playing);
            log::debug!("Deck {}: Playing", self.deck_id);
        }
    }

    /// Stop playback, keeping the current position.
    pub fn stop(&self) {
        if self.shared.mode() != TransportMode::Stopped {
            self.shared.set_mode(TransportMode::Stopped);
            log::debug!("Deck {}: Stopped", self.deck_id);
        }
    }

    pub fn transport_mode(&self) -> TransportMode {
        self.shared.mode()
    }

    pub fn is_playing(&self) -> bool {
        self.transport_mode() == TransportMode::Playing
    }

    /// Set the output gain, accepted within `[0, 1]`.
    pub fn set_gain(&self, gain: f64) -> Result<(), DeckError> {
        if !(0.0..=1.0).contains(&gain) {
            return Err(self.reject("gain", gain, "[0, 1]"));
        }
        self.shared.gain.store(gain);
        Ok(())
    }

    pub fn gain(&self) -> f64 {
        self.shared.gain.load()
    }

    /// Set the resampling ratio, accepted within `(0, 100]`.
    pub fn set_speed(&self, ratio: f64) -> Result<(), DeckError> {
        if !(ratio > 0.0 && ratio <= MAX_SPEED) {
            return Err(self.reject("speed", ratio, "(0, 100]"));
        }
        self.shared.speed.store(ratio);
        Ok(())
    }

    pub fn speed(&self) -> f64 {
        self.shared.speed.load()
    }

    /// Seek to an absolute position in seconds.
    ///
    /// Positions past the end of the track are clamped to its duration;
    /// negative or non-finite positions are rejected.
    pub fn set_position(&self, seconds: f64) -> Result<(), DeckError> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(self.reject("position", seconds, "[0, duration]"));
        }

        let track = self.shared.track.load();
        let Some(track) = track.as_ref() else {
            // Nothing to seek in, the transport stays at zero
            self.shared.position.store(0.0);
            return Ok(());
        };

        let position = seconds.min(track.signal.duration_seconds());
        self.shared.seek_target.store(position);
        self.shared
            .seek_generation
            .store(track.generation, Ordering::Release);
        self.shared.position.store(position);
        log::debug!("Deck {}: Seek requested to {:.2}s", self.deck_id, position);
        Ok(())
    }

    /// Current position in seconds.
    pub fn position_seconds(&self) -> f64 {
        self.shared
            .position
            .load()
            .clamp(0.0, self.duration_seconds())
    }

    /// Duration of the loaded track in seconds (0.0 when empty).
    pub fn duration_seconds(&self) -> f64 {
        self.shared
            .track
            .load()
            .as_ref()
            .map(|t| t.signal.duration_seconds())
            .unwrap_or(0.0)
    }

    /// Seek to a fraction `[0, 1]` of the track duration.
    pub fn set_position_relative(&self, fraction: f64) -> Result<(), DeckError> {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(self.reject("relative position", fraction, "[0, 1]"));
        }
        self.set_position(fraction * self.duration_seconds())
    }

    /// Position as a fraction of the duration, 0.0 when nothing (or an empty
    /// track) is loaded.
    pub fn position_relative(&self) -> f64 {
        let duration = self.duration_seconds();
        if duration > 0.0 {
            self.position_seconds() / duration
        } else {
            0.0
        }
    }

    pub fn set_looping(&self, looping: bool) {
        self.shared.looping.store(looping, Ordering::Release);
        log::debug!("Deck {}: Looping = {}", self.deck_id, looping);
    }

    pub fn is_looping(&self) -> bool {
        self.shared.looping.load(Ordering::Acquire)
    }

    /// Locator of the loaded track.
    pub fn locator(&self) -> Option<String> {
        self.shared.track.load().as_ref().map(|t| t.locator.clone())
    }

    /// Shared handle to the loaded decoded signal.
    pub fn signal(&self) -> Option<Arc<DecodedSignal>> {
        self.shared
            .track
            .load()
            .as_ref()
            .map(|t| Arc::clone(&t.signal))
    }

    /// Snapshot of the deck state.
    pub fn status(&self) -> DeckStatus {
        DeckStatus {
            id: self.deck_id,
            mode: self.transport_mode(),
            locator: self.locator(),
            position_seconds: self.position_seconds(),
            duration_seconds: self.duration_seconds(),
            position_relative: self.position_relative(),
            gain: self.gain(),
            speed: self.speed(),
            looping: self.is_looping(),
        }
    }

    fn reject(&self, parameter: &'static str, value: f64, expected: &'static str) -> DeckError {
        log::warn!(
            "Deck {}: {} should be within {}, ignoring {}",
            self.deck_id,
            parameter,
            expected,
            value
        );
        DeckError::InvalidParameter {
            parameter,
            value,
            expected,
        }
    }
}

/// Render half of a deck.
pub struct DeckSource {
    shared: Arc<DeckShared>,
    output_rate: u32,
    /// Read position in source frames, fractional between frames.
    cursor: f64,
    /// Generation of the track the cursor belongs to.
    generation: u64,
}

impl DeckSource {
    /// Apply a pending seek if it targets the track being rendered.
    fn take_seek(&mut self, track: &LoadedTrack) {
        let pending = self.shared.seek_generation.load(Ordering::Acquire);
        if pending == 0 || pending != track.generation {
            return;
        }
        if self
            .shared
            .seek_generation
            .compare_exchange(pending, 0, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let target = self.shared.seek_target.load();
            self.cursor =
                (target * track.signal.sample_rate() as f64).clamp(0.0, track.signal.len() as f64);
        }
    }
}

impl BlockSource for DeckSource {
    fn prepare(&mut self, sample_rate: u32, _max_block_size: usize) {
        if sample_rate > 0 {
            self.output_rate = sample_rate;
        }
    }

    fn produce_block(&mut self, block: &mut AudioBlock) {
        self.shared.render_passes.fetch_add(1, Ordering::SeqCst);
        self.render(block);
        self.shared.render_passes.fetch_add(1, Ordering::SeqCst);
    }

    fn release(&mut self) {
        self.cursor = 0.0;
        self.generation = 0;
    }
}

impl DeckSource {
    /// Render one block. The track guard never outlives this call.
    fn render(&mut self, block: &mut AudioBlock) {
        block.clear();

        let guard = self.shared.track.load();
        let Some(track) = guard.as_ref() else {
            return;
        };

        if track.generation != self.generation {
            self.generation = track.generation;
            self.cursor = 0.0;
        }
        self.take_seek(track);

        if self.shared.mode() != TransportMode::Playing {
            return;
        }

        let signal = &track.signal;
        let looping = self.shared.looping.load(Ordering::Acquire);
        if signal.is_empty() || signal.sample_rate() == 0 {
            if !looping {
                self.shared.set_mode(TransportMode::Stopped);
            }
            return;
        }

        let len = signal.len();
        let len_f = len as f64;
        let gain = self.shared.gain.load() as f32;
        let step = self.shared.speed.load() * signal.sample_rate() as f64 / self.output_rate as f64;
        let last_source_channel = signal.channel_count() - 1;

        for i in 0..block.frames() {
            if self.cursor >= len_f {
                if looping {
                    self.cursor = self.cursor.rem_euclid(len_f);
                } else {
                    self.cursor = len_f;
                    self.shared.set_mode(TransportMode::Stopped);
                    break;
                }
            }

            let index = self.cursor as usize;
            let frac = (self.cursor - index as f64) as f32;
            let next = if index + 1 < len {
                Some(index + 1)
            } else if looping {
                Some(0)
            } else {
                None
            };

            for ch in 0..block.channels() {
                let source = signal.channel(ch.min(last_source_channel));
                let a = source[index];
                let b = next.map(|n| source[n]).unwrap_or(0.0);
                block.set_sample(ch, i, (a + (b - a) * frac) * gain);
            }

            self.cursor += step;
        }

        self.shared
            .position
            .store(self.cursor.min(len_f) / signal.sample_rate() as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::InMemoryDecoder;

    const RATE: u32 = 1000;

    fn engine_with(locator: &str, signal: DecodedSignal) -> PlaybackEngine {
        let decoder = InMemoryDecoder::new().with(locator, signal);
        let mut engine = PlaybackEngine::new(DeckId::A, Arc::new(decoder));
        engine.load_track(locator).unwrap();
        engine
    }

    /// Engine holding the only reference to its track.
    fn decoded_engine(signal: DecodedSignal) -> PlaybackEngine {
        let mut engine = PlaybackEngine::new(DeckId::A, Arc::new(InMemoryDecoder::new()));
        engine.load_decoded("decoded", Arc::new(signal));
        engine
    }

    fn ramp(frames: usize) -> DecodedSignal {
        DecodedSignal::mono((0..frames).map(|i| i as f32).collect(), RATE)
    }

    fn render(source: &mut DeckSource, channels: usize, frames: usize) -> AudioBlock {
        let mut block = AudioBlock::new(channels, frames);
        source.produce_block(&mut block);
        block
    }

    #[test]
    fn test_new_engine_defaults() {
        let engine = PlaybackEngine::new(DeckId::A, Arc::new(InMemoryDecoder::new()));
        assert_eq!(engine.transport_mode(), TransportMode::Stopped);
        assert_eq!(engine.gain(), 1.0);
        assert_eq!(engine.speed(), 1.0);
        assert!(!engine.is_looping());
        assert_eq!(engine.position_relative(), 0.0);
        assert!(engine.locator().is_none());
    }

    #[test]
    fn test_gain_validation() {
        let engine = PlaybackEngine::new(DeckId::A, Arc::new(InMemoryDecoder::new()));
        for g in [0.0, 0.25, 1.0] {
            engine.set_gain(g).unwrap();
            assert_eq!(engine.gain(), g);
        }
        for g in [-0.01, 1.01, f64::NAN] {
            assert!(matches!(
                engine.set_gain(g),
                Err(DeckError::InvalidParameter { parameter: "gain", .. })
            ));
            assert_eq!(engine.gain(), 1.0);
        }
    }

    #[test]
    fn test_speed_validation() {
        let engine = PlaybackEngine::new(DeckId::B, Arc::new(InMemoryDecoder::new()));
        engine.set_speed(2.5).unwrap();
        assert_eq!(engine.speed(), 2.5);
        engine.set_speed(100.0).unwrap();
        assert_eq!(engine.speed(), 100.0);

        for r in [0.0, -1.0, 100.5, f64::INFINITY] {
            assert!(engine.set_speed(r).is_err());
            assert_eq!(engine.speed(), 100.0);
        }
    }

    #[test]
    fn test_relative_position() {
        let engine = engine_with("ten", ramp(10 * RATE as usize));
        assert!((engine.duration_seconds() - 10.0).abs() < 1e-9);

        engine.set_position_relative(0.25).unwrap();
        assert!((engine.position_seconds() - 2.5).abs() < 1e-9);
        assert!((engine.position_relative() - 0.25).abs() < 1e-9);

        assert!(engine.set_position_relative(1.5).is_err());
        assert!((engine.position_seconds() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_absolute_position_clamps_to_duration() {
        let engine = engine_with("one", ramp(RATE as usize));
        engine.set_position(30.0).unwrap();
        assert!((engine.position_seconds() - 1.0).abs() < 1e-9);
        assert!(engine.set_position(-1.0).is_err());
    }

    #[test]
    fn test_relative_position_guards_empty_deck() {
        let engine = PlaybackEngine::new(DeckId::A, Arc::new(InMemoryDecoder::new()));
        engine.set_position(5.0).unwrap();
        assert_eq!(engine.position_relative(), 0.0);

        let engine = engine_with("empty", DecodedSignal::mono(Vec::new(), RATE));
        assert_eq!(engine.duration_seconds(), 0.0);
        assert_eq!(engine.position_relative(), 0.0);
    }

    #[test]
    fn test_failed_load_keeps_previous_track() {
        let mut engine = engine_with("first", ramp(100));
        engine.set_position(0.05).unwrap();

        let err = engine.load_track("missing").unwrap_err();
        assert!(matches!(err, DeckError::Undecodable { .. }));
        assert_eq!(engine.locator().as_deref(), Some("first"));
        assert!((engine.position_seconds() - 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_load_keeps_transport_mode() {
        let decoder = InMemoryDecoder::new()
            .with("a", ramp(100))
            .with("b", ramp(200));
        let mut engine = PlaybackEngine::new(DeckId::A, Arc::new(decoder));
        engine.load_track("a").unwrap();
        assert!(!engine.is_playing());

        engine.start();
        engine.set_position(0.05).unwrap();
        engine.load_track("b").unwrap();
        assert!(engine.is_playing());
        assert_eq!(engine.position_seconds(), 0.0);
    }

    #[test]
    fn test_stopped_or_empty_deck_is_silent() {
        let engine = PlaybackEngine::new(DeckId::A, Arc::new(InMemoryDecoder::new()));
        engine.start();
        let block = render(&mut engine.source(), 2, 16);
        assert!(block.channel(0).iter().all(|s| *s == 0.0));

        let engine = engine_with("ramp", ramp(100));
        let block = render(&mut engine.source(), 2, 16);
        assert!(block.channel(1).iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_unity_speed_copies_source() {
        let engine = engine_with("ramp", ramp(100));
        engine.set_gain(0.5).unwrap();
        engine.start();

        let mut source = engine.source();
        source.prepare(RATE, 8);
        let block = render(&mut source, 2, 4);
        assert_eq!(block.channel(0), &[0.0, 0.5, 1.0, 1.5]);
        // Mono source is copied to the second output channel
        assert_eq!(block.channel(1), &[0.0, 0.5, 1.0, 1.5]);
        assert!((engine.position_seconds() - 0.004).abs() < 1e-9);
    }

    #[test]
    fn test_speed_scales_source_step() {
        let engine = engine_with("ramp", ramp(100));
        engine.set_speed(2.5).unwrap();
        engine.start();

        let mut source = engine.source();
        source.prepare(RATE, 8);
        let block = render(&mut source, 1, 4);
        assert_eq!(block.channel(0), &[0.0, 2.5, 5.0, 7.5]);
    }

    #[test]
    fn test_output_rate_conversion() {
        // 1000 Hz source rendered at 2000 Hz advances half a frame per sample
        let engine = engine_with("ramp", ramp(100));
        engine.start();

        let mut source = engine.source();
        source.prepare(2 * RATE, 8);
        let block = render(&mut source, 1, 4);
        assert_eq!(block.channel(0), &[0.0, 0.5, 1.0, 1.5]);
    }

    #[test]
    fn test_block_size_does_not_change_output() {
        let engine_a = engine_with("ramp", ramp(500));
        let engine_b = engine_with("ramp", ramp(500));
        for engine in [&engine_a, &engine_b] {
            engine.set_speed(1.37).unwrap();
            engine.start();
        }

        let mut source_a = engine_a.source();
        let mut one_shot = render(&mut source_a, 1, 240);

        let mut source_b = engine_b.source();
        let mut pieces = Vec::new();
        for size in [7, 64, 1, 100, 68] {
            pieces.extend_from_slice(render(&mut source_b, 1, size).channel(0));
        }

        one_shot.set_frames(240);
        assert_eq!(one_shot.channel(0), pieces.as_slice());
    }

    #[test]
    fn test_looping_block_size_does_not_change_output() {
        let engine_a = engine_with("ramp", ramp(37));
        let engine_b = engine_with("ramp", ramp(37));
        for engine in [&engine_a, &engine_b] {
            engine.set_speed(3.7).unwrap();
            engine.set_looping(true);
            engine.start();
        }

        let mut source_a = engine_a.source();
        source_a.prepare(RATE, 300);
        let one_shot = render(&mut source_a, 1, 300);

        let mut source_b = engine_b.source();
        source_b.prepare(RATE, 300);
        let mut pieces = Vec::new();
        for size in [1, 13, 77, 9, 200] {
            pieces.extend_from_slice(render(&mut source_b, 1, size).channel(0));
        }

        assert_eq!(one_shot.channel(0), pieces.as_slice());
        assert!(engine_b.is_playing());
        assert_eq!(engine_a.position_seconds(), engine_b.position_seconds());
    }

    #[test]
    fn test_end_of_track_stops_and_pads_silence() {
        let engine = engine_with("short", DecodedSignal::mono(vec![1.0; 10], RATE));
        engine.start();

        let mut source = engine.source();
        source.prepare(RATE, 16);
        let block = render(&mut source, 1, 16);

        assert!(block.channel(0)[..9].iter().all(|s| *s == 1.0));
        assert!(block.channel(0)[10..].iter().all(|s| *s == 0.0));
        assert_eq!(engine.transport_mode(), TransportMode::Stopped);
        assert!((engine.position_seconds() - engine.duration_seconds()).abs() < 1e-9);

        let block = render(&mut source, 1, 16);
        assert!(block.channel(0).iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_looping_wraps_within_block() {
        let engine = engine_with("ramp", ramp(10));
        engine.set_looping(true);
        engine.start();

        let mut source = engine.source();
        source.prepare(RATE, 16);
        let block = render(&mut source, 1, 16);

        let expected: Vec<f32> = (0..16).map(|i| (i % 10) as f32).collect();
        assert_eq!(block.channel(0), expected.as_slice());
        assert_eq!(engine.transport_mode(), TransportMode::Playing);
        assert!((engine.position_seconds() - 0.006).abs() < 1e-9);
    }

    #[test]
    fn test_seek_applies_on_next_block() {
        let engine = engine_with("ramp", ramp(100));
        engine.start();

        let mut source = engine.source();
        source.prepare(RATE, 4);
        render(&mut source, 1, 4);

        engine.set_position(0.05).unwrap();
        let block = render(&mut source, 1, 2);
        assert_eq!(block.channel(0), &[50.0, 51.0]);
    }

    #[test]
    fn test_track_swap_restarts_render_cursor() {
        let decoder = InMemoryDecoder::new()
            .with("up", ramp(100))
            .with("flat", DecodedSignal::mono(vec![0.5; 100], RATE));
        let mut engine = PlaybackEngine::new(DeckId::A, Arc::new(decoder));
        engine.load_track("up").unwrap();
        engine.start();

        let mut source = engine.source();
        source.prepare(RATE, 8);
        render(&mut source, 1, 8);

        engine.load_track("flat").unwrap();
        let block = render(&mut source, 1, 3);
        assert_eq!(block.channel(0), &[0.5, 0.5, 0.5]);
        assert!((engine.position_seconds() - 0.003).abs() < 1e-9);
    }

    #[test]
    fn test_replaced_track_outlives_block_in_progress() {
        let mut engine = decoded_engine(ramp(100));
        let old = engine.signal().unwrap();

        // Render side has entered a block and may hold the old track
        engine.shared.render_passes.fetch_add(1, Ordering::SeqCst);
        engine.load_decoded("flat", Arc::new(DecodedSignal::mono(vec![0.5; 10], RATE)));
        assert_eq!(engine.retired.len(), 1);
        assert_eq!(Arc::strong_count(&old), 2);

        engine.shared.render_passes.fetch_add(1, Ordering::SeqCst);
        engine.eject();
        assert!(engine.retired.is_empty());
        assert_eq!(Arc::strong_count(&old), 1);
    }

    #[test]
    fn test_idle_deck_frees_replaced_track() {
        let mut engine = decoded_engine(ramp(100));
        let mut source = engine.source();
        render(&mut source, 1, 8);

        let old = engine.signal().unwrap();
        engine.load_decoded("flat", Arc::new(DecodedSignal::mono(vec![0.5; 10], RATE)));
        assert!(engine.retired.is_empty());
        assert_eq!(Arc::strong_count(&old), 1);
    }

    #[test]
    fn test_eject_silences_deck() {
        let mut engine = engine_with("ramp", ramp(100));
        engine.start();
        engine.eject();

        let block = render(&mut engine.source(), 1, 8);
        assert!(block.channel(0).iter().all(|s| *s == 0.0));
        assert_eq!(engine.duration_seconds(), 0.0);
        assert!(engine.signal().is_none());
    }

    #[test]
    fn test_status_snapshot() {
        let engine = engine_with("ramp", ramp(2000));
        engine.set_looping(true);
        engine.set_position_relative(0.5).unwrap();

        let status = engine.status();
        assert_eq!(status.id, DeckId::A);
        assert_eq!(status.locator.as_deref(), Some("ramp"));
        assert!(status.looping);
        assert!((status.position_relative - 0.5).abs() < 1e-9);
        assert_eq!(status.time_display(), "0:01 / 0:02");
    }
}
