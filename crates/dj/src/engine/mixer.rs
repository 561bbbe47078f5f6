//! Mix bus summing the decks into the output stream.

use super::BlockSource;
use crate::signal::AudioBlock;

/// Handle to an input registered on a [`MixBus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputId(u64);

/// Sums any number of [`BlockSource`]s sample by sample.
///
/// No gain staging or clipping is applied: two full-scale inputs produce a
/// peak of 2.0.
pub struct MixBus {
    inputs: Vec<(InputId, Box<dyn BlockSource>)>,
    scratch: AudioBlock,
    channels: usize,
    sample_rate: u32,
    max_block_size: usize,
    next_id: u64,
}

impl MixBus {
    /// Create an empty bus producing `channels` channels.
    pub fn new(channels: usize, sample_rate: u32, max_block_size: usize) -> Self {
        Self {
            inputs: Vec::new(),
            scratch: AudioBlock::new(channels, max_block_size),
            channels,
            sample_rate,
            max_block_size,
            next_id: 0,
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Register a source, preparing it for the bus format.
    pub fn add_input<S: BlockSource + 'static>(&mut self, source: S) -> InputId {
        self.add_boxed_input(Box::new(source))
    }

    pub fn add_boxed_input(&mut self, mut source: Box<dyn BlockSource>) -> InputId {
        source.prepare(self.sample_rate, self.max_block_size);

        let id = InputId(self.next_id);
        self.next_id += 1;
        self.inputs.push((id, source));
        log::debug!("Mix bus: added input {:?} ({} total)", id, self.inputs.len());
        id
    }

    /// Detach a source, returning it after release.
    pub fn remove_input(&mut self, id: InputId) -> Option<Box<dyn BlockSource>> {
        let index = self.inputs.iter().position(|(input, _)| *input == id)?;
        let (_, mut source) = self.inputs.remove(index);
        source.release();
        Some(source)
    }
}

impl BlockSource for MixBus {
    fn prepare(&mut self, sample_rate: u32, max_block_size: usize) {
        self.sample_rate = sample_rate;
        if max_block_size > self.max_block_size {
            self.scratch = AudioBlock::new(self.channels, max_block_size);
            self.max_block_size = max_block_size;
        }
        for (_, source) in &mut self.inputs {
            source.prepare(sample_rate, self.max_block_size);
        }
    }

    fn produce_block(&mut self, block: &mut AudioBlock) {
        block.clear();

        let total = block.frames();
        let channels = block.channels().min(self.channels);
        let chunk_capacity = self.scratch.capacity();
        if chunk_capacity == 0 {
            return;
        }

        // Requests larger than the scratch block are rendered in chunks
        let mut offset = 0;
        while offset < total {
            let frames = (total - offset).min(chunk_capacity);
            self.scratch.set_frames(frames);

            for (_, source) in &mut self.inputs {
                source.produce_block(&mut self.scratch);
                for ch in 0..channels {
                    let input = self.scratch.channel(ch);
                    let output = &mut block.channel_mut(ch)[offset..offset + frames];
                    for (o, s) in output.iter_mut().zip(input) {
                        *o += *s;
                    }
                }
            }

            offset += frames;
        }
    }

    fn release(&mut self) {
        for (_, source) in &mut self.inputs {
            source.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Emits a constant value on every channel.
    struct Constant(f32);

    impl BlockSource for Constant {
        fn prepare(&mut self, _sample_rate: u32, max_block_size: usize) {
            assert!(max_block_size > 0);
        }

        fn produce_block(&mut self, block: &mut AudioBlock) {
            for ch in 0..block.channels() {
                block.channel_mut(ch).fill(self.0);
            }
        }
    }

    /// Emits 0, 1, 2, ... across calls.
    struct Counter(f32);

    impl BlockSource for Counter {
        fn produce_block(&mut self, block: &mut AudioBlock) {
            for i in 0..block.frames() {
                for ch in 0..block.channels() {
                    block.set_sample(ch, i, self.0);
                }
                self.0 += 1.0;
            }
        }
    }

    #[test]
    fn test_empty_bus_is_silent() {
        let mut bus = MixBus::new(2, 44100, 64);
        let mut block = AudioBlock::new(2, 64);
        block.channel_mut(0).fill(3.0);
        bus.produce_block(&mut block);
        assert!(block.channel(0).iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_sum_is_unclamped() {
        let mut bus = MixBus::new(2, 44100, 64);
        bus.add_input(Constant(1.0));
        bus.add_input(Constant(1.0));

        let mut block = AudioBlock::new(2, 32);
        bus.produce_block(&mut block);
        assert!(block.channel(0).iter().all(|s| *s == 2.0));
        assert!(block.channel(1).iter().all(|s| *s == 2.0));
    }

    #[test]
    fn test_large_requests_are_chunked() {
        let mut bus = MixBus::new(1, 44100, 8);
        bus.add_input(Counter(0.0));

        let mut block = AudioBlock::new(1, 20);
        bus.produce_block(&mut block);
        let expected: Vec<f32> = (0..20).map(|i| i as f32).collect();
        assert_eq!(block.channel(0), expected.as_slice());
    }

    #[test]
    fn test_remove_input() {
        let mut bus = MixBus::new(1, 44100, 16);
        let keep = bus.add_input(Constant(0.25));
        let removed = bus.add_input(Constant(0.5));
        assert_ne!(keep, removed);

        assert!(bus.remove_input(removed).is_some());
        assert!(bus.remove_input(removed).is_none());
        assert_eq!(bus.input_count(), 1);

        let mut block = AudioBlock::new(1, 16);
        bus.produce_block(&mut block);
        assert!(block.channel(0).iter().all(|s| *s == 0.25));
    }

    #[test]
    fn test_prepare_grows_scratch() {
        let mut bus = MixBus::new(1, 44100, 4);
        bus.add_input(Counter(0.0));
        bus.prepare(48000, 32);
        assert_eq!(bus.sample_rate(), 48000);

        let mut block = AudioBlock::new(1, 32);
        bus.produce_block(&mut block);
        assert_eq!(block.channel(0)[31], 31.0);
    }
}
