//! Sample containers: fully decoded tracks and real-time render blocks.

/// An immutable, fully decoded multi-channel track.
///
/// Samples are stored planar (one `Vec` per channel), all channels having the
/// same length.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSignal {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
    frames: usize,
}

impl DecodedSignal {
    /// Build a signal from planar channel data.
    ///
    /// Channels of unequal length are truncated to the shortest one.
    pub fn from_channels(mut channels: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
        for channel in &mut channels {
            if channel.len() != frames {
                log::warn!(
                    "Truncating channel of {} samples to {} frames",
                    channel.len(),
                    frames
                );
                channel.truncate(frames);
            }
        }

        Self {
            channels,
            sample_rate,
            frames,
        }
    }

    /// Build a single-channel signal.
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self::from_channels(vec![samples], sample_rate)
    }

    /// Build a signal from interleaved samples. A trailing partial frame is dropped.
    pub fn from_interleaved(samples: &[f32], channel_count: usize, sample_rate: u32) -> Self {
        if channel_count == 0 {
            return Self::from_channels(Vec::new(), sample_rate);
        }

        let frames = samples.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (ch, sample) in frame.iter().enumerate() {
                channels[ch].push(*sample);
            }
        }

        Self::from_channels(channels, sample_rate)
    }

    /// Number of channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Length in samples per channel.
    pub fn len(&self) -> usize {
        self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames == 0 || self.channels.is_empty()
    }

    /// Duration in seconds, 0.0 for an empty signal or a zero sample rate.
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames as f64 / self.sample_rate as f64
    }

    /// Samples of one channel.
    pub fn channel(&self, ch: usize) -> &[f32] {
        &self.channels[ch]
    }

    /// Downmix the whole signal to one channel by unweighted average.
    pub fn downmix(&self) -> Vec<f32> {
        let mut mono = vec![0.0f32; self.frames];
        self.downmix_into(0, &mut mono);
        mono
    }

    /// Downmix `out.len()` frames starting at `start` into `out`.
    ///
    /// Frames past the end of the signal are written as silence.
    pub fn downmix_into(&self, start: usize, out: &mut [f32]) {
        out.fill(0.0);
        if self.channels.is_empty() || start >= self.frames {
            return;
        }

        let end = (start + out.len()).min(self.frames);
        let scale = 1.0 / self.channels.len() as f32;
        for channel in &self.channels {
            for (o, s) in out.iter_mut().zip(&channel[start..end]) {
                *o += *s * scale;
            }
        }
    }
}

/// A preallocated planar block of samples handed between render stages.
///
/// The block owns storage for `capacity` frames per channel; `frames` is the
/// number currently in use. Resizing within capacity never allocates, so the
/// block can be reused on the audio thread.
#[derive(Debug, Clone)]
pub struct AudioBlock {
    data: Vec<f32>,
    channels: usize,
    capacity: usize,
    frames: usize,
}

impl AudioBlock {
    /// Allocate a silent block with `frames == capacity`.
    pub fn new(channels: usize, capacity: usize) -> Self {
        Self {
            data: vec![0.0; channels * capacity],
            channels,
            capacity,
            frames: capacity,
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Set the number of frames in use, clamped to the capacity.
    pub fn set_frames(&mut self, frames: usize) {
        self.frames = frames.min(self.capacity);
    }

    /// Zero every in-use frame.
    pub fn clear(&mut self) {
        for ch in 0..self.channels {
            self.channel_mut(ch).fill(0.0);
        }
    }

    pub fn channel(&self, ch: usize) -> &[f32] {
        let start = ch * self.capacity;
        &self.data[start..start + self.frames]
    }

    pub fn channel_mut(&mut self, ch: usize) -> &mut [f32] {
        let start = ch * self.capacity;
        &mut self.data[start..start + self.frames]
    }

    #[inline]
    pub fn sample(&self, ch: usize, frame: usize) -> f32 {
        self.data[ch * self.capacity + frame]
    }

    #[inline]
    pub fn set_sample(&mut self, ch: usize, frame: usize, value: f32) {
        self.data[ch * self.capacity + frame] = value;
    }

    /// Write the in-use frames into an interleaved buffer with `out_channels`
    /// channels. Extra output channels are zeroed; extra block channels are ignored.
    pub fn write_interleaved(&self, out: &mut [f32], out_channels: usize) {
        if out_channels == 0 {
            return;
        }
        for (i, frame) in out.chunks_mut(out_channels).take(self.frames).enumerate() {
            for (ch, slot) in frame.iter_mut().enumerate() {
                *slot = if ch < self.channels {
                    self.sample(ch, i)
                } else {
                    0.0
                };
            }
        }
    }
}
