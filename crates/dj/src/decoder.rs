//! Decoding of track locators into sample data.
//!
//! The [`Decoder`] is the format registry: it is built once and shared by
//! reference with every component that needs to read audio. Opening a
//! locator yields a [`SampleReader`] giving random access to the stream.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::DeckError;
use crate::signal::{AudioBlock, DecodedSignal};

/// Frames pulled per `read` call by [`decode_all`].
const DECODE_CHUNK_FRAMES: usize = 65536;

/// Shape of an opened stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamInfo {
    pub channels: usize,
    pub sample_rate: u32,
    pub length_in_samples: u64,
}

impl StreamInfo {
    /// Duration in seconds, 0.0 when the sample rate is unknown.
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.length_in_samples as f64 / self.sample_rate as f64
    }
}

/// Random access to the samples of one opened stream.
pub trait SampleReader: Send {
    fn info(&self) -> StreamInfo;

    /// Read up to `count` frames starting at `start`.
    ///
    /// The returned block is shorter than `count` when the read runs past the
    /// end of the stream, and empty when `start` is already past it.
    fn read(&mut self, start: u64, count: usize) -> Result<AudioBlock, DeckError>;

    /// The whole stream, when it is already decoded in memory.
    fn shared_signal(&self) -> Option<Arc<DecodedSignal>> {
        None
    }
}

/// Turns a locator (path or `file://` URL) into a [`SampleReader`].
pub trait Decoder: Send + Sync {
    fn open(&self, locator: &str) -> Result<Box<dyn SampleReader>, DeckError>;
}

/// Decode a whole stream into memory.
///
/// Readers that already hold the decoded signal return it without a copy.
pub fn decode_all(decoder: &dyn Decoder, locator: &str) -> Result<Arc<DecodedSignal>, DeckError> {
    let mut reader = decoder.open(locator)?;
    if let Some(signal) = reader.shared_signal() {
        return Ok(signal);
    }
    let info = reader.info();

    let mut channels: Vec<Vec<f32>> = (0..info.channels)
        .map(|_| Vec::with_capacity(info.length_in_samples as usize))
        .collect();

    let mut position = 0u64;
    while position < info.length_in_samples {
        let block = reader.read(position, DECODE_CHUNK_FRAMES)?;
        if block.frames() == 0 {
            break;
        }
        for (ch, samples) in channels.iter_mut().enumerate() {
            samples.extend_from_slice(block.channel(ch));
        }
        position += block.frames() as u64;
    }

    Ok(Arc::new(DecodedSignal::from_channels(
        channels,
        info.sample_rate,
    )))
}

/// Resolve a locator to a filesystem path.
///
/// Accepts bare paths and `file://` URLs; any other scheme is undecodable.
pub fn resolve_locator(locator: &str) -> Result<PathBuf, DeckError> {
    if let Some(path) = locator.strip_prefix("file://") {
        return Ok(PathBuf::from(path));
    }
    if let Some((scheme, _)) = locator.split_once("://") {
        return Err(DeckError::undecodable(
            locator,
            format!("unsupported scheme '{}'", scheme),
        ));
    }
    Ok(PathBuf::from(locator))
}

/// Reader over a signal that is already in memory.
pub struct MemoryReader {
    signal: Arc<DecodedSignal>,
}

impl MemoryReader {
    pub fn new(signal: Arc<DecodedSignal>) -> Self {
        Self { signal }
    }
}

impl SampleReader for MemoryReader {
    fn info(&self) -> StreamInfo {
        StreamInfo {
            channels: self.signal.channel_count(),
            sample_rate: self.signal.sample_rate(),
            length_in_samples: self.signal.len() as u64,
        }
    }

    fn shared_signal(&self) -> Option<Arc<DecodedSignal>> {
        Some(Arc::clone(&self.signal))
    }

    fn read(&mut self, start: u64, count: usize) -> Result<AudioBlock, DeckError> {
        let len = self.signal.len();
        let start = (start.min(len as u64)) as usize;
        let frames = count.min(len - start);

        let mut block = AudioBlock::new(self.signal.channel_count(), frames);
        for ch in 0..self.signal.channel_count() {
            block
                .channel_mut(ch)
                .copy_from_slice(&self.signal.channel(ch)[start..start + frames]);
        }
        Ok(block)
    }
}

/// Decoder backed by symphonia (wav, mp3, aiff).
///
/// Files are decoded completely on open; the returned reader serves reads
/// from memory.
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaDecoder;

impl SymphoniaDecoder {
    pub fn new() -> Self {
        Self
    }

    fn decode_file(&self, path: &Path) -> Result<DecodedSignal, anyhow::Error> {
        let file = File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe().format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )?;

        let mut format = probed.format;

        // Find the first audio track
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| anyhow::anyhow!("No audio track found"))?;

        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| anyhow::anyhow!("Unknown sample rate"))?;
        let mut channel_count = track.codec_params.channels.map(|c| c.count()).unwrap_or(0);
        let expected_frames = track.codec_params.n_frames.unwrap_or(0) as usize;

        let mut decoder =
            symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

        let mut channels: Vec<Vec<f32>> = (0..channel_count)
            .map(|_| Vec::with_capacity(expected_frames))
            .collect();
        let mut sample_buf: Option<SampleBuffer<f32>> = None;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(e) => {
                    log::warn!("Error reading packet from {:?}: {}", path, e);
                    break;
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    log::warn!("Skipping undecodable packet in {:?}: {}", path, e);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let spec = *decoded.spec();
            if channel_count == 0 {
                channel_count = spec.channels.count();
                channels = (0..channel_count).map(|_| Vec::new()).collect();
            }
            if spec.channels.count() != channel_count {
                log::warn!(
                    "Skipping packet with {} channels in {:?} (expected {})",
                    spec.channels.count(),
                    path,
                    channel_count
                );
                continue;
            }

            let needs_buffer = sample_buf
                .as_ref()
                .map_or(true, |buf| buf.capacity() < decoded.capacity() * channel_count);
            if needs_buffer {
                sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
            }
            let Some(buf) = sample_buf.as_mut() else {
                continue;
            };
            buf.copy_interleaved_ref(decoded);

            for frame in buf.samples().chunks_exact(channel_count) {
                for (ch, sample) in frame.iter().enumerate() {
                    channels[ch].push(*sample);
                }
            }
        }

        if channel_count == 0 {
            anyhow::bail!("Stream has no channels");
        }

        Ok(DecodedSignal::from_channels(channels, sample_rate))
    }
}

impl Decoder for SymphoniaDecoder {
    fn open(&self, locator: &str) -> Result<Box<dyn SampleReader>, DeckError> {
        let path = resolve_locator(locator)?;
        let signal = self.decode_file(&path).map_err(|e| {
            log::warn!("Failed to decode {:?}: {}", path, e);
            DeckError::undecodable(locator, e)
        })?;

        log::info!(
            "Decoded {:?}: {} Hz, {} channels, {} samples ({:.2}s)",
            path,
            signal.sample_rate(),
            signal.channel_count(),
            signal.len(),
            signal.duration_seconds()
        );

        Ok(Box::new(MemoryReader::new(Arc::new(signal))))
    }
}

/// Decoder serving pre-registered in-memory signals by locator.
#[derive(Debug, Default, Clone)]
pub struct InMemoryDecoder {
    signals: HashMap<String, Arc<DecodedSignal>>,
}

impl InMemoryDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, locator: impl Into<String>, signal: DecodedSignal) {
        self.signals.insert(locator.into(), Arc::new(signal));
    }

    pub fn with(mut self, locator: impl Into<String>, signal: DecodedSignal) -> Self {
        self.insert(locator, signal);
        self
    }
}

impl Decoder for InMemoryDecoder {
    fn open(&self, locator: &str) -> Result<Box<dyn SampleReader>, DeckError> {
        self.signals
            .get(locator)
            .map(|signal| Box::new(MemoryReader::new(Arc::clone(signal))) as Box<dyn SampleReader>)
            .ok_or_else(|| DeckError::undecodable(locator, "unknown locator"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(frames: usize) -> DecodedSignal {
        let left: Vec<f32> = (0..frames).map(|i| i as f32).collect();
        let right: Vec<f32> = (0..frames).map(|i| -(i as f32)).collect();
        DecodedSignal::from_channels(vec![left, right], 1000)
    }

    #[test]
    fn test_resolve_locator() {
        assert_eq!(
            resolve_locator("file:///music/a.wav").unwrap(),
            PathBuf::from("/music/a.wav")
        );
        assert_eq!(
            resolve_locator("/music/b.mp3").unwrap(),
            PathBuf::from("/music/b.mp3")
        );
        assert!(matches!(
            resolve_locator("https://example.com/c.mp3"),
            Err(DeckError::Undecodable { .. })
        ));
    }

    #[test]
    fn test_memory_reader_clips_at_end() {
        let mut reader = MemoryReader::new(Arc::new(ramp(10)));
        assert_eq!(reader.info().length_in_samples, 10);

        let block = reader.read(8, 5).unwrap();
        assert_eq!(block.frames(), 2);
        assert_eq!(block.channel(0), &[8.0, 9.0]);
        assert_eq!(block.channel(1), &[-8.0, -9.0]);

        let block = reader.read(20, 5).unwrap();
        assert_eq!(block.frames(), 0);
    }

    /// Reader that only exposes chunked reads.
    struct StreamingReader(MemoryReader);

    impl SampleReader for StreamingReader {
        fn info(&self) -> StreamInfo {
            self.0.info()
        }

        fn read(&mut self, start: u64, count: usize) -> Result<AudioBlock, DeckError> {
            self.0.read(start, count)
        }
    }

    struct StreamingDecoder(Arc<DecodedSignal>);

    impl Decoder for StreamingDecoder {
        fn open(&self, _locator: &str) -> Result<Box<dyn SampleReader>, DeckError> {
            Ok(Box::new(StreamingReader(MemoryReader::new(Arc::clone(
                &self.0,
            )))))
        }
    }

    #[test]
    fn test_decode_all_shares_in_memory_signal() {
        let decoder = InMemoryDecoder::new().with("ramp", ramp(1000));

        let first = decode_all(&decoder, "ramp").unwrap();
        let second = decode_all(&decoder, "ramp").unwrap();
        assert!(Arc::ptr_eq(&first, &decoder.signals["ramp"]));
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_decode_all_spans_chunks() {
        let frames = DECODE_CHUNK_FRAMES * 2 + 17;
        let source = Arc::new(ramp(frames));
        let decoder = StreamingDecoder(Arc::clone(&source));

        let signal = decode_all(&decoder, "ramp").unwrap();
        assert!(!Arc::ptr_eq(&signal, &source));
        assert_eq!(signal.len(), frames);
        assert_eq!(signal.channel(0)[frames - 1], (frames - 1) as f32);
        assert_eq!(signal.sample_rate(), 1000);
    }

    #[test]
    fn test_unknown_locator_is_undecodable() {
        let decoder = InMemoryDecoder::new();
        assert!(matches!(
            decode_all(&decoder, "nope"),
            Err(DeckError::Undecodable { .. })
        ));
    }

    #[test]
    fn test_symphonia_missing_file() {
        let decoder = SymphoniaDecoder::new();
        let err = decode_all(&decoder, "/definitely/not/here.wav").unwrap_err();
        assert!(matches!(err, DeckError::Undecodable { .. }));
    }
}
