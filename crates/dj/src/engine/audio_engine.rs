//! Output stream driving the mix bus from the audio device.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};

use super::{BlockSource, MixBus};
use crate::signal::AudioBlock;
use twindeck_core::Settings;

/// Audio engine configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioEngineConfig {
    /// Audio device name (empty for default).
    pub device_name: String,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Largest block rendered in one pass, in frames.
    pub buffer_size: u32,
    /// Output channel count.
    pub channels: u16,
}

impl Default for AudioEngineConfig {
    fn default() -> Self {
        Self {
            device_name: String::new(),
            sample_rate: 44100,
            buffer_size: 512,
            channels: 2,
        }
    }
}

impl AudioEngineConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            device_name: settings.device_query().to_string(),
            sample_rate: settings.audio_sample_rate,
            buffer_size: settings.audio_buffer_size.max(1),
            channels: settings.output_channels.max(1),
        }
    }
}

/// Fill an interleaved device buffer from the bus.
///
/// `block` is the preallocated render block; the buffer is rendered in chunks
/// of at most `block.capacity()` frames. Device channels beyond the bus
/// channels are written as silence.
pub fn render_interleaved(
    bus: &mut MixBus,
    block: &mut AudioBlock,
    data: &mut [f32],
    channels: usize,
) {
    if channels == 0 || block.capacity() == 0 {
        data.fill(0.0);
        return;
    }

    for chunk in data.chunks_mut(block.capacity() * channels) {
        block.set_frames(chunk.len() / channels);
        bus.produce_block(block);
        block.write_interleaved(chunk, channels);
    }
}

/// Plays a [`MixBus`] on an output device.
pub struct DeckAudioEngine {
    config: AudioEngineConfig,
    stream: Option<Stream>,
    output_channels: u16,
    sample_rate: u32,
}

impl DeckAudioEngine {
    pub fn new(config: AudioEngineConfig) -> Self {
        let output_channels = config.channels;
        let sample_rate = config.sample_rate;
        Self {
            config,
            stream: None,
            output_channels,
            sample_rate,
        }
    }

    /// Find the audio device by name.
    fn find_device(&self) -> Result<Device, anyhow::Error> {
        let host = cpal::default_host();

        if self.config.device_name.is_empty() {
            return host
                .default_output_device()
                .ok_or_else(|| anyhow::anyhow!("No default output device available"));
        }

        for device in host.output_devices()? {
            if let Ok(name) = device.name() {
                if name.contains(&self.config.device_name) {
                    log::info!("Found audio device: {}", name);
                    return Ok(device);
                }
            }
        }

        log::warn!(
            "Device '{}' not found, using default",
            self.config.device_name
        );
        host.default_output_device()
            .ok_or_else(|| anyhow::anyhow!("No default output device available"))
    }

    /// Find an f32 config with the requested channel count and rate.
    fn find_config(&self, device: &Device) -> Result<StreamConfig, anyhow::Error> {
        let target_rate = self.config.sample_rate;

        for config_range in device.supported_output_configs()? {
            if config_range.channels() == self.config.channels
                && config_range.sample_format() == SampleFormat::F32
                && target_rate >= config_range.min_sample_rate()
                && target_rate <= config_range.max_sample_rate()
            {
                return Ok(config_range.with_sample_rate(target_rate).into());
            }
        }

        let default_config = device.default_output_config()?;
        log::warn!(
            "No {}-channel f32 config at {} Hz, using default ({} channels @ {} Hz)",
            self.config.channels,
            target_rate,
            default_config.channels(),
            default_config.sample_rate()
        );
        Ok(default_config.into())
    }

    /// Open the device and start pulling blocks from `bus`.
    ///
    /// The bus is moved into the audio callback and prepared for the stream
    /// format first.
    pub fn start(&mut self, mut bus: MixBus) -> Result<(), anyhow::Error> {
        if self.stream.is_some() {
            anyhow::bail!("Audio engine already running");
        }

        let device = self.find_device()?;
        let config = self.find_config(&device)?;

        self.output_channels = config.channels;
        self.sample_rate = config.sample_rate;
        log::info!(
            "Starting audio engine: {} channels @ {} Hz",
            config.channels,
            config.sample_rate
        );

        let max_block = self.config.buffer_size.max(1) as usize;
        bus.prepare(config.sample_rate, max_block);
        let mut block = AudioBlock::new(bus.channels(), max_block);
        let channels = config.channels as usize;

        let stream = device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                render_interleaved(&mut bus, &mut block, data, channels);
            },
            |err| {
                log::error!("Audio stream error: {}", err);
            },
            None,
        )?;

        stream.play()?;
        self.stream = Some(stream);

        log::info!("Audio engine started");
        Ok(())
    }

    /// Stop the audio engine, dropping the bus with the stream.
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            log::info!("Audio engine stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.stream.is_some()
    }

    /// Channel count of the running stream (the configured count before start).
    pub fn output_channels(&self) -> u16 {
        self.output_channels
    }

    /// Sample rate of the running stream (the configured rate before start).
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl Drop for DeckAudioEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ones;

    impl BlockSource for Ones {
        fn produce_block(&mut self, block: &mut AudioBlock) {
            for ch in 0..block.channels() {
                block.channel_mut(ch).fill(1.0);
            }
        }
    }

    #[test]
    fn test_config_from_settings() {
        let settings = Settings {
            audio_device: "Motu".to_string(),
            audio_sample_rate: 48000,
            audio_buffer_size: 256,
            ..Settings::default()
        };
        let config = AudioEngineConfig::from_settings(&settings);
        assert_eq!(config.device_name, "Motu");
        assert_eq!(config.sample_rate, 48000);
        assert_eq!(config.buffer_size, 256);
        assert_eq!(config.channels, 2);

        let config = AudioEngineConfig::from_settings(&Settings::default());
        assert!(config.device_name.is_empty());
    }

    #[test]
    fn test_render_interleaved_chunks_and_pads() {
        let mut bus = MixBus::new(2, 44100, 4);
        bus.add_input(Ones);
        bus.add_input(Ones);
        let mut block = AudioBlock::new(2, 4);

        // 10 frames on a 3 channel device, rendered as 4 + 4 + 2
        let mut data = vec![9.0f32; 30];
        render_interleaved(&mut bus, &mut block, &mut data, 3);

        for frame in data.chunks(3) {
            assert_eq!(frame, &[2.0, 2.0, 0.0]);
        }
    }

    #[test]
    fn test_engine_starts_stopped() {
        let engine = DeckAudioEngine::new(AudioEngineConfig::default());
        assert!(!engine.is_running());
        assert_eq!(engine.output_channels(), 2);
        assert_eq!(engine.sample_rate(), 44100);
    }
}
