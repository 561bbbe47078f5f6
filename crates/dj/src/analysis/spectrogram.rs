//! Spectrogram rendering.
//!
//! Each image column is one 1024-sample Hann-windowed FFT frame taken at a
//! position proportional to the column index. Each row samples one frequency
//! bin, linearly spaced from DC (bottom row) to just below Nyquist (top row).
//! Bin magnitudes are converted to decibels, floored at -100 dB and quantised
//! into five colour levels.

use std::io::{self, Write};
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::decoder::{decode_all, Decoder};
use crate::signal::DecodedSignal;

/// log2 of the analysis window size.
pub const FFT_ORDER: u32 = 10;

/// Analysis window size in samples.
pub const FFT_SIZE: usize = 1 << FFT_ORDER;

/// Number of usable magnitude bins per frame.
pub const BIN_COUNT: usize = FFT_SIZE / 2;

/// Decibel floor; quieter bins map to level 0.
const DB_FLOOR: f32 = -100.0;

/// Discrete colour level of one spectrogram pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SpectrogramLevel {
    /// Below 0.2, and unfilled columns.
    #[default]
    Background,
    Low,
    Mid,
    High,
    Peak,
}

impl SpectrogramLevel {
    /// Quantise a normalised level into one of the five bands.
    pub fn from_level(level: f32) -> Self {
        if level < 0.2 {
            Self::Background
        } else if level < 0.4 {
            Self::Low
        } else if level < 0.6 {
            Self::Mid
        } else if level < 0.8 {
            Self::High
        } else {
            Self::Peak
        }
    }

    /// Display colour.
    pub fn rgb(self) -> [u8; 3] {
        match self {
            Self::Background => [0x1c, 0x25, 0x41],
            Self::Low => [0x59, 0x2e, 0x83],  // purple
            Self::Mid => [0x02, 0xc3, 0x9a],  // turquoise
            Self::High => [0xf7, 0x25, 0x85], // pink
            Self::Peak => [0xfc, 0xa3, 0x11], // yellow
        }
    }
}

/// A `width` x `height` grid of colour levels, row-major, row 0 at the top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpectrogramImage {
    width: usize,
    height: usize,
    pixels: Vec<SpectrogramLevel>,
}

impl SpectrogramImage {
    /// Create an image filled with the background level.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![SpectrogramLevel::Background; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[SpectrogramLevel] {
        &self.pixels
    }

    /// Level at column `x`, row `y` (row 0 is the top of the image).
    pub fn get(&self, x: usize, y: usize) -> SpectrogramLevel {
        self.pixels[y * self.width + x]
    }

    fn set(&mut self, x: usize, y: usize, level: SpectrogramLevel) {
        self.pixels[y * self.width + x] = level;
    }

    /// True when no pixel rose above the background level.
    pub fn is_blank(&self) -> bool {
        self.pixels
            .iter()
            .all(|p| *p == SpectrogramLevel::Background)
    }

    /// Packed 8-bit RGB, row-major.
    pub fn to_rgb(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|p| p.rgb()).collect()
    }

    /// Write the image as a binary PPM (P6).
    pub fn write_ppm<W: Write>(&self, mut out: W) -> io::Result<()> {
        write!(out, "P6\n{} {}\n255\n", self.width, self.height)?;
        out.write_all(&self.to_rgb())?;
        out.flush()
    }
}

/// Builds spectrogram images from decoded signals.
///
/// The FFT plan and window table are computed once and reused across builds.
pub struct SpectrogramBuilder {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
}

impl Default for SpectrogramBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SpectrogramBuilder {
    pub fn new() -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(FFT_SIZE);

        Self {
            fft,
            window: hann_window(FFT_SIZE),
        }
    }

    /// Render `signal` into a `width` x `height` image.
    ///
    /// Signals shorter than one analysis frame give a background-only image.
    pub fn build(&self, signal: &DecodedSignal, width: usize, height: usize) -> SpectrogramImage {
        let mut image = SpectrogramImage::new(width, height);
        if width == 0 || height == 0 {
            return image;
        }

        let num_samples = signal.len() as i64;
        let usable = (num_samples - FFT_SIZE as i64) as f32;

        let mut frame = vec![0.0f32; FFT_SIZE];
        let mut buffer = vec![Complex::new(0.0f32, 0.0); FFT_SIZE];
        let mut scratch = vec![Complex::new(0.0f32, 0.0); self.fft.get_inplace_scratch_len()];
        let mut magnitudes = vec![0.0f32; BIN_COUNT];

        for x in 0..width {
            let start = ((x as f32 / width as f32) * usable) as i64;
            if start < 0 || start + FFT_SIZE as i64 >= num_samples {
                break;
            }

            signal.downmix_into(start as usize, &mut frame);
            for ((b, s), w) in buffer.iter_mut().zip(&frame).zip(&self.window) {
                *b = Complex::new(s * w, 0.0);
            }
            self.fft.process_with_scratch(&mut buffer, &mut scratch);
            for (m, b) in magnitudes.iter_mut().zip(&buffer) {
                *m = b.norm();
            }

            for y in 0..height {
                let level = normalised_level(magnitudes[row_to_bin(y, height)]);
                image.set(x, height - 1 - y, SpectrogramLevel::from_level(level));
            }
        }

        image
    }

    /// Decode a locator and render it. Decode failures give a
    /// background-only image.
    pub fn build_for(
        &self,
        decoder: &dyn Decoder,
        locator: &str,
        width: usize,
        height: usize,
    ) -> SpectrogramImage {
        match decode_all(decoder, locator) {
            Ok(signal) => {
                log::info!("Building {}x{} spectrogram for {}", width, height, locator);
                self.build(&signal, width, height)
            }
            Err(e) => {
                log::warn!("Spectrogram skipped: {}", e);
                SpectrogramImage::new(width, height)
            }
        }
    }
}

/// Symmetric Hann window, scaled so its samples sum to `size`.
fn hann_window(size: usize) -> Vec<f32> {
    let denom = (size - 1) as f64;
    let raw: Vec<f64> = (0..size)
        .map(|i| 0.5 - 0.5 * (2.0 * std::f64::consts::PI * i as f64 / denom).cos())
        .collect();

    let sum: f64 = raw.iter().sum();
    let scale = size as f64 / sum;
    raw.iter().map(|w| (w * scale) as f32).collect()
}

/// Map an image row (0 = lowest) to a bin index in `[0, BIN_COUNT - 1]`.
fn row_to_bin(y: usize, height: usize) -> usize {
    if height <= 1 {
        return 0;
    }
    (BIN_COUNT - 1) * y / (height - 1)
}

/// Convert a bin magnitude to a level in `[0, 1]` (louder than 0 dB goes above 1).
fn normalised_level(magnitude: f32) -> f32 {
    let db = if magnitude > 0.0 {
        (20.0 * magnitude.log10()).max(DB_FLOOR)
    } else {
        DB_FLOOR
    };
    (db - DB_FLOOR) / -DB_FLOOR
}
