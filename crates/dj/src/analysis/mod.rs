//! Offline analysis jobs run from the control context.
//!
//! Both jobs are synchronous and may take as long as a full decode.

pub mod bpm;
pub mod spectrogram;

pub use bpm::{estimate_bpm, estimate_bpm_for, try_estimate_bpm};
pub use spectrogram::{SpectrogramBuilder, SpectrogramImage, SpectrogramLevel, FFT_SIZE};
