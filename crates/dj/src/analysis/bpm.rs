//! Tempo estimation by amplitude-threshold peak counting.
//!
//! The signal is downmixed to mono and every sample louder than half the
//! global peak registers a beat, unless it falls within a quarter second of
//! the previous beat. The beat count over the track duration gives the tempo.
//! There is no onset detection or confidence measure.

use crate::decoder::{decode_all, Decoder};
use crate::error::DeckError;
use crate::signal::DecodedSignal;

/// Fraction of the peak amplitude a sample must exceed to count as a beat.
const THRESHOLD_RATIO: f32 = 0.5;

/// Refractory period as a divisor of the sample rate (a quarter second).
const REFRACTORY_DIVISOR: u32 = 4;

/// Estimate the tempo of a decoded signal in beats per minute.
///
/// Returns [`DeckError::ZeroLengthTrack`] for an empty signal or a zero
/// sample rate.
pub fn try_estimate_bpm(signal: &DecodedSignal) -> Result<f64, DeckError> {
    if signal.is_empty() || signal.sample_rate() == 0 {
        return Err(DeckError::ZeroLengthTrack);
    }

    let mono = signal.downmix();
    Ok(count_beats_per_minute(&mono, signal.sample_rate()))
}

/// Estimate the tempo, returning 0.0 ("unknown") for empty signals.
pub fn estimate_bpm(signal: &DecodedSignal) -> f64 {
    try_estimate_bpm(signal).unwrap_or(0.0)
}

/// Decode a locator and estimate its tempo, returning 0.0 on any failure.
pub fn estimate_bpm_for(decoder: &dyn Decoder, locator: &str) -> f64 {
    let signal = match decode_all(decoder, locator) {
        Ok(signal) => signal,
        Err(e) => {
            log::warn!("BPM estimation skipped: {}", e);
            return 0.0;
        }
    };

    let bpm = estimate_bpm(&signal);
    log::info!("Estimated {:.1} BPM for {}", bpm, locator);
    bpm
}

fn count_beats_per_minute(mono: &[f32], sample_rate: u32) -> f64 {
    let peak = mono.iter().fold(0.0f32, |max, s| max.max(s.abs()));
    let threshold = THRESHOLD_RATIO * peak;
    let refractory = (sample_rate / REFRACTORY_DIVISOR) as usize;

    let mut beats = 0usize;
    let mut last_beat: Option<usize> = None;
    for (i, sample) in mono.iter().enumerate() {
        // Strict comparison: silence (threshold 0) never registers
        if sample.abs() <= threshold {
            continue;
        }
        if last_beat.map_or(true, |last| i - last >= refractory) {
            beats += 1;
            last_beat = Some(i);
        }
    }

    let duration_seconds = mono.len() as f64 / sample_rate as f64;
    beats as f64 / duration_seconds * 60.0
}
