pub mod oscillator;
pub mod phasor;
pub mod triangle;


pub use oscillator::*;
pub use phasor::*;
pub use triangle::*;

use crate::OscillatorError;

/// Rate assumed until the host calls `configure`.
pub const DEFAULT_SAMPLE_RATE: f32 = 44_100.0;

pub(crate) fn validate_sample_rate(sample_rate: f32) -> Result<(), OscillatorError> {
    if sample_rate.is_finite() && sample_rate > 0.0 {
        Ok(())
    } else {
        tracing::warn!(sample_rate, "rejected sample rate");
        Err(OscillatorError::InvalidSampleRate { sample_rate })
    }
}

/// Limits a per-sample frequency to `±nyquist`; NaN becomes 0 Hz.
#[inline(always)]
pub(crate) fn clamp_frequency(frequency: f32, nyquist: f32) -> f32 {
    if frequency.is_nan() {
        0.0
    } else {
        frequency.clamp(-nyquist, nyquist)
    }
}
