// src/error.rs
use crate::traits::Param;

/// Errors reported on the maintenance path (construction, configuration,
/// parameter updates). Block processing never returns one of these: it clamps
/// or writes silence instead.
#[derive(Debug, Clone, PartialEq)]
pub enum OscillatorError {
    /// The table memory could not be obtained (or the store's byte budget is exhausted).
    AllocationFailed { samples: usize },

    /// Table sizes must be powers of two within the supported range.
    InvalidTableSize { size: usize },

    /// Sample rates must be finite and strictly positive.
    InvalidSampleRate { sample_rate: f32 },

    /// A parameter value was rejected; the previous value is kept.
    InvalidParameter { param: Param, value: f32 },

    /// No parameter with this name exists.
    UnknownParameter { name: String },

    /// The parameter exists but this node does not use it.
    UnsupportedParameter { param: Param, node_type: &'static str },

    /// The instance has already been released.
    Released,
}

impl std::fmt::Display for OscillatorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OscillatorError::AllocationFailed { samples } => {
                write!(f, "Failed to allocate wavetable of {} samples", samples)
            }
            OscillatorError::InvalidTableSize { size } => {
                write!(
                    f,
                    "Invalid table size {}: expected a power of two between {} and {}",
                    size,
                    crate::wavetable::MIN_TABLE_SIZE,
                    crate::wavetable::MAX_TABLE_SIZE
                )
            }
            OscillatorError::InvalidSampleRate { sample_rate } => {
                write!(f, "Invalid sample rate: {}", sample_rate)
            }
            OscillatorError::InvalidParameter { param, value } => {
                write!(f, "Invalid value {} for parameter '{}'", value, param)
            }
            OscillatorError::UnknownParameter { name } => {
                write!(f, "Unknown parameter: {}", name)
            }
            OscillatorError::UnsupportedParameter { param, node_type } => {
                write!(f, "Parameter '{}' is not used by {}", param, node_type)
            }
            OscillatorError::Released => write!(f, "Oscillator has been released"),
        }
    }
}

impl std::error::Error for OscillatorError {}
