// wavetable/table.rs
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::OscillatorError;

/// Smallest table the cubic kernel can read (it needs four neighbours).
pub const MIN_TABLE_SIZE: usize = 4;
/// Largest table the biased-double phase accumulator can address.
pub const MAX_TABLE_SIZE: usize = 1 << 16;

/// Identifies one shared table: its length and whether a guard sample
/// (a copy of `table[0]` at `table[size]`) is appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TableConfig {
    pub size: usize,
    pub guard_sample: bool,
}

impl TableConfig {
    pub const fn new(size: usize, guard_sample: bool) -> Self {
        Self { size, guard_sample }
    }

    pub fn validate(&self) -> Result<(), OscillatorError> {
        if !is_valid_table_size(self.size) {
            return Err(OscillatorError::InvalidTableSize { size: self.size });
        }
        Ok(())
    }

    /// Number of stored samples, guard included.
    pub fn len(&self) -> usize {
        self.size + usize::from(self.guard_sample)
    }

    pub fn bytes(&self) -> usize {
        self.len() * std::mem::size_of::<f32>()
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self::new(16384, true)
    }
}

pub fn is_valid_table_size(size: usize) -> bool {
    size.is_power_of_two() && (MIN_TABLE_SIZE..=MAX_TABLE_SIZE).contains(&size)
}

/// One period of a waveform stored as `f32` samples. Immutable once built.
#[derive(Debug)]
pub struct Wavetable {
    samples: Vec<f32>,
    size: usize,
    mask: usize,
    guard_sample: bool,
}

impl Wavetable {
    /// Builds `cos(2π·i/size)` for `i` in `[0, size)`, plus the guard sample
    /// if requested. Memory is reserved fallibly so an exhausted allocator
    /// surfaces as an error rather than an abort.
    pub fn cosine(config: TableConfig) -> Result<Self, OscillatorError> {
        config.validate()?;

        let mut samples = Vec::new();
        samples
            .try_reserve_exact(config.len())
            .map_err(|_| OscillatorError::AllocationFailed {
                samples: config.len(),
            })?;

        let size = config.size;
        samples.extend((0..size).map(|i| (2.0 * PI * i as f64 / size as f64).cos() as f32));
        if config.guard_sample {
            samples.push(samples[0]);
        }

        Ok(Self {
            samples,
            size,
            mask: size - 1,
            guard_sample: config.guard_sample,
        })
    }

    /// Wraps caller-provided samples (one period, power-of-two length).
    pub fn from_samples(samples: Vec<f32>, guard_sample: bool) -> Result<Self, OscillatorError> {
        let size = samples.len();
        if !is_valid_table_size(size) {
            return Err(OscillatorError::InvalidTableSize { size });
        }
        let mut samples = samples;
        if guard_sample {
            samples.push(samples[0]);
        }
        Ok(Self {
            samples,
            size,
            mask: size - 1,
            guard_sample,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn mask(&self) -> usize {
        self.mask
    }

    pub fn has_guard_sample(&self) -> bool {
        self.guard_sample
    }

    pub fn config(&self) -> TableConfig {
        TableConfig::new(self.size, self.guard_sample)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.samples
    }

    /// Sample at `index` modulo the table size.
    #[inline(always)]
    pub fn at(&self, index: isize) -> f32 {
        self.samples[(index as usize) & self.mask]
    }

    /// The sample following `index` (`index < size`), read from the guard
    /// slot when there is one instead of wrapping.
    #[inline(always)]
    pub fn next_after(&self, index: usize) -> f32 {
        if self.guard_sample {
            self.samples[index + 1]
        } else {
            self.samples[(index + 1) & self.mask]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_table_content() {
        let table = Wavetable::cosine(TableConfig::new(4096, true)).unwrap();
        assert_eq!(table.as_slice().len(), 4097);
        assert_eq!(table.at(0), 1.0);
        assert!((table.at(1024)).abs() < 1e-6);
        assert_eq!(table.at(2048), -1.0);
        assert_eq!(table.as_slice()[4096], table.as_slice()[0]);
    }

    #[test]
    fn test_table_without_guard_wraps() {
        let table = Wavetable::cosine(TableConfig::new(16, false)).unwrap();
        assert_eq!(table.as_slice().len(), 16);
        assert_eq!(table.next_after(15), table.at(0));
        assert_eq!(table.at(-1), table.at(15));
    }

    #[test]
    fn test_invalid_sizes_are_rejected() {
        for size in [0, 1, 2, 3, 1000, MAX_TABLE_SIZE * 2] {
            assert_eq!(
                Wavetable::cosine(TableConfig::new(size, false)).unwrap_err(),
                OscillatorError::InvalidTableSize { size }
            );
        }
    }

    #[test]
    fn test_from_samples_appends_guard() {
        let table = Wavetable::from_samples(vec![0.0, 1.0, 2.0, 3.0], true).unwrap();
        assert_eq!(table.size(), 4);
        assert_eq!(table.next_after(3), 0.0);
        assert!(Wavetable::from_samples(vec![0.0; 6], false).is_err());
    }
}
