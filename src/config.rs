// src/config.rs
use serde::{Deserialize, Serialize};

use crate::interpolation::{Interpolation, Oversampling};
use crate::phase::WrapStrategy;
use crate::shaping::Shaping;
use crate::wavetable::TableConfig;
use crate::OscillatorError;

/// Everything fixed at construction time of an `OscillatorEngine`.
///
/// Hosts that keep patches on disk can embed this directly; every field has a
/// default, so partial documents deserialize.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub table: TableConfig,
    pub interpolation: Interpolation,
    pub oversampling: Oversampling,
    pub wrap: WrapStrategy,
    pub shaping: Shaping,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::linear()
    }
}

impl EngineConfig {
    /// Linear reads from a 16384-entry table with a guard sample.
    pub fn linear() -> Self {
        Self {
            table: TableConfig::new(16384, true),
            interpolation: Interpolation::Linear,
            oversampling: Oversampling::None,
            wrap: WrapStrategy::RangeReduce,
            shaping: Shaping::None,
        }
    }

    /// Linear reads from a 4096-entry table, wrapping instead of using a guard.
    pub fn linear_compact() -> Self {
        Self {
            table: TableConfig::new(4096, false),
            ..Self::linear()
        }
    }

    /// Same table as `linear`, on the biased-double accumulator.
    pub fn linear_biased() -> Self {
        Self {
            wrap: WrapStrategy::BiasedDouble,
            ..Self::linear()
        }
    }

    pub fn cubic_oversampled() -> Self {
        Self {
            table: TableConfig::new(65536, false),
            interpolation: Interpolation::Cubic,
            oversampling: Oversampling::X2,
            ..Self::linear()
        }
    }

    /// The cubic, 2x oversampled oscillator followed by a soft fold.
    pub fn folding() -> Self {
        Self {
            shaping: Shaping::Fold,
            ..Self::cubic_oversampled()
        }
    }

    pub fn validate(&self) -> Result<(), OscillatorError> {
        self.table.validate()
    }
}
