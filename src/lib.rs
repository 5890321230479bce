pub mod audio;
pub mod config;
pub mod error;
pub mod interpolation;
pub mod nodes;
pub mod phase;
pub mod shaping;
pub mod traits;
pub mod wavetable;

pub use audio::AudioInput;
pub use config::EngineConfig;
pub use error::OscillatorError;
pub use interpolation::{Interpolation, Oversampling};
pub use nodes::{
    BlockInputs, EngineState, OscillatorEngine, Phasor, TrianglePhasor, TriangleShaper,
};
pub use phase::{PhaseAccumulator, TablePosition, WrapStrategy};
pub use shaping::{hard_fold, soft_fold, triangle_remap, Shaping, TriangleRange};
pub use traits::{AudioNode, Param, PortId};
pub use wavetable::{TableConfig, Wavetable, WavetableStore};
