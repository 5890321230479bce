// src/nodes/oscillator.rs
use std::any::Any;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::{clamp_frequency, validate_sample_rate, DEFAULT_SAMPLE_RATE};
use crate::audio::AudioInput;
use crate::config::EngineConfig;
use crate::interpolation::{Cubic, Interpolation, InterpolationKernel, Linear, Oversampling};
use crate::phase::PhaseAccumulator;
use crate::shaping::{soft_fold, Shaping, DEFAULT_SOFTNESS, DEFAULT_THRESHOLD};
use crate::traits::{AudioNode, Param, PortId};
use crate::wavetable::{Wavetable, WavetableStore};
use crate::OscillatorError;

/// Frequency used when the requested initial frequency is not a positive number.
pub const DEFAULT_FREQUENCY: f32 = 440.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Active,
    Released,
}

/// Per-sample control signals for one block. Unconnected (or short) signals
/// fall back to the engine's parameter values.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockInputs<'a> {
    pub frequency: Option<&'a [f32]>,
    pub threshold: Option<&'a [f32]>,
    pub softness: Option<&'a [f32]>,
}

impl<'a> BlockInputs<'a> {
    pub fn with_frequency(frequency: &'a [f32]) -> Self {
        Self {
            frequency: Some(frequency),
            ..Self::default()
        }
    }

    pub fn threshold(mut self, threshold: &'a [f32]) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn softness(mut self, softness: &'a [f32]) -> Self {
        self.softness = Some(softness);
        self
    }
}

/// Values that stay fixed for the duration of one block.
struct BlockParams<'a> {
    frequency: AudioInput<'a>,
    threshold: AudioInput<'a>,
    softness: AudioInput<'a>,
    scale: f64,
    nyquist: f32,
    oversample: bool,
    fold: bool,
}

/// A cosine oscillator reading a shared table.
///
/// Each output sample reads the table at the current phase, optionally
/// oversamples and folds, then advances the phase by
/// `frequency · table_size / sample_rate`.
pub struct OscillatorEngine {
    store: Arc<WavetableStore>,
    config: EngineConfig,
    table: Option<Arc<Wavetable>>,
    phase: PhaseAccumulator,
    state: EngineState,
    sample_rate: f32,
    pending_sample_rate: Option<f32>,
    scale: f64,
    frequency: f32,
    threshold: f32,
    softness: f32,
}

impl OscillatorEngine {
    /// Attaches the table described by `config.table`. If the table cannot be
    /// allocated the engine is still returned, but only ever outputs silence.
    pub fn new(
        store: &Arc<WavetableStore>,
        config: EngineConfig,
        initial_frequency: f32,
    ) -> Result<Self, OscillatorError> {
        if let Err(err) = config.validate() {
            tracing::warn!("rejected oscillator configuration: {}", err);
            return Err(err);
        }
        let phase = PhaseAccumulator::new(config.wrap, config.table.size)?;

        let table = match store.attach(config.table) {
            Ok(table) => Some(table),
            Err(OscillatorError::AllocationFailed { samples }) => {
                tracing::warn!(samples, "no wavetable available, oscillator will be silent");
                None
            }
            Err(err) => return Err(err),
        };

        let frequency = if initial_frequency.is_finite() && initial_frequency > 0.0 {
            initial_frequency
        } else {
            DEFAULT_FREQUENCY
        };

        Ok(Self {
            store: Arc::clone(store),
            config,
            table,
            phase,
            state: EngineState::Active,
            sample_rate: DEFAULT_SAMPLE_RATE,
            pending_sample_rate: None,
            scale: config.table.size as f64 / DEFAULT_SAMPLE_RATE as f64,
            frequency,
            threshold: DEFAULT_THRESHOLD,
            softness: DEFAULT_SOFTNESS,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// True when `process` can only write zeros.
    pub fn is_silent(&self) -> bool {
        self.state == EngineState::Released || self.table.is_none()
    }

    pub fn sample_rate(&self) -> f32 {
        self.pending_sample_rate.unwrap_or(self.sample_rate)
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Current phase in cycles, `[0, 1)`.
    pub fn phase(&self) -> f64 {
        self.phase.phase() / self.config.table.size as f64
    }

    /// Moves the phase to `cycles` (any value, wrapped into one cycle).
    pub fn set_phase(&mut self, cycles: f64) {
        self.phase.set_phase(cycles * self.config.table.size as f64);
    }

    /// Schedules a sample-rate change. It is applied at the start of the next
    /// block; an invalid rate leaves the current one in place.
    pub fn configure(&mut self, sample_rate: f32) -> Result<(), OscillatorError> {
        if self.state == EngineState::Released {
            return Err(OscillatorError::Released);
        }
        validate_sample_rate(sample_rate)?;
        self.pending_sample_rate = Some(sample_rate);
        Ok(())
    }

    pub fn set_parameter(&mut self, param: Param, value: f32) -> Result<(), OscillatorError> {
        if self.state == EngineState::Released {
            return Err(OscillatorError::Released);
        }
        if !value.is_finite() {
            tracing::warn!(%param, value, "rejected non-finite parameter value");
            return Err(OscillatorError::InvalidParameter { param, value });
        }
        match param {
            Param::Frequency => self.frequency = value,
            Param::Threshold => self.threshold = value.max(0.0),
            Param::Softness => self.softness = value.max(0.0),
            Param::Phase => self.set_phase(value as f64),
            Param::Peak | Param::Low | Param::High => {
                return Err(OscillatorError::UnsupportedParameter {
                    param,
                    node_type: self.node_type(),
                })
            }
        }
        Ok(())
    }

    /// Renders `output.len()` samples.
    pub fn process(&mut self, inputs: &BlockInputs, output: &mut [f32]) {
        if self.state == EngineState::Released {
            output.fill(0.0);
            return;
        }
        if let Some(sample_rate) = self.pending_sample_rate.take() {
            self.sample_rate = sample_rate;
            self.scale = self.config.table.size as f64 / sample_rate as f64;
        }
        let Some(table) = self.table.as_deref() else {
            output.fill(0.0);
            return;
        };

        let params = BlockParams {
            frequency: AudioInput::new(inputs.frequency, self.frequency),
            threshold: AudioInput::new(inputs.threshold, self.threshold),
            softness: AudioInput::new(inputs.softness, self.softness),
            scale: self.scale,
            nyquist: self.sample_rate * 0.5,
            oversample: self.config.oversampling == Oversampling::X2,
            fold: self.config.shaping == Shaping::Fold,
        };

        match self.config.interpolation {
            Interpolation::Linear => render::<Linear>(table, &mut self.phase, &params, output),
            Interpolation::Cubic => render::<Cubic>(table, &mut self.phase, &params, output),
        }
    }

    /// Detaches from the table store. Processing afterwards writes silence.
    /// Calling this more than once has no further effect.
    pub fn release(&mut self) {
        if self.state == EngineState::Released {
            return;
        }
        self.state = EngineState::Released;
        if self.table.take().is_some() {
            self.store.detach(self.config.table);
        }
    }
}

impl Drop for OscillatorEngine {
    fn drop(&mut self) {
        self.release();
    }
}

fn render<K: InterpolationKernel>(
    table: &Wavetable,
    phase: &mut PhaseAccumulator,
    params: &BlockParams,
    output: &mut [f32],
) {
    for (i, out) in output.iter_mut().enumerate() {
        let increment = clamp_frequency(params.frequency.get(i), params.nyquist) as f64 * params.scale;

        let (threshold, softness) = if params.fold {
            (
                sanitize_shape_input(params.threshold.get(i), DEFAULT_THRESHOLD),
                sanitize_shape_input(params.softness.get(i), DEFAULT_SOFTNESS),
            )
        } else {
            (0.0, 0.0)
        };
        let shape = |x: f32| {
            if params.fold {
                soft_fold(x, threshold, softness)
            } else {
                x
            }
        };

        *out = if params.oversample {
            let half = increment * 0.5;
            let first = shape(K::read(table, phase.position()));
            phase.advance(half);
            let second = shape(K::read(table, phase.position()));
            phase.advance(half);
            0.5 * (first + second)
        } else {
            let sample = shape(K::read(table, phase.position()));
            phase.advance(increment);
            sample
        };
    }
    phase.finish_block();
}

#[inline(always)]
fn sanitize_shape_input(value: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.max(0.0)
    }
}

impl AudioNode for OscillatorEngine {
    fn get_ports(&self) -> FxHashMap<PortId, bool> {
        let mut ports = FxHashMap::default();
        ports.insert(PortId::Frequency, false);
        if self.config.shaping == Shaping::Fold {
            ports.insert(PortId::Threshold, false);
            ports.insert(PortId::Softness, false);
        }
        ports.insert(PortId::AudioOutput0, true);
        ports
    }

    fn process(
        &mut self,
        inputs: &FxHashMap<PortId, &[f32]>,
        outputs: &mut FxHashMap<PortId, &mut [f32]>,
        buffer_size: usize,
    ) {
        let Some(output) = outputs.get_mut(&PortId::AudioOutput0) else {
            return;
        };
        let len = buffer_size.min(output.len());
        let block = BlockInputs {
            frequency: inputs.get(&PortId::Frequency).copied(),
            threshold: inputs.get(&PortId::Threshold).copied(),
            softness: inputs.get(&PortId::Softness).copied(),
        };
        OscillatorEngine::process(self, &block, &mut output[..len]);
    }

    fn configure(&mut self, sample_rate: f32) -> Result<(), OscillatorError> {
        OscillatorEngine::configure(self, sample_rate)
    }

    fn set_parameter(&mut self, param: Param, value: f32) -> Result<(), OscillatorError> {
        OscillatorEngine::set_parameter(self, param, value)
    }

    fn reset(&mut self) {
        self.phase.set_phase(0.0);
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn is_active(&self) -> bool {
        self.state == EngineState::Active
    }

    fn node_type(&self) -> &'static str {
        "table_oscillator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wavetable::TableConfig;

    fn engine(config: EngineConfig) -> (Arc<WavetableStore>, OscillatorEngine) {
        let store = Arc::new(WavetableStore::new());
        let engine = OscillatorEngine::new(&store, config, 440.0).unwrap();
        (store, engine)
    }

    #[test]
    fn test_initial_frequency_fallback() {
        let store = Arc::new(WavetableStore::new());
        for bad in [0.0, -3.0, f32::NAN, f32::INFINITY] {
            let engine = OscillatorEngine::new(&store, EngineConfig::linear(), bad).unwrap();
            assert_eq!(engine.frequency(), DEFAULT_FREQUENCY);
        }
        let engine = OscillatorEngine::new(&store, EngineConfig::linear(), 110.0).unwrap();
        assert_eq!(engine.frequency(), 110.0);
    }

    #[test]
    fn test_first_sample_reads_phase_zero() {
        let (_store, mut engine) = engine(EngineConfig::linear());
        let mut out = [0.0; 4];
        engine.process(&BlockInputs::default(), &mut out);
        assert_eq!(out[0], 1.0);
        assert!(out[1] < 1.0);
    }

    #[test]
    fn test_engines_share_one_table() {
        let store = Arc::new(WavetableStore::new());
        let a = OscillatorEngine::new(&store, EngineConfig::linear(), 440.0).unwrap();
        let b = OscillatorEngine::new(&store, EngineConfig::linear_biased(), 220.0).unwrap();
        let config = EngineConfig::linear().table;
        assert_eq!(store.attach_count(config), 2);
        assert_eq!(store.builds(), 1);
        drop(a);
        assert_eq!(store.attach_count(config), 1);
        drop(b);
        assert!(!store.is_built(config));
    }

    #[test]
    fn test_release_is_idempotent() {
        let (store, mut engine) = engine(EngineConfig::linear_compact());
        let config = TableConfig::new(4096, false);
        store.attach(config).unwrap();
        assert_eq!(store.attach_count(config), 2);

        engine.release();
        engine.release();
        drop(engine);
        assert_eq!(store.attach_count(config), 1);
    }

    #[test]
    fn test_parameters() {
        let (_store, mut engine) = engine(EngineConfig::folding());
        assert!(engine.set_parameter(Param::Threshold, 0.3).is_ok());
        assert_eq!(engine.threshold, 0.3);
        assert!(engine.set_parameter(Param::Softness, -1.0).is_ok());
        assert_eq!(engine.softness, 0.0);

        assert!(matches!(
            engine.set_parameter(Param::Threshold, f32::NAN),
            Err(OscillatorError::InvalidParameter {
                param: Param::Threshold,
                ..
            })
        ));
        assert_eq!(engine.threshold, 0.3);

        assert_eq!(
            engine.set_parameter(Param::Peak, 0.2),
            Err(OscillatorError::UnsupportedParameter {
                param: Param::Peak,
                node_type: "table_oscillator"
            })
        );
        assert!(engine.set_parameter_by_name("freq", 220.0).is_ok());
        assert_eq!(engine.frequency(), 220.0);
    }

    #[test]
    fn test_phase_parameter_wraps_into_one_cycle() {
        let (_store, mut engine) = engine(EngineConfig::linear());
        engine.set_parameter(Param::Phase, 1.25).unwrap();
        assert!((engine.phase() - 0.25).abs() < 1e-12);
        engine.set_phase(-0.25);
        assert!((engine.phase() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_released_engine_rejects_maintenance_calls() {
        let (_store, mut engine) = engine(EngineConfig::linear());
        engine.release();
        assert_eq!(engine.configure(48_000.0), Err(OscillatorError::Released));
        assert_eq!(
            engine.set_parameter(Param::Frequency, 100.0),
            Err(OscillatorError::Released)
        );
        assert!(!AudioNode::is_active(&engine));
    }
}
