// src/nodes/phasor.rs
use std::any::Any;

use rustc_hash::FxHashMap;

use super::{clamp_frequency, validate_sample_rate, DEFAULT_SAMPLE_RATE};
use crate::audio::AudioInput;
use crate::phase::{PhaseAccumulator, WrapStrategy};
use crate::shaping::TriangleRange;
use crate::traits::{AudioNode, Param, PortId};
use crate::OscillatorError;

/// Default peak position of the triangle phasor.
pub const DEFAULT_PEAK: f32 = 0.5;

/// Sawtooth ramp over `[0, 1)` at a per-sample frequency.
///
/// Each output sample is the phase before that sample's increment is
/// applied, so a freshly reset phasor starts at exactly the reset value.
pub struct Phasor {
    phase: PhaseAccumulator,
    sample_rate: f32,
    pending_sample_rate: Option<f32>,
    frequency: f32,
}

impl Phasor {
    /// Runs on the biased-double accumulator.
    pub fn new(initial_frequency: f32) -> Self {
        Self::with_strategy(initial_frequency, WrapStrategy::BiasedDouble)
    }

    pub fn with_strategy(initial_frequency: f32, strategy: WrapStrategy) -> Self {
        Self {
            phase: PhaseAccumulator::unit(strategy),
            sample_rate: DEFAULT_SAMPLE_RATE,
            pending_sample_rate: None,
            frequency: if initial_frequency.is_finite() {
                initial_frequency
            } else {
                0.0
            },
        }
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn phase(&self) -> f64 {
        self.phase.phase()
    }

    /// Resets the ramp; values outside `[0, 1)` are wrapped.
    pub fn set_phase(&mut self, phase: f64) {
        self.phase.set_phase(phase);
    }

    pub fn configure(&mut self, sample_rate: f32) -> Result<(), OscillatorError> {
        validate_sample_rate(sample_rate)?;
        self.pending_sample_rate = Some(sample_rate);
        Ok(())
    }

    /// Fills `output` with the ramp. `frequency` falls back to the frequency
    /// parameter where it is missing or short.
    pub fn process(&mut self, frequency: Option<&[f32]>, output: &mut [f32]) {
        if let Some(sample_rate) = self.pending_sample_rate.take() {
            self.sample_rate = sample_rate;
        }
        let frequency = AudioInput::new(frequency, self.frequency);
        let scale = 1.0 / self.sample_rate as f64;
        let nyquist = self.sample_rate * 0.5;

        for (i, out) in output.iter_mut().enumerate() {
            *out = self.phase.position().frac as f32;
            self.phase
                .advance(clamp_frequency(frequency.get(i), nyquist) as f64 * scale);
        }
        self.phase.finish_block();
    }

    fn apply_parameter(&mut self, param: Param, value: f32) -> Result<(), OscillatorError> {
        if !value.is_finite() {
            return Err(OscillatorError::InvalidParameter { param, value });
        }
        match param {
            Param::Frequency => self.frequency = value,
            Param::Phase => self.set_phase(value as f64),
            _ => {
                return Err(OscillatorError::UnsupportedParameter {
                    param,
                    node_type: "phasor",
                })
            }
        }
        Ok(())
    }
}

impl AudioNode for Phasor {
    fn get_ports(&self) -> FxHashMap<PortId, bool> {
        let mut ports = FxHashMap::default();
        ports.insert(PortId::Frequency, false);
        ports.insert(PortId::AudioOutput0, true);
        ports
    }

    fn process(
        &mut self,
        inputs: &FxHashMap<PortId, &[f32]>,
        outputs: &mut FxHashMap<PortId, &mut [f32]>,
        buffer_size: usize,
    ) {
        if let Some(output) = outputs.get_mut(&PortId::AudioOutput0) {
            let len = buffer_size.min(output.len());
            Phasor::process(
                self,
                inputs.get(&PortId::Frequency).copied(),
                &mut output[..len],
            );
        }
    }

    fn configure(&mut self, sample_rate: f32) -> Result<(), OscillatorError> {
        Phasor::configure(self, sample_rate)
    }

    fn set_parameter(&mut self, param: Param, value: f32) -> Result<(), OscillatorError> {
        self.apply_parameter(param, value)
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
        true
    }

    fn node_type(&self) -> &'static str {
        "phasor"
    }
}

/// A phasor whose ramp is remapped to a triangle in `[lo, hi]` with a
/// per-sample peak position.
pub struct TrianglePhasor {
    phasor: Phasor,
    peak: f32,
    range: TriangleRange,
}

impl TrianglePhasor {
    pub fn new(initial_frequency: f32) -> Self {
        Self {
            phasor: Phasor::new(initial_frequency),
            peak: DEFAULT_PEAK,
            range: TriangleRange::default(),
        }
    }

    pub fn with_range(mut self, lo: f32, hi: f32) -> Self {
        self.range = TriangleRange::new(lo, hi);
        self
    }

    pub fn with_peak(mut self, peak: f32) -> Self {
        self.peak = peak.clamp(0.0, 1.0);
        self
    }

    pub fn range(&self) -> TriangleRange {
        self.range
    }

    pub fn peak(&self) -> f32 {
        self.peak
    }

    pub fn set_phase(&mut self, phase: f64) {
        self.phasor.set_phase(phase);
    }

    pub fn configure(&mut self, sample_rate: f32) -> Result<(), OscillatorError> {
        self.phasor.configure(sample_rate)
    }

    pub fn process(
        &mut self,
        frequency: Option<&[f32]>,
        peak: Option<&[f32]>,
        output: &mut [f32],
    ) {
        self.phasor.process(frequency, output);
        let peak = AudioInput::new(peak, self.peak);
        for (i, out) in output.iter_mut().enumerate() {
            *out = self.range.remap(*out, peak.get(i));
        }
    }

    fn apply_parameter(&mut self, param: Param, value: f32) -> Result<(), OscillatorError> {
        if !value.is_finite() {
            return Err(OscillatorError::InvalidParameter { param, value });
        }
        match param {
            Param::Peak => self.peak = value.clamp(0.0, 1.0),
            Param::Low => self.range.lo = value,
            Param::High => self.range.hi = value,
            Param::Frequency | Param::Phase => return self.phasor.apply_parameter(param, value),
            Param::Threshold | Param::Softness => {
                return Err(OscillatorError::UnsupportedParameter {
                    param,
                    node_type: "triangle_phasor",
                })
            }
        }
        Ok(())
    }
}

impl AudioNode for TrianglePhasor {
    fn get_ports(&self) -> FxHashMap<PortId, bool> {
        let mut ports = FxHashMap::default();
        ports.insert(PortId::Frequency, false);
        ports.insert(PortId::Peak, false);
        ports.insert(PortId::AudioOutput0, true);
        ports
    }

    fn process(
        &mut self,
        inputs: &FxHashMap<PortId, &[f32]>,
        outputs: &mut FxHashMap<PortId, &mut [f32]>,
        buffer_size: usize,
    ) {
        if let Some(output) = outputs.get_mut(&PortId::AudioOutput0) {
            let len = buffer_size.min(output.len());
            TrianglePhasor::process(
                self,
                inputs.get(&PortId::Frequency).copied(),
                inputs.get(&PortId::Peak).copied(),
                &mut output[..len],
            );
        }
    }

    fn configure(&mut self, sample_rate: f32) -> Result<(), OscillatorError> {
        TrianglePhasor::configure(self, sample_rate)
    }

    fn set_parameter(&mut self, param: Param, value: f32) -> Result<(), OscillatorError> {
        self.apply_parameter(param, value).inspect_err(|err| {
            tracing::warn!("triangle phasor: {}", err);
        })
    }

    fn reset(&mut self) {
        self.phasor.set_phase(0.0);
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn is_active(&self) -> bool {
        true
    }

    fn node_type(&self) -> &'static str {
        "triangle_phasor"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phasor_ramp() {
        for strategy in [WrapStrategy::RangeReduce, WrapStrategy::BiasedDouble] {
            let mut phasor = Phasor::with_strategy(1000.0, strategy);
            phasor.configure(8000.0).unwrap();
            let mut out = [0.0; 10];
            phasor.process(None, &mut out);
            let expected = [0.0, 0.125, 0.25, 0.375, 0.5, 0.625, 0.75, 0.875, 0.0, 0.125];
            assert_eq!(out, expected, "{:?}", strategy);
        }
    }

    #[test]
    fn test_phasor_negative_frequency_descends() {
        let mut phasor = Phasor::new(-2000.0);
        phasor.configure(8000.0).unwrap();
        let mut out = [0.0; 5];
        phasor.process(None, &mut out);
        assert_eq!(out, [0.0, 0.75, 0.5, 0.25, 0.0]);
    }

    #[test]
    fn test_phasor_reset_wraps() {
        let mut phasor = Phasor::new(0.0);
        phasor.set_parameter_by_name("phase", 2.25).unwrap();
        let mut out = [0.0; 2];
        phasor.process(None, &mut out);
        assert_eq!(out, [0.25, 0.25]);
    }

    #[test]
    fn test_triangle_phasor_defaults() {
        let mut tri = TrianglePhasor::new(1000.0);
        tri.configure(8000.0).unwrap();
        let mut out = [0.0; 8];
        tri.process(None, None, &mut out);
        assert_eq!(out, [-1.0, -0.5, 0.0, 0.5, 1.0, 0.5, 0.0, -0.5]);
    }

    #[test]
    fn test_triangle_phasor_peak_signal_and_bounds() {
        let mut tri = TrianglePhasor::new(2000.0).with_range(0.0, 4.0);
        tri.configure(8000.0).unwrap();
        let peak = [0.25; 4];
        let mut out = [0.0; 4];
        tri.process(None, Some(&peak), &mut out);
        // Phases 0, .25, .5, .75 against a peak at .25.
        assert_eq!(out[0], 0.0);
        assert_eq!(out[1], 4.0);
        assert!((out[2] - 8.0 / 3.0).abs() < 1e-6);
        assert!((out[3] - 4.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_triangle_phasor_parameters() {
        let mut tri = TrianglePhasor::new(100.0);
        tri.set_parameter(Param::Peak, 1.5).unwrap();
        assert_eq!(tri.peak(), 1.0);
        tri.set_parameter(Param::Low, -0.5).unwrap();
        tri.set_parameter(Param::High, 0.5).unwrap();
        assert_eq!(tri.range().range(), 1.0);
        assert!(tri.set_parameter(Param::Threshold, 0.5).is_err());
        assert!(tri.set_parameter(Param::Low, f32::INFINITY).is_err());
    }
}
