// src/nodes/triangle.rs
use std::any::Any;

use rustc_hash::FxHashMap;

use super::DEFAULT_PEAK;
use crate::audio::AudioInput;
use crate::shaping::TriangleRange;
use crate::traits::{AudioNode, Param, PortId};
use crate::OscillatorError;

/// Maps an incoming phase signal to a triangle in `[lo, hi]`. Stateless: the
/// output depends only on the current phase and peak samples.
#[derive(Debug, Clone)]
pub struct TriangleShaper {
    peak: f32,
    range: TriangleRange,
}

impl Default for TriangleShaper {
    fn default() -> Self {
        Self::new(DEFAULT_PEAK)
    }
}

impl TriangleShaper {
    pub fn new(peak: f32) -> Self {
        Self {
            peak: if peak.is_finite() {
                peak.clamp(0.0, 1.0)
            } else {
                DEFAULT_PEAK
            },
            range: TriangleRange::default(),
        }
    }

    pub fn with_range(mut self, lo: f32, hi: f32) -> Self {
        self.range = TriangleRange::new(lo, hi);
        self
    }

    pub fn peak(&self) -> f32 {
        self.peak
    }

    pub fn range(&self) -> TriangleRange {
        self.range
    }

    /// A missing phase signal reads as phase 0.
    pub fn process(&self, phase: Option<&[f32]>, peak: Option<&[f32]>, output: &mut [f32]) {
        let phase = AudioInput::new(phase, 0.0);
        let peak = AudioInput::new(peak, self.peak);
        for (i, out) in output.iter_mut().enumerate() {
            *out = self.range.remap(phase.get(i), peak.get(i));
        }
    }
}

impl AudioNode for TriangleShaper {
    fn get_ports(&self) -> FxHashMap<PortId, bool> {
        let mut ports = FxHashMap::default();
        ports.insert(PortId::Phase, false);
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
            TriangleShaper::process(
                self,
                inputs.get(&PortId::Phase).copied(),
                inputs.get(&PortId::Peak).copied(),
                &mut output[..len],
            );
        }
    }

    // Stateless, so any rate is fine as long as it is a rate.
    fn configure(&mut self, sample_rate: f32) -> Result<(), OscillatorError> {
        super::validate_sample_rate(sample_rate)
    }

    fn set_parameter(&mut self, param: Param, value: f32) -> Result<(), OscillatorError> {
        if !value.is_finite() {
            return Err(OscillatorError::InvalidParameter { param, value });
        }
        match param {
            Param::Peak => self.peak = value.clamp(0.0, 1.0),
            Param::Low => self.range.lo = value,
            Param::High => self.range.hi = value,
            _ => {
                return Err(OscillatorError::UnsupportedParameter {
                    param,
                    node_type: self.node_type(),
                })
            }
        }
        Ok(())
    }

    fn reset(&mut self) {}

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
        "triangle"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shapes_external_phase() {
        let shaper = TriangleShaper::new(0.5);
        let phase = [0.0, 0.25, 0.5, 0.75, 1.0];
        let mut out = [0.0; 5];
        shaper.process(Some(&phase), None, &mut out);
        assert_eq!(out, [-1.0, 0.0, 1.0, 0.0, -1.0]);
    }

    #[test]
    fn test_out_of_range_phase_is_wrapped() {
        let shaper = TriangleShaper::new(0.5).with_range(0.0, 1.0);
        let phase = [-0.75, 1.25, 3.5, -2.0];
        let mut out = [0.0; 4];
        shaper.process(Some(&phase), None, &mut out);
        // -0.75 -> 0.25, 1.25 -> 0.25, 3.5 -> 0.5, -2.0 -> 1.0
        assert_eq!(out, [0.5, 0.5, 1.0, 0.0]);
    }

    #[test]
    fn test_per_sample_peak() {
        let shaper = TriangleShaper::default();
        let phase = [0.5, 0.5, 0.5];
        let peak = [0.5, 1.0, 0.0];
        let mut out = [0.0; 3];
        shaper.process(Some(&phase), Some(&peak), &mut out);
        assert_eq!(out, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_parameters_through_node_interface() {
        let mut shaper = TriangleShaper::default();
        shaper.set_parameter_by_name("lo", 2.0).unwrap();
        shaper.set_parameter_by_name("hi", 3.0).unwrap();
        shaper.set_parameter(Param::Peak, -1.0).unwrap();
        assert_eq!(shaper.peak(), 0.0);
        assert_eq!(shaper.range(), TriangleRange::new(2.0, 3.0));
        assert!(matches!(
            shaper.set_parameter(Param::Frequency, 1.0),
            Err(OscillatorError::UnsupportedParameter { .. })
        ));
        assert!(shaper.set_parameter_by_name("cutoff", 1.0).is_err());
    }
}
