// src/traits/mod.rs
use std::any::Any;
use std::fmt;
use std::str::FromStr;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::OscillatorError;

/// Signal ports a node can expose to its host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortId {
    Frequency,
    Phase,
    Peak,
    Threshold,
    Softness,
    AudioOutput0,
}

impl PortId {
    pub fn is_audio_output(&self) -> bool {
        matches!(self, PortId::AudioOutput0)
    }

    pub fn is_control_input(&self) -> bool {
        !self.is_audio_output()
    }

    /// The parameter whose value is used when this input is not connected.
    pub fn default_param(&self) -> Option<Param> {
        match self {
            PortId::Frequency => Some(Param::Frequency),
            PortId::Peak => Some(Param::Peak),
            PortId::Threshold => Some(Param::Threshold),
            PortId::Softness => Some(Param::Softness),
            PortId::Phase | PortId::AudioOutput0 => None,
        }
    }
}

/// Block-rate parameters, set between blocks through `AudioNode::set_parameter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Param {
    /// Frequency in Hz used when no frequency signal is connected.
    Frequency,
    /// Peak position of the triangle, as a fraction of the cycle.
    Peak,
    /// Fold threshold used when no threshold signal is connected.
    Threshold,
    /// Width of the soft-fold transition band, relative to the threshold.
    Softness,
    /// Lower output bound of the triangle.
    Low,
    /// Upper output bound of the triangle.
    High,
    /// Resets the running phase (in cycles).
    Phase,
}

impl Param {
    pub fn name(&self) -> &'static str {
        match self {
            Param::Frequency => "frequency",
            Param::Peak => "peak",
            Param::Threshold => "threshold",
            Param::Softness => "softness",
            Param::Low => "lo",
            Param::High => "hi",
            Param::Phase => "phase",
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Param {
    type Err = OscillatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "frequency" | "freq" => Ok(Param::Frequency),
            "peak" => Ok(Param::Peak),
            "threshold" => Ok(Param::Threshold),
            "softness" => Ok(Param::Softness),
            "lo" | "low" => Ok(Param::Low),
            "hi" | "high" => Ok(Param::High),
            "phase" => Ok(Param::Phase),
            other => Err(OscillatorError::UnknownParameter {
                name: other.to_string(),
            }),
        }
    }
}

/// Host-facing seam. Everything behind it is plain block processing over
/// caller-owned slices; nothing here allocates on the audio thread except
/// `get_ports`, which hosts call while wiring.
pub trait AudioNode: Any {
    /// Ports exposed by the node, `true` marking outputs.
    fn get_ports(&self) -> FxHashMap<PortId, bool>;

    fn process(
        &mut self,
        inputs: &FxHashMap<PortId, &[f32]>,
        outputs: &mut FxHashMap<PortId, &mut [f32]>,
        buffer_size: usize,
    );

    /// Applies a new sample rate; the change takes effect at the next block.
    fn configure(&mut self, sample_rate: f32) -> Result<(), OscillatorError>;

    fn set_parameter(&mut self, param: Param, value: f32) -> Result<(), OscillatorError>;

    /// Looks the parameter up by name before applying it.
    fn set_parameter_by_name(&mut self, name: &str, value: f32) -> Result<(), OscillatorError> {
        let param = name.parse::<Param>()?;
        self.set_parameter(param, value)
    }

    fn reset(&mut self);

    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn as_any(&self) -> &dyn Any;

    fn is_active(&self) -> bool;

    fn node_type(&self) -> &'static str;
}
