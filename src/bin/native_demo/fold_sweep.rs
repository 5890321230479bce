//! The demo patch shared by the offline renderer and the native player: a
//! folding oscillator whose pitch and fold threshold are swept by two slow
//! triangle phasors.

use std::sync::Arc;

use table_oscillators::{
    BlockInputs, EngineConfig, OscillatorEngine, OscillatorError, Param, TrianglePhasor,
    WavetableStore,
};

const OUTPUT_GAIN: f32 = 0.5;

pub struct FoldSweep {
    oscillator: OscillatorEngine,
    pitch: TrianglePhasor,
    fold: TrianglePhasor,
    frequency: Vec<f32>,
    threshold: Vec<f32>,
    mono: Vec<f32>,
}

impl FoldSweep {
    pub fn new(
        store: &Arc<WavetableStore>,
        sample_rate: f32,
        block_size: usize,
    ) -> Result<Self, OscillatorError> {
        let block_size = block_size.max(1);

        let mut oscillator = OscillatorEngine::new(store, EngineConfig::folding(), 110.0)?;
        oscillator.configure(sample_rate)?;
        oscillator.set_parameter(Param::Softness, 0.3)?;

        // One pitch sweep every 8 seconds, one fold sweep every 2.
        let mut pitch = TrianglePhasor::new(0.125).with_range(55.0, 440.0);
        pitch.configure(sample_rate)?;
        let mut fold = TrianglePhasor::new(0.5)
            .with_range(0.15, 0.9)
            .with_peak(0.8);
        fold.configure(sample_rate)?;

        if oscillator.is_silent() {
            tracing::warn!("fold sweep has no wavetable and will render silence");
        }

        Ok(Self {
            oscillator,
            pitch,
            fold,
            frequency: vec![0.0; block_size],
            threshold: vec![0.0; block_size],
            mono: vec![0.0; block_size],
        })
    }

    pub fn process_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        let frames = left.len().min(right.len());
        let block_size = self.mono.len();

        let mut start = 0;
        while start < frames {
            let n = (frames - start).min(block_size);

            self.pitch.process(None, None, &mut self.frequency[..n]);
            self.fold.process(None, None, &mut self.threshold[..n]);
            let inputs =
                BlockInputs::with_frequency(&self.frequency[..n]).threshold(&self.threshold[..n]);
            self.oscillator.process(&inputs, &mut self.mono[..n]);

            for (i, &sample) in self.mono[..n].iter().enumerate() {
                left[start + i] = sample * OUTPUT_GAIN;
                right[start + i] = sample * OUTPUT_GAIN;
            }
            start += n;
        }
    }
}
