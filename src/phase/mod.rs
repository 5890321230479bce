// src/phase/mod.rs
mod biased;
mod range;

pub use biased::{high_word, with_high_word, BiasedPhase, UNITBIT32};
pub use range::{wrap_range, RangeReducedPhase};

use serde::{Deserialize, Serialize};

use crate::wavetable::MAX_TABLE_SIZE;
use crate::OscillatorError;

/// How the running phase is brought back into `[0, size)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WrapStrategy {
    /// Repeated subtraction/addition of the table size after every step.
    #[default]
    RangeReduce,
    /// Bias the phase by `3·2^19` and read index/fraction from the bit
    /// pattern; fold back into range at block end.
    BiasedDouble,
}

/// Integer table index (already reduced modulo the table size) and the
/// fractional offset towards the next entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TablePosition {
    pub index: usize,
    pub frac: f64,
}

impl TablePosition {
    /// Position as a single value in `[0, size)`.
    pub fn value(&self) -> f64 {
        self.index as f64 + self.frac
    }
}

#[derive(Debug, Clone)]
pub enum PhaseAccumulator {
    RangeReduced(RangeReducedPhase),
    Biased(BiasedPhase),
}

impl PhaseAccumulator {
    /// `size` is the length of one cycle in phase units: the table size for
    /// oscillators, 1 for phasors. Must be a power of two.
    pub fn new(strategy: WrapStrategy, size: usize) -> Result<Self, OscillatorError> {
        if !size.is_power_of_two() || size > MAX_TABLE_SIZE {
            return Err(OscillatorError::InvalidTableSize { size });
        }
        Ok(match strategy {
            WrapStrategy::RangeReduce => PhaseAccumulator::RangeReduced(RangeReducedPhase::new(size)),
            WrapStrategy::BiasedDouble => PhaseAccumulator::Biased(BiasedPhase::new(size)),
        })
    }

    /// Accumulator over a single unit cycle, as used by phasors.
    pub fn unit(strategy: WrapStrategy) -> Self {
        match strategy {
            WrapStrategy::RangeReduce => PhaseAccumulator::RangeReduced(RangeReducedPhase::new(1)),
            WrapStrategy::BiasedDouble => PhaseAccumulator::Biased(BiasedPhase::new(1)),
        }
    }

    pub fn strategy(&self) -> WrapStrategy {
        match self {
            PhaseAccumulator::RangeReduced(_) => WrapStrategy::RangeReduce,
            PhaseAccumulator::Biased(_) => WrapStrategy::BiasedDouble,
        }
    }

    /// Table position of the current phase.
    #[inline(always)]
    pub fn position(&self) -> TablePosition {
        match self {
            PhaseAccumulator::RangeReduced(p) => p.position(),
            PhaseAccumulator::Biased(p) => p.position(),
        }
    }

    #[inline(always)]
    pub fn advance(&mut self, increment: f64) {
        match self {
            PhaseAccumulator::RangeReduced(p) => p.advance(increment),
            PhaseAccumulator::Biased(p) => p.advance(increment),
        }
    }

    /// Called once after the last sample of a block.
    #[inline(always)]
    pub fn finish_block(&mut self) {
        if let PhaseAccumulator::Biased(p) = self {
            p.finish_block();
        }
    }

    /// Current phase in `[0, size)`.
    pub fn phase(&self) -> f64 {
        match self {
            PhaseAccumulator::RangeReduced(p) => p.phase(),
            PhaseAccumulator::Biased(p) => p.phase(),
        }
    }

    pub fn set_phase(&mut self, phase: f64) {
        match self {
            PhaseAccumulator::RangeReduced(p) => p.set_phase(phase),
            PhaseAccumulator::Biased(p) => p.set_phase(phase),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const STRATEGIES: [WrapStrategy; 2] = [WrapStrategy::RangeReduce, WrapStrategy::BiasedDouble];

    fn circular_distance(a: f64, b: f64, size: f64) -> f64 {
        let d = (a - b).rem_euclid(size);
        d.min(size - d)
    }

    #[test]
    fn test_one_period_returns_to_start() {
        let size = 4096usize;
        for strategy in STRATEGIES {
            for &(start, samples) in &[(0.0, 100usize), (1234.5, 441), (4095.9, 37)] {
                let mut acc = PhaseAccumulator::new(strategy, size).unwrap();
                acc.set_phase(start);
                let increment = size as f64 / samples as f64;
                for i in 0..samples {
                    acc.advance(increment);
                    if i % 64 == 63 {
                        acc.finish_block();
                    }
                }
                acc.finish_block();
                assert!(
                    circular_distance(acc.phase(), start, size as f64) < 1e-6,
                    "{:?} drifted from {} to {}",
                    strategy,
                    start,
                    acc.phase()
                );
            }
        }
    }

    #[test]
    fn test_strategies_agree_over_ten_thousand_samples() {
        let size = 16384usize;
        let sample_rate = 48_000.0f64;
        let scale = size as f64 / sample_rate;
        let block = 64;

        let mut rng = StdRng::seed_from_u64(7);
        let mut reference = PhaseAccumulator::new(WrapStrategy::RangeReduce, size).unwrap();
        let mut biased = PhaseAccumulator::new(WrapStrategy::BiasedDouble, size).unwrap();

        for i in 0..10_000 {
            // Audio-rate FM around 440 Hz, occasionally swinging negative.
            let freq: f64 = 440.0 + rng.random_range(-900.0..900.0);
            let a = reference.position();
            let b = biased.position();
            assert!(
                circular_distance(a.value(), b.value(), size as f64) <= 1e-5 * size as f64,
                "sample {}: {:?} vs {:?}",
                i,
                a,
                b
            );

            reference.advance(freq * scale);
            biased.advance(freq * scale);
            if i % block == block - 1 {
                reference.finish_block();
                biased.finish_block();
            }
        }
    }

    #[test]
    fn test_negative_frequency_runs_backwards() {
        for strategy in STRATEGIES {
            let mut acc = PhaseAccumulator::new(strategy, 1024).unwrap();
            acc.set_phase(1.0);
            acc.advance(-1.5);
            acc.finish_block();
            assert_eq!(acc.phase(), 1023.5, "{:?}", strategy);

            for _ in 0..1000 {
                acc.advance(-3.25);
            }
            acc.finish_block();
            let expected = (1023.5 - 3250.0f64).rem_euclid(1024.0);
            assert!((acc.phase() - expected).abs() < 1e-9, "{:?}", strategy);
        }
    }

    #[test]
    fn test_strategies_agree_on_steps_larger_than_half_the_table() {
        let size = 1024usize;
        let mut reference = PhaseAccumulator::new(WrapStrategy::RangeReduce, size).unwrap();
        let mut biased = PhaseAccumulator::new(WrapStrategy::BiasedDouble, size).unwrap();
        reference.advance(700.0);
        biased.advance(700.0);
        reference.finish_block();
        biased.finish_block();
        assert_eq!(reference.phase(), biased.phase());

        let mut rng = StdRng::seed_from_u64(5);
        for i in 0..5000 {
            let increment: f64 = rng.random_range(-3.0 * size as f64..3.0 * size as f64);
            reference.advance(increment);
            biased.advance(increment);
            let (a, b) = (reference.position(), biased.position());
            assert!(
                circular_distance(a.value(), b.value(), size as f64) < 1e-5,
                "step {} by {}: {:?} vs {:?}",
                i,
                increment,
                a,
                b
            );
        }
    }

    #[test]
    fn test_position_stays_in_table() {
        let mut rng = StdRng::seed_from_u64(11);
        for strategy in STRATEGIES {
            let mut acc = PhaseAccumulator::new(strategy, 256).unwrap();
            for _ in 0..5000 {
                acc.advance(rng.random_range(-128.0..128.0));
                let pos = acc.position();
                assert!(pos.index < 256);
                assert!((0.0..1.0).contains(&pos.frac));
            }
        }
    }

    #[test]
    fn test_rejects_non_power_of_two() {
        assert!(PhaseAccumulator::new(WrapStrategy::RangeReduce, 1000).is_err());
        assert!(PhaseAccumulator::new(WrapStrategy::BiasedDouble, 0).is_err());
        assert!(PhaseAccumulator::new(WrapStrategy::BiasedDouble, 1).is_ok());
    }
}
