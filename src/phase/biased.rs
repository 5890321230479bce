//! Phase accumulation on a biased `f64`.
//!
//! Adding `3·2^19` to a phase in `(-2^19, 2^19)` pins the exponent of the
//! sum, so the mantissa bit with place value 1 always lands on bit 32 of the
//! IEEE-754 pattern. The integer part of the phase can then be read straight
//! out of the high 32-bit word, and the fraction recovered by overwriting
//! that word with the high word of the bias. No branch, division or modulo
//! is involved.
//!
//! Folding back into `[0, size)` reuses the same split: the masked index
//! plus the isolated fraction, re-biased. Both parts are exact, so a fold
//! never moves the phase.
//!
//! `to_bits`/`from_bits` work on the numeric bit pattern, so the "high word"
//! here is the same on little- and big-endian hosts.

use super::{range::wrap_range, TablePosition};

/// `3·2^19`: bit 32 of the sum has place value 1.
pub const UNITBIT32: f64 = 1_572_864.0;

/// Phases must stay strictly inside `±2^19` while biased.
const BIASED_PHASE_LIMIT: f64 = 524_288.0;

#[inline(always)]
pub fn high_word(value: f64) -> u32 {
    (value.to_bits() >> 32) as u32
}

#[inline(always)]
pub fn with_high_word(value: f64, high: u32) -> f64 {
    f64::from_bits((u64::from(high) << 32) | (value.to_bits() & 0xFFFF_FFFF))
}

/// Number of steps of at most `size / 2` that can be taken from a phase in
/// `[0, size)` before the biased value could leave its binade.
pub(crate) fn max_run_len(size: f64) -> usize {
    let headroom = BIASED_PHASE_LIMIT - size;
    ((headroom / (size * 0.5)).floor() as usize)
        .saturating_sub(1)
        .max(1)
}

#[derive(Debug, Clone)]
pub struct BiasedPhase {
    /// `phase + UNITBIT32`, unwrapped since the last fold.
    biased: f64,
    size: f64,
    mask: u32,
    unit_high: u32,
    run_len: usize,
    since_fold: usize,
}

impl BiasedPhase {
    pub(crate) fn new(size: usize) -> Self {
        let size_f = size as f64;
        Self {
            biased: UNITBIT32,
            size: size_f,
            mask: (size - 1) as u32,
            unit_high: high_word(UNITBIT32),
            run_len: max_run_len(size_f),
            since_fold: 0,
        }
    }

    #[inline(always)]
    pub fn position(&self) -> TablePosition {
        TablePosition {
            index: (high_word(self.biased) & self.mask) as usize,
            frac: with_high_word(self.biased, self.unit_high) - UNITBIT32,
        }
    }

    /// Steps larger than half the table size drop their whole periods and
    /// are taken between two folds; the engine never produces them since
    /// frequencies are limited to Nyquist.
    #[inline(always)]
    pub fn advance(&mut self, increment: f64) {
        if increment.abs() > self.size * 0.5 {
            self.advance_large(increment);
            return;
        }
        self.biased += increment;
        self.since_fold += 1;
        if self.since_fold >= self.run_len {
            self.fold();
        }
    }

    #[cold]
    fn advance_large(&mut self, increment: f64) {
        self.fold();
        // `%` on f64 is exact, and the remainder is below one period.
        self.biased += increment % self.size;
        self.fold();
    }

    /// Folds the accumulated phase back into `[0, size)`.
    pub fn finish_block(&mut self) {
        self.fold();
    }

    pub fn phase(&self) -> f64 {
        self.folded()
    }

    pub fn set_phase(&mut self, phase: f64) {
        let phase = if phase.is_finite() { phase } else { 0.0 };
        self.biased = wrap_range(phase.rem_euclid(self.size), self.size) + UNITBIT32;
        self.since_fold = 0;
    }

    #[inline(always)]
    fn fold(&mut self) {
        self.biased = self.folded() + UNITBIT32;
        self.since_fold = 0;
    }

    #[inline(always)]
    fn folded(&self) -> f64 {
        let pos = self.position();
        pos.index as f64 + pos.frac
    }
}
