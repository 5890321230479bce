use super::TablePosition;

/// Phase kept directly in `[0, size)`, wrapped after every step by
/// repeated subtraction/addition of the table size.
#[derive(Debug, Clone)]
pub struct RangeReducedPhase {
    phase: f64,
    size: f64,
    mask: usize,
}

impl RangeReducedPhase {
    pub(crate) fn new(size: usize) -> Self {
        Self {
            phase: 0.0,
            size: size as f64,
            mask: size - 1,
        }
    }

    #[inline(always)]
    pub fn position(&self) -> TablePosition {
        let whole = self.phase.floor();
        TablePosition {
            index: (whole as i64 as usize) & self.mask,
            frac: self.phase - whole,
        }
    }

    #[inline(always)]
    pub fn advance(&mut self, increment: f64) {
        self.phase = wrap_range(self.phase + increment, self.size);
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn set_phase(&mut self, phase: f64) {
        let phase = if phase.is_finite() { phase } else { 0.0 };
        // rem_euclid first so a far-away reset does not loop for long.
        self.phase = wrap_range(phase.rem_euclid(self.size), self.size);
    }
}

/// Brings `phase` into `[0, size)`. Cost grows with the distance from the
/// range, which is at most one step for increments below the table size.
#[inline(always)]
pub fn wrap_range(mut phase: f64, size: f64) -> f64 {
    while phase >= size {
        phase -= size;
    }
    while phase < 0.0 {
        phase += size;
    }
    // A tiny negative phase plus `size` can round up to `size` itself.
    if phase >= size {
        0.0
    } else {
        phase
    }
}
