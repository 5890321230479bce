// src/shaping.rs
//! Stateless per-sample waveshaping: wave folding and the variable-peak
//! triangle remap.

use serde::{Deserialize, Serialize};

/// Post-processing applied to each raw oscillator sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Shaping {
    #[default]
    None,
    /// Soft fold driven by the threshold and softness inputs. A softness of
    /// zero gives a plain hard fold.
    Fold,
}

pub const DEFAULT_THRESHOLD: f32 = 0.5;
pub const DEFAULT_SOFTNESS: f32 = 0.0;

/// Reflects `x` back into `[-threshold, threshold]` as many times as needed.
///
/// In-range input comes back bit-identical. A single overshoot is reflected
/// directly; anything further out goes through the equivalent closed form,
/// which folds along a triangle of period `4·threshold`. A threshold that is
/// not strictly positive folds everything to zero.
#[inline(always)]
pub fn hard_fold(x: f32, threshold: f32) -> f32 {
    if !(threshold > 0.0) || !x.is_finite() {
        return 0.0;
    }
    if x.abs() <= threshold {
        return x;
    }
    if x.abs() <= 3.0 * threshold {
        let reflected = if x > 0.0 {
            2.0 * threshold - x
        } else {
            -2.0 * threshold - x
        };
        return reflected.clamp(-threshold, threshold);
    }
    let y = (x + threshold).rem_euclid(4.0 * threshold);
    let folded = if y < 2.0 * threshold {
        y - threshold
    } else {
        3.0 * threshold - y
    };
    folded.clamp(-threshold, threshold)
}

/// Hard fold with a smoothed entry into the first reflection.
///
/// Within `softness · threshold` beyond the threshold the output blends from
/// the unfolded to the folded value with a smoothstep weight, so the slope is
/// continuous where the fold starts. Outside that band it is `hard_fold`.
#[inline(always)]
pub fn soft_fold(x: f32, threshold: f32, softness: f32) -> f32 {
    let folded = hard_fold(x, threshold);
    let width = softness * threshold;
    let overshoot = x.abs() - threshold;
    if overshoot > 0.0 && overshoot < width {
        let s = smoothstep(overshoot / width);
        x + (folded - x) * s
    } else {
        folded
    }
}

/// `3u² − 2u³` for `u` in `[0, 1]`.
#[inline(always)]
pub fn smoothstep(u: f32) -> f32 {
    let u = u.clamp(0.0, 1.0);
    u * u * (3.0 - 2.0 * u)
}

/// Brings an arbitrary phase signal into the unit cycle: negative values are
/// lifted by whole cycles (a negative integer lands on 1), values above 1 keep
/// their fractional part, and `[0, 1]` passes through.
#[inline(always)]
pub fn wrap_unit_phase(phase: f32) -> f32 {
    if !phase.is_finite() {
        0.0
    } else if phase < 0.0 {
        phase - phase.trunc() + 1.0
    } else if phase > 1.0 {
        phase - phase.trunc()
    } else {
        phase
    }
}

/// Rising ramp up to `peak`, falling ramp after it; result in `[0, 1]`.
/// `peak` is clamped to `[0, 1]`; with `peak = 1` the falling branch is only
/// reached at `phase = 1` and yields 0.
#[inline(always)]
pub fn triangle_fraction(phase: f32, peak: f32) -> f32 {
    let peak = if peak.is_nan() { 0.5 } else { peak.clamp(0.0, 1.0) };
    if phase < peak {
        phase / peak
    } else if peak < 1.0 {
        (1.0 - phase) / (1.0 - peak)
    } else {
        0.0
    }
}

/// Output bounds of a triangle remap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TriangleRange {
    pub lo: f32,
    pub hi: f32,
}

impl TriangleRange {
    pub fn new(lo: f32, hi: f32) -> Self {
        Self { lo, hi }
    }

    pub fn range(&self) -> f32 {
        self.hi - self.lo
    }

    /// `lo + triangle_fraction(wrap_unit_phase(phase), peak) · (hi − lo)`.
    #[inline(always)]
    pub fn remap(&self, phase: f32, peak: f32) -> f32 {
        self.lo + triangle_fraction(wrap_unit_phase(phase), peak) * self.range()
    }
}

impl Default for TriangleRange {
    fn default() -> Self {
        Self::new(-1.0, 1.0)
    }
}

/// Triangle remap of one sample into `[lo, hi]`.
#[inline(always)]
pub fn triangle_remap(phase: f32, peak: f32, lo: f32, hi: f32) -> f32 {
    TriangleRange::new(lo, hi).remap(phase, peak)
}
