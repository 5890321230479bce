// src/interpolation.rs
use serde::{Deserialize, Serialize};

use crate::phase::TablePosition;
use crate::wavetable::Wavetable;

/// Kernel used to read between table entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Interpolation {
    #[default]
    Linear,
    Cubic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Oversampling {
    #[default]
    None,
    /// Two half-step sub-samples per output sample, averaged.
    X2,
}

impl Oversampling {
    pub fn factor(&self) -> usize {
        match self {
            Oversampling::None => 1,
            Oversampling::X2 => 2,
        }
    }
}

/// A read of the table at a fractional position. Implementors are zero-sized
/// so the block loop can be monomorphised per kernel.
pub trait InterpolationKernel {
    fn read(table: &Wavetable, pos: TablePosition) -> f32;
}

pub struct Linear;
pub struct Cubic;

impl InterpolationKernel for Linear {
    #[inline(always)]
    fn read(table: &Wavetable, pos: TablePosition) -> f32 {
        linear(table, pos.index, pos.frac as f32)
    }
}

impl InterpolationKernel for Cubic {
    #[inline(always)]
    fn read(table: &Wavetable, pos: TablePosition) -> f32 {
        cubic(table, pos.index, pos.frac as f32)
    }
}

/// Two-point interpolation between `table[index]` and the entry after it.
/// Written as a weighted sum so both ends of the interval are exact.
#[inline(always)]
pub fn linear(table: &Wavetable, index: usize, frac: f32) -> f32 {
    let index = index & table.mask();
    let y0 = table.as_slice()[index];
    let y1 = table.next_after(index);
    y0 * (1.0 - frac) + y1 * frac
}

/// Four-point Catmull-Rom through `table[index - 1 ..= index + 2]`, indices
/// taken modulo the table size.
#[inline(always)]
pub fn cubic(table: &Wavetable, index: usize, mu: f32) -> f32 {
    let i = index as isize;
    let p0 = table.at(i - 1);
    let p1 = table.at(i);
    let p2 = table.at(i + 1);
    let p3 = table.at(i + 2);
    let a = -0.5 * p0 + 1.5 * p1 - 1.5 * p2 + 0.5 * p3;
    let b = p0 - 2.5 * p1 + 2.0 * p2 - 0.5 * p3;
    let c = -0.5 * p0 + 0.5 * p2;
    let d = p1;
    ((a * mu + b) * mu + c) * mu + d
}
