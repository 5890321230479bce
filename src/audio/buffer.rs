/// A per-sample control input that falls back to a fixed value when the
/// signal is not connected or shorter than the block.
#[derive(Debug, Clone, Copy)]
pub struct AudioInput<'a> {
    buffer: Option<&'a [f32]>,
    default_value: f32,
}

impl<'a> AudioInput<'a> {
    pub fn new(buffer: Option<&'a [f32]>, default_value: f32) -> Self {
        Self {
            buffer,
            default_value,
        }
    }

    /// An unconnected input that always reads `value`.
    pub fn constant(value: f32) -> Self {
        Self::new(None, value)
    }

    pub fn signal(buffer: &'a [f32]) -> Self {
        Self::new(Some(buffer), 0.0)
    }

    #[inline(always)]
    pub fn get(&self, index: usize) -> f32 {
        self.buffer
            .and_then(|b| b.get(index))
            .copied()
            .unwrap_or(self.default_value)
    }

    pub fn is_connected(&self) -> bool {
        self.buffer.is_some()
    }

    /// Replaces the fallback value, keeping the signal (if any).
    pub fn with_default(self, default_value: f32) -> Self {
        Self {
            buffer: self.buffer,
            default_value,
        }
    }
}

impl Default for AudioInput<'_> {
    fn default() -> Self {
        Self::constant(0.0)
    }
}
