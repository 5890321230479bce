//! Carry buffer between the renderer's fixed block size and whatever frame
//! count the device callback asks for.

use crate::audio_renderer::AudioRenderer;

pub(crate) struct AudioBuffer<R: AudioRenderer> {
    pub(crate) renderer: R,
    pub(crate) engine_block_size: usize,
    pub(crate) carry_left: Vec<f32>,
    pub(crate) carry_right: Vec<f32>,
    pub(crate) carry_available: usize,
    pub(crate) carry_index: usize,
    pub(crate) call_count: usize,
}

impl<R: AudioRenderer> AudioBuffer<R> {
    pub(crate) fn new(renderer: R, engine_block_size: usize) -> Self {
        let engine_block_size = engine_block_size.max(1);

        Self {
            renderer,
            engine_block_size,
            carry_left: vec![0.0; engine_block_size],
            carry_right: vec![0.0; engine_block_size],
            carry_available: 0,
            carry_index: 0,
            call_count: 0,
        }
    }

    /// Writes `frames` interleaved frames through `write(frame, channel, value)`,
    /// rendering new blocks whenever the carry runs dry.
    pub(crate) fn fill_frames(
        &mut self,
        frames: usize,
        channels: usize,
        mut write: impl FnMut(usize, usize, f32),
    ) {
        let mut frames_written = 0;

        while frames_written < frames {
            if self.carry_available == 0 {
                self.carry_left.fill(0.0);
                self.carry_right.fill(0.0);
                self.renderer
                    .process_block(&mut self.carry_left, &mut self.carry_right);
                self.carry_index = 0;
                self.carry_available = self.engine_block_size;
                continue;
            }

            let frames_to_copy = (frames - frames_written).min(self.carry_available);
            for i in 0..frames_to_copy {
                let carry_pos = self.carry_index + i;
                for ch in 0..channels {
                    let value = match ch {
                        0 => self.carry_left[carry_pos],
                        1 => self.carry_right[carry_pos],
                        _ => 0.0,
                    };
                    write(frames_written + i, ch, value);
                }
            }

            frames_written += frames_to_copy;
            self.carry_index += frames_to_copy;
            self.carry_available -= frames_to_copy;
        }
    }
}
