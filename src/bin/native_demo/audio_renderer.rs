//! Renderer seam between the playback host and the patch it plays.

/// Anything that can fill a stereo block on the audio thread.
pub trait AudioRenderer: Send + 'static {
    fn process_block(&mut self, output_left: &mut [f32], output_right: &mut [f32]);
}
