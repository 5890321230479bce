mod audio_buffer;
mod audio_renderer;
mod cpal_host;
mod fold_sweep;

use std::time::Duration;

use audio_renderer::AudioRenderer;
use cpal_host::AudioHost;
use fold_sweep::FoldSweep;
use table_oscillators::WavetableStore;

impl AudioRenderer for FoldSweep {
    fn process_block(&mut self, output_left: &mut [f32], output_right: &mut [f32]) {
        FoldSweep::process_block(self, output_left, output_right);
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let store = WavetableStore::global();
    let host = AudioHost::new(|sample_rate, block_size| {
        Ok(FoldSweep::new(&store, sample_rate, block_size)?)
    })?;

    let config = host.config();
    tracing::info!(
        host = %config.host_name,
        device = %config.device_name,
        sample_rate = config.sample_rate,
        channels = config.channels,
        block_size = config.block_size,
        "fold sweep running, press Ctrl+C to stop"
    );

    loop {
        std::thread::sleep(Duration::from_secs(1));
    }
}
