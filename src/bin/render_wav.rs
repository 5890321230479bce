//! Renders the fold sweep demo patch to a stereo 32-bit float WAV file.
//!
//! Usage: `render_wav [output.wav] [seconds]`

#[path = "native_demo/fold_sweep.rs"]
mod fold_sweep;

use anyhow::Context;
use fold_sweep::FoldSweep;
use table_oscillators::WavetableStore;

const SAMPLE_RATE: u32 = 48_000;
const BLOCK_SIZE: usize = 128;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let path = args.next().unwrap_or_else(|| "fold_sweep.wav".to_string());
    let seconds: f32 = match args.next() {
        Some(value) => value
            .parse()
            .with_context(|| format!("invalid duration '{}'", value))?,
        None => 8.0,
    };
    if !(seconds.is_finite() && seconds > 0.0) {
        anyhow::bail!("duration must be a positive number of seconds");
    }

    let store = WavetableStore::global();
    let mut patch = FoldSweep::new(&store, SAMPLE_RATE as f32, BLOCK_SIZE)
        .context("failed to build the fold sweep patch")?;

    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&path, spec)
        .with_context(|| format!("failed to create {}", path))?;

    let total_frames = (seconds * SAMPLE_RATE as f32) as usize;
    let mut left = vec![0.0f32; BLOCK_SIZE];
    let mut right = vec![0.0f32; BLOCK_SIZE];
    let mut peak = 0.0f32;

    let mut rendered = 0;
    while rendered < total_frames {
        let frames = (total_frames - rendered).min(BLOCK_SIZE);
        patch.process_block(&mut left[..frames], &mut right[..frames]);
        for (&l, &r) in left[..frames].iter().zip(&right[..frames]) {
            peak = peak.max(l.abs()).max(r.abs());
            writer.write_sample(l)?;
            writer.write_sample(r)?;
        }
        rendered += frames;
    }
    writer.finalize().context("failed to finalize WAV file")?;

    tracing::info!(path = %path, frames = total_frames, peak, "rendered fold sweep");
    Ok(())
}
