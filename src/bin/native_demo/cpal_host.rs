//! CPAL playback host: device selection, stream setup and sample format
//! conversion. The renderer always sees fixed-size blocks; the carry buffer
//! absorbs whatever callback size the device uses.

use anyhow::Context;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleFormat, SizedSample, StreamConfig, SupportedBufferSize};
use dasp_sample::FromSample;

use crate::audio_buffer::AudioBuffer;
use crate::audio_renderer::AudioRenderer;

const JACK_HOST_BUFFER: usize = 512;
const ALSA_HOST_BUFFER: usize = 1024;
const DEFAULT_HOST_BUFFER: usize = 512;

/// Block size handed to the renderer, independent of the device buffer.
const ENGINE_BLOCK_SIZE: usize = 256;

const PREFERRED_SAMPLE_RATE: u32 = 48_000;

#[derive(Debug, Clone)]
pub struct AudioHostConfig {
    pub sample_rate: f32,
    pub channels: u16,
    pub block_size: usize,
    pub device_name: String,
    pub host_name: String,
}

struct SelectedDevice {
    device: cpal::Device,
    config: StreamConfig,
    sample_format: SampleFormat,
    host_name: String,
}

pub struct AudioHost {
    _stream: cpal::Stream,
    config: AudioHostConfig,
}

impl AudioHost {
    /// Opens the first usable output device and starts playing. The factory
    /// receives `(sample_rate, block_size)` once the device is known.
    pub fn new<R, F>(factory: F) -> anyhow::Result<Self>
    where
        R: AudioRenderer,
        F: FnOnce(f32, usize) -> anyhow::Result<R>,
    {
        let SelectedDevice {
            device,
            config,
            sample_format,
            host_name,
        } = select_output_device()?;

        let sample_rate = config.sample_rate.0 as f32;
        let device_name = device
            .name()
            .unwrap_or_else(|_| "Unknown device".to_string());

        let renderer = factory(sample_rate, ENGINE_BLOCK_SIZE).context("failed to build renderer")?;
        let buffer = AudioBuffer::new(renderer, ENGINE_BLOCK_SIZE);

        let stream = match sample_format {
            SampleFormat::F32 => build_stream::<f32, R>(&device, &config, buffer)?,
            SampleFormat::I16 => build_stream::<i16, R>(&device, &config, buffer)?,
            SampleFormat::U16 => build_stream::<u16, R>(&device, &config, buffer)?,
            other => anyhow::bail!("unsupported sample format: {:?}", other),
        };
        stream.play().context("failed to start stream")?;

        tracing::info!(
            host = %host_name,
            device = %device_name,
            sample_rate,
            channels = config.channels,
            buffer = ?config.buffer_size,
            block_size = ENGINE_BLOCK_SIZE,
            "playing"
        );

        Ok(Self {
            _stream: stream,
            config: AudioHostConfig {
                sample_rate,
                channels: config.channels,
                block_size: ENGINE_BLOCK_SIZE,
                device_name,
                host_name,
            },
        })
    }

    pub fn config(&self) -> &AudioHostConfig {
        &self.config
    }
}

fn select_output_device() -> anyhow::Result<SelectedDevice> {
    let mut last_error: Option<anyhow::Error> = None;

    for host_id in cpal::available_hosts() {
        let host = cpal::host_from_id(host_id)?;
        let host_name = host_id.name().to_string();

        let Some(device) = host.default_output_device() else {
            last_error = Some(anyhow::anyhow!(
                "host {} has no default output device",
                host_name
            ));
            continue;
        };

        match device.supported_output_configs() {
            Ok(configs) => {
                for supported in configs {
                    let sample_format = supported.sample_format();
                    if !matches!(
                        sample_format,
                        SampleFormat::F32 | SampleFormat::I16 | SampleFormat::U16
                    ) {
                        continue;
                    }
                    if supported.min_sample_rate().0 <= PREFERRED_SAMPLE_RATE
                        && supported.max_sample_rate().0 >= PREFERRED_SAMPLE_RATE
                    {
                        let supported =
                            supported.with_sample_rate(cpal::SampleRate(PREFERRED_SAMPLE_RATE));
                        let mut config = supported.config();
                        config.buffer_size = choose_buffer_size(supported.buffer_size(), &host_name);
                        return Ok(SelectedDevice {
                            device,
                            config,
                            sample_format,
                            host_name,
                        });
                    }
                }
            }
            Err(err) => {
                last_error = Some(anyhow::anyhow!(
                    "failed to enumerate output configs for host {}: {}",
                    host_name,
                    err
                ));
            }
        }

        match device.default_output_config() {
            Ok(supported) => {
                let sample_format = supported.sample_format();
                let mut config = supported.config();
                config.buffer_size = choose_buffer_size(supported.buffer_size(), &host_name);
                tracing::warn!(
                    sample_rate = config.sample_rate.0,
                    preferred = PREFERRED_SAMPLE_RATE,
                    "preferred sample rate unavailable, using device default"
                );
                return Ok(SelectedDevice {
                    device,
                    config,
                    sample_format,
                    host_name,
                });
            }
            Err(err) => {
                last_error = Some(anyhow::anyhow!(
                    "failed to query default output config for host {}: {}",
                    host_name,
                    err
                ));
            }
        }
    }

    Err(last_error.unwrap_or_else(|| anyhow::anyhow!("no usable output device found")))
}

fn choose_buffer_size(supported: &SupportedBufferSize, host_name: &str) -> BufferSize {
    let preferred = match host_name {
        "JACK" => JACK_HOST_BUFFER,
        "ALSA" => ALSA_HOST_BUFFER,
        _ => DEFAULT_HOST_BUFFER,
    } as u32;

    match *supported {
        // JACK picks its own period size and may change it at runtime.
        SupportedBufferSize::Range { .. } if host_name == "JACK" => BufferSize::Default,
        SupportedBufferSize::Range { min, max } => BufferSize::Fixed(preferred.clamp(min, max)),
        SupportedBufferSize::Unknown => BufferSize::Fixed(preferred),
    }
}

fn build_stream<T, R>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut buffer: AudioBuffer<R>,
) -> anyhow::Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
    R: AudioRenderer,
{
    let channels = config.channels as usize;
    let mut error_reported = false;

    let stream = device
        .build_output_stream(
            config,
            move |data: &mut [T], _| {
                if let Err(err) = process_cpal_callback(data, channels, &mut buffer) {
                    if !error_reported {
                        tracing::error!("audio callback error: {}", err);
                        error_reported = true;
                    }
                }
            },
            |err| tracing::error!("stream error: {}", err),
            None,
        )
        .context("failed to build stream")?;

    Ok(stream)
}

fn process_cpal_callback<T, R>(
    output: &mut [T],
    channels: usize,
    buffer: &mut AudioBuffer<R>,
) -> Result<(), &'static str>
where
    T: SizedSample + FromSample<f32>,
    R: AudioRenderer,
{
    if channels == 0 {
        return Err("no output channels available");
    }
    if output.len() % channels != 0 {
        return Err("output buffer length not divisible by channel count");
    }

    buffer.call_count += 1;
    if buffer.call_count % 1000 == 0 {
        tracing::trace!(calls = buffer.call_count, "processing");
    }
    let frames = output.len() / channels;
    buffer.fill_frames(frames, channels, |frame, ch, value| {
        output[frame * channels + ch] = T::from_sample_(value);
    });
    Ok(())
}
