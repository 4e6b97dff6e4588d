//! Physical output: renders a context into the default output device.

use crate::graph::AudioContext;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleFormat, SampleRate, Stream, StreamConfig};
use scenebox_core::{Result, SceneboxError};
use tracing::{error, info, trace};

/// A running output stream. Dropping it stops playback.
pub struct DeviceOutput {
    _stream: Stream,
    sample_rate: u32,
    channels: u16,
}

impl DeviceOutput {
    /// Open the default output device at the context's sample rate with the
    /// host's preferred buffer size.
    pub fn open(context: &AudioContext) -> Result<Self> {
        Self::open_with_buffer(context, BufferSize::Default)
    }

    /// Like [`open`](Self::open) but asks for `frames`-frame callbacks.
    pub fn open_with_block_size(context: &AudioContext, frames: u32) -> Result<Self> {
        Self::open_with_buffer(context, BufferSize::Fixed(frames))
    }

    fn open_with_buffer(context: &AudioContext, buffer_size: BufferSize) -> Result<Self> {
        let rate = context.sample_rate();
        let device = cpal::default_host()
            .default_output_device()
            .ok_or_else(|| SceneboxError::Device("no output device available".into()))?;
        let supported = device
            .supported_output_configs()
            .map_err(|e| SceneboxError::Device(e.to_string()))?
            .filter(|c| c.sample_format() == SampleFormat::F32)
            .find(|c| c.min_sample_rate().0 <= rate && rate <= c.max_sample_rate().0)
            .map(|c| c.with_sample_rate(SampleRate(rate)))
            .ok_or_else(|| {
                SceneboxError::Device(format!("output device has no f32 config at {rate} Hz"))
            })?;

        let mut config: StreamConfig = supported.config();
        config.buffer_size = buffer_size;
        let channels = config.channels;
        let width = channels as usize;
        let ctx = context.clone();

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                    let frames = data.len() / width;
                    match ctx.try_render(frames) {
                        Some(rendered) => {
                            let pairs = data.chunks_mut(width).zip(rendered.chunks_exact(2));
                            for (frame, src) in pairs {
                                frame[0] = src[0];
                                if width > 1 {
                                    frame[1] = src[1];
                                }
                                for extra in frame.iter_mut().skip(2) {
                                    *extra = 0.0;
                                }
                            }
                        }
                        None => {
                            trace!("Graph busy, writing silence");
                            data.fill(0.0);
                        }
                    }
                },
                |err| error!(error = %err, "Output stream error"),
                None,
            )
            .map_err(|e| SceneboxError::Device(e.to_string()))?;
        stream
            .play()
            .map_err(|e| SceneboxError::Device(e.to_string()))?;

        info!(
            device = %device.name().unwrap_or_else(|_| "unknown".into()),
            sample_rate = rate,
            channels,
            "Output stream started"
        );
        Ok(Self {
            _stream: stream,
            sample_rate: rate,
            channels,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}
