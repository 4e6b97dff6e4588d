//! Microphone capture as a stream source node.

use crate::graph::{AudioContext, AudioNode};
use crate::stream::{MediaStream, StreamWriter};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SampleRate, SizedSample, Stream, StreamConfig};
use scenebox_core::{Result, SceneboxError};
use tracing::{error, info, warn};

/// Live microphone input. Capture stops when this is dropped.
pub struct Microphone {
    node: AudioNode,
    stream: MediaStream,
    _capture: Stream,
}

impl Microphone {
    /// Stream source node, ready for [`Channel::input`](crate::Channel::input).
    pub fn node(&self) -> &AudioNode {
        &self.node
    }

    pub fn stream(&self) -> &MediaStream {
        &self.stream
    }

    /// End capture. The node keeps existing but renders silence.
    pub fn stop(self) {
        self.stream.stop();
    }
}

/// Open the default input device and expose it as a source node in
/// `context`. Fails with `PermissionDenied` when no device can be opened.
pub fn request_microphone(context: &AudioContext) -> Result<Microphone> {
    let rate = context.sample_rate();
    let device = cpal::default_host()
        .default_input_device()
        .ok_or_else(|| SceneboxError::PermissionDenied("no input device available".into()))?;

    let matching = device
        .supported_input_configs()
        .map_err(denied)?
        .filter(|c| matches!(c.sample_format(), SampleFormat::F32 | SampleFormat::I16))
        .find(|c| c.min_sample_rate().0 <= rate && rate <= c.max_sample_rate().0)
        .map(|c| c.with_sample_rate(SampleRate(rate)));
    let supported = match matching {
        Some(supported) => supported,
        None => {
            let fallback = device.default_input_config().map_err(denied)?;
            warn!(
                device_rate = fallback.sample_rate().0,
                context_rate = rate,
                "Microphone cannot run at the context rate; capture will be pitch shifted"
            );
            fallback
        }
    };

    let format = supported.sample_format();
    let config: StreamConfig = supported.config();
    let channels = config.channels as usize;
    let (stream, writer) = MediaStream::new(rate as usize / 2);

    let capture = match format {
        SampleFormat::F32 => build_capture::<f32>(&device, &config, channels, writer)?,
        SampleFormat::I16 => build_capture::<i16>(&device, &config, channels, writer)?,
        other => {
            return Err(SceneboxError::Device(format!(
                "unsupported input sample format {other:?}"
            )))
        }
    };
    capture.play().map_err(denied)?;

    let node = context.create_media_stream_source(&stream)?;
    info!(channels, sample_rate = config.sample_rate.0, "Microphone opened");
    Ok(Microphone {
        node,
        stream,
        _capture: capture,
    })
}

fn denied(e: impl std::fmt::Display) -> SceneboxError {
    SceneboxError::PermissionDenied(e.to_string())
}

fn build_capture<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    channels: usize,
    mut writer: StreamWriter,
) -> Result<Stream>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let mut scratch: Vec<f32> = Vec::new();
    device
        .build_input_stream(
            config,
            move |data: &[T], _info: &cpal::InputCallbackInfo| {
                scratch.clear();
                scratch.extend(data.iter().map(|&s| f32::from_sample(s)));
                writer.write_frames(&scratch, channels);
            },
            |err| error!(error = %err, "Microphone stream error"),
            None,
        )
        .map_err(denied)
}
