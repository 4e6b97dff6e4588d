//! Decoded audio held in memory.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use scenebox_core::{Result, SceneboxError};
use std::io::Cursor;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Interleaved stereo PCM at its native sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    samples: Vec<f32>,
}

impl AudioBuffer {
    /// Build from interleaved samples with any channel count. Mono is
    /// duplicated to both sides; channels past the second are dropped.
    pub fn from_interleaved(sample_rate: u32, channels: usize, samples: &[f32]) -> Self {
        let channels = channels.max(1);
        let mut stereo = Vec::with_capacity(samples.len() / channels * 2);
        for frame in samples.chunks_exact(channels) {
            let left = frame[0];
            let right = frame.get(1).copied().unwrap_or(left);
            stereo.push(left);
            stereo.push(right);
        }
        Self {
            sample_rate,
            samples: stereo,
        }
    }

    /// A sine tone on both channels.
    pub fn tone(frequency: f32, seconds: f32, sample_rate: u32) -> Self {
        let frames = (seconds * sample_rate as f32).round() as usize;
        let step = std::f32::consts::TAU * frequency / sample_rate as f32;
        let mut samples = Vec::with_capacity(frames * 2);
        for n in 0..frames {
            let s = (step * n as f32).sin() * 0.5;
            samples.push(s);
            samples.push(s);
        }
        Self {
            sample_rate,
            samples,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / 2
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// One stereo frame, or silence past the end.
    pub(crate) fn frame(&self, index: usize) -> (f32, f32) {
        match self.samples.get(index * 2..index * 2 + 2) {
            Some(pair) => (pair[0], pair[1]),
            None => (0.0, 0.0),
        }
    }

    /// Decode a complete encoded file. `hint` is a file extension such as
    /// `"wav"` or `"mp3"`, if known.
    pub fn decode(bytes: Vec<u8>, hint: Option<&str>) -> Result<Self> {
        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());
        let mut probe_hint = Hint::new();
        if let Some(ext) = hint {
            probe_hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &probe_hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| SceneboxError::UnsupportedFormat(e.to_string()))?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| SceneboxError::Decode("no supported audio track".into()))?;
        let track_id = track.id;
        let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| SceneboxError::UnsupportedFormat(e.to_string()))?;

        let mut samples = Vec::new();
        let mut channels = 0usize;
        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(SceneboxError::Decode(e.to_string())),
            };
            if packet.track_id() != track_id {
                continue;
            }
            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    sample_rate = spec.rate;
                    channels = spec.channels.count();
                    let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                    buf.copy_interleaved_ref(decoded);
                    samples.extend_from_slice(buf.samples());
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!(error = e, "Skipping undecodable packet");
                }
                Err(SymphoniaError::IoError(_)) => break,
                Err(e) => return Err(SceneboxError::Decode(e.to_string())),
            }
        }

        if sample_rate == 0 || channels == 0 {
            return Err(SceneboxError::Decode("stream contains no audio".into()));
        }
        let buffer = Self::from_interleaved(sample_rate, channels, &samples);
        debug!(
            sample_rate,
            channels,
            frames = buffer.frames(),
            "Decoded audio"
        );
        Ok(buffer)
    }

    /// Load a media source string: a `data:` URI with base64 payload or a
    /// filesystem path. Network URLs are not fetched.
    pub fn load(src: &str) -> Result<Self> {
        if let Some(rest) = src.strip_prefix("data:") {
            let (meta, payload) = rest
                .split_once(',')
                .ok_or_else(|| SceneboxError::UnsupportedFormat("malformed data URI".into()))?;
            let mime = meta
                .strip_suffix(";base64")
                .ok_or_else(|| SceneboxError::UnsupportedFormat("data URI is not base64".into()))?;
            let bytes = STANDARD
                .decode(payload.trim())
                .map_err(|e| SceneboxError::Decode(e.to_string()))?;
            return Self::decode(bytes, extension_for_mime(mime));
        }
        if src.contains("://") {
            return Err(SceneboxError::UnsupportedFormat(format!(
                "cannot fetch remote source {src}"
            )));
        }
        let path = Path::new(src);
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SceneboxError::NotFound(src.to_string()),
            _ => SceneboxError::Io(e),
        })?;
        let ext = path.extension().and_then(|e| e.to_str());
        Self::decode(bytes, ext)
    }
}

fn extension_for_mime(mime: &str) -> Option<&'static str> {
    match mime {
        "audio/wav" | "audio/wave" | "audio/x-wav" => Some("wav"),
        "audio/mpeg" | "audio/mp3" => Some("mp3"),
        "audio/ogg" => Some("ogg"),
        "audio/flac" | "audio/x-flac" => Some("flac"),
        "audio/mp4" | "audio/aac" => Some("m4a"),
        _ => None,
    }
}
