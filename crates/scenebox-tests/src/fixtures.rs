//! Shared helpers for the integration tests.

use scenebox_audio::{AudioBuffer, AudioProcessor, MediaElement};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

pub const RATE: u32 = 48000;

/// 16-bit PCM WAV file contents.
pub fn wav_bytes(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
    let data_len = (samples.len() * 2) as u32;
    let block_align = channels * 2;
    let mut out = Vec::with_capacity(44 + data_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for s in samples {
        out.extend_from_slice(&s.to_le_bytes());
    }
    out
}

/// Mono WAV holding a constant level for `seconds`.
pub fn constant_wav(sample_rate: u32, level: i16, seconds: f32) -> Vec<u8> {
    let frames = (sample_rate as f32 * seconds) as usize;
    wav_bytes(sample_rate, 1, &vec![level; frames])
}

/// An element playing a constant `level` on both channels.
pub fn constant_element(level: f32, seconds: f32) -> MediaElement {
    let frames = (RATE as f32 * seconds) as usize;
    MediaElement::from_buffer(AudioBuffer::from_interleaved(RATE, 1, &vec![level; frames]))
}

/// Flips the sign of the signal.
pub struct Invert;

impl AudioProcessor for Invert {
    fn name(&self) -> &str {
        "invert"
    }

    fn process(&mut self, input: &[f32], output: &mut [f32], _sample_rate: u32) {
        for (out, s) in output.iter_mut().zip(input) {
            *out = -s;
        }
    }
}

/// A scratch directory removed on drop.
pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub fn new() -> Self {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let path = std::env::temp_dir().join(format!(
            "scenebox-tests-{}-{}",
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::create_dir_all(&path).unwrap();
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.path.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

pub fn all_near(samples: &[f32], expected: f32) -> bool {
    samples.iter().all(|s| (s - expected).abs() < 1e-3)
}
