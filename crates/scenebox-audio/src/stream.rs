//! Live media stream fed by a capture device.

use crate::ring_buffer::RingBuffer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct StreamShared {
    queue: RingBuffer,
    active: AtomicBool,
    bound: AtomicBool,
}

/// Consumer side of a live stream. Clones share the same queue.
#[derive(Clone)]
pub struct MediaStream {
    shared: Arc<StreamShared>,
}

/// Producer side, handed to the capture callback.
pub struct StreamWriter {
    shared: Arc<StreamShared>,
    scratch: Vec<f32>,
}

impl MediaStream {
    /// A stream buffering up to `capacity_frames` stereo frames.
    pub fn new(capacity_frames: usize) -> (MediaStream, StreamWriter) {
        let shared = Arc::new(StreamShared {
            queue: RingBuffer::new(capacity_frames * 2),
            active: AtomicBool::new(true),
            bound: AtomicBool::new(false),
        });
        (
            MediaStream {
                shared: Arc::clone(&shared),
            },
            StreamWriter {
                shared,
                scratch: Vec::new(),
            },
        )
    }

    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::Acquire)
    }

    /// End the stream. Queued audio is discarded and writers are ignored.
    pub fn stop(&self) {
        self.shared.active.store(false, Ordering::Release);
        self.shared.queue.clear();
    }

    /// Frames waiting to be rendered.
    pub fn buffered_frames(&self) -> usize {
        self.shared.queue.available_read() / 2
    }

    /// Samples lost because the renderer fell behind.
    pub fn dropped_samples(&self) -> u64 {
        self.shared.queue.dropped()
    }

    pub(crate) fn try_bind(&self) -> bool {
        !self.shared.bound.swap(true, Ordering::AcqRel)
    }

    /// Pull `frames` stereo frames; an underrun reads as silence.
    pub(crate) fn read(&self, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0f32; frames * 2];
        if self.is_active() {
            self.shared.queue.pop_or_silence(&mut out);
        }
        out
    }
}

impl StreamWriter {
    /// Queue interleaved frames with `channels` channels, converted to stereo.
    /// Returns the number of frames accepted.
    pub fn write_frames(&mut self, data: &[f32], channels: usize) -> usize {
        if !self.shared.active.load(Ordering::Acquire) || channels == 0 {
            return 0;
        }
        self.scratch.clear();
        for frame in data.chunks_exact(channels) {
            let left = frame[0];
            let right = frame.get(1).copied().unwrap_or(left);
            self.scratch.push(left);
            self.scratch.push(right);
        }
        self.shared.queue.push(&self.scratch) / 2
    }
}
