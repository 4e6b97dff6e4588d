//! Lock-free single-producer single-consumer sample queue.
//!
//! Sits between a capture callback (producer) and the graph renderer
//! (consumer). Neither side blocks: a full queue drops the newest samples,
//! an empty one reads as silence.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

pub struct RingBuffer {
    slots: Box<[UnsafeCell<f32>]>,
    /// One slot stays free to tell full from empty.
    len: usize,
    head: AtomicUsize,
    tail: AtomicUsize,
    dropped: AtomicU64,
}

// SAFETY: the producer only touches slots in [tail, head) and the consumer
// only slots in [head, tail); the indices are published with release/acquire
// so the two regions never overlap while in use.
unsafe impl Send for RingBuffer {}
unsafe impl Sync for RingBuffer {}

impl RingBuffer {
    /// Create a queue holding up to `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        let len = capacity + 1;
        Self {
            slots: (0..len).map(|_| UnsafeCell::new(0.0)).collect(),
            len,
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.len - 1
    }

    /// Samples waiting to be read.
    pub fn available_read(&self) -> usize {
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        (tail + self.len - head) % self.len
    }

    /// Free space in samples.
    pub fn available_write(&self) -> usize {
        self.capacity() - self.available_read()
    }

    /// Samples discarded by [`push`](Self::push) because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Append samples. Returns how many fit; the rest are counted as dropped.
    pub fn push(&self, data: &[f32]) -> usize {
        let count = data.len().min(self.available_write());
        if count < data.len() {
            self.dropped
                .fetch_add((data.len() - count) as u64, Ordering::Relaxed);
        }
        let tail = self.tail.load(Ordering::Relaxed);
        for (i, &sample) in data[..count].iter().enumerate() {
            let slot = &self.slots[(tail + i) % self.len];
            // SAFETY: slot lies in the free region owned by the producer.
            unsafe { *slot.get() = sample };
        }
        self.tail.store((tail + count) % self.len, Ordering::Release);
        count
    }

    /// Move up to `output.len()` samples out. Returns how many were read.
    pub fn pop(&self, output: &mut [f32]) -> usize {
        let count = output.len().min(self.available_read());
        let head = self.head.load(Ordering::Relaxed);
        for (i, out) in output[..count].iter_mut().enumerate() {
            let slot = &self.slots[(head + i) % self.len];
            // SAFETY: slot lies in the filled region owned by the consumer.
            *out = unsafe { *slot.get() };
        }
        self.head.store((head + count) % self.len, Ordering::Release);
        count
    }

    /// Fill `output` completely, padding an underrun with zeros.
    pub fn pop_or_silence(&self, output: &mut [f32]) -> usize {
        let read = self.pop(output);
        output[read..].fill(0.0);
        read
    }

    /// Discard everything queued. Consumer side only.
    pub fn clear(&self) {
        let tail = self.tail.load(Ordering::Acquire);
        self.head.store(tail, Ordering::Release);
    }
}
