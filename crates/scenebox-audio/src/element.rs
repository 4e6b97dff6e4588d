//! Media element: a seekable, pausable player over one decoded source.

use crate::buffer::AudioBuffer;
use parking_lot::Mutex;
use scenebox_core::{Result, SceneboxError};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

const EVENT_CAPACITY: usize = 16;

/// Transport notifications emitted by a [`MediaElement`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEvent {
    /// Playback started or resumed.
    Play,
    /// Playback paused, including when the end of media pauses it.
    Pause,
    /// The end of media was reached without looping. Follows `Pause`.
    Ended,
    /// Loading the source failed.
    Error(String),
    /// Loaded media was discarded by a reload.
    Abort,
}

struct ElementState {
    src: Option<String>,
    media: Option<Arc<AudioBuffer>>,
    error: Option<String>,
    /// Playhead in source frames.
    position: f64,
    paused: bool,
    ended: bool,
    looping: bool,
    volume: f32,
    muted: bool,
    /// Set once a source node has been created for this element.
    bound: bool,
}

impl Default for ElementState {
    fn default() -> Self {
        Self {
            src: None,
            media: None,
            error: None,
            position: 0.0,
            paused: true,
            ended: false,
            looping: false,
            volume: 1.0,
            muted: false,
            bound: false,
        }
    }
}

/// Shared handle; clones control the same player.
#[derive(Clone)]
pub struct MediaElement {
    state: Arc<Mutex<ElementState>>,
    events: broadcast::Sender<MediaEvent>,
}

impl Default for MediaElement {
    fn default() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Arc::default(),
            events,
        }
    }
}

impl std::fmt::Debug for MediaElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MediaElement")
            .field("src", &state.src)
            .field("paused", &state.paused)
            .field("ended", &state.ended)
            .finish()
    }
}

impl PartialEq for MediaElement {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl MediaElement {
    /// An element with no source.
    pub fn new() -> Self {
        Self::default()
    }

    /// An element for `src`, loaded immediately. A load failure does not
    /// fail construction; it surfaces when playback is attempted.
    pub fn from_src(src: impl Into<String>) -> Self {
        let element = Self::new();
        element.set_src(src);
        if let Err(e) = element.load() {
            warn!(error = %e, "Media element failed to load its source");
        }
        element
    }

    /// An element playing already decoded audio.
    pub fn from_buffer(buffer: AudioBuffer) -> Self {
        let element = Self::new();
        element.state.lock().media = Some(Arc::new(buffer));
        element
    }

    /// Receive transport events from now on. Dropping the receiver
    /// unsubscribes; a receiver that falls behind sees `Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<MediaEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: MediaEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    pub fn src(&self) -> Option<String> {
        self.state.lock().src.clone()
    }

    /// Replace the source. Takes effect on the next [`load`](Self::load).
    pub fn set_src(&self, src: impl Into<String>) {
        let mut state = self.state.lock();
        state.src = Some(src.into());
        state.error = None;
    }

    /// Decode the current source and reset the playhead.
    pub fn load(&self) -> Result<()> {
        let Some(src) = self.src() else {
            return Err(SceneboxError::NotFound("media element has no source".into()));
        };
        let result = AudioBuffer::load(&src);
        let mut state = self.state.lock();
        state.position = 0.0;
        state.ended = false;
        let replaced = state.media.is_some();
        let outcome = match result {
            Ok(buffer) => {
                debug!(src = %src, duration = buffer.duration(), "Media loaded");
                state.media = Some(Arc::new(buffer));
                state.error = None;
                Ok(())
            }
            Err(e) => {
                state.media = None;
                state.error = Some(e.to_string());
                Err(e)
            }
        };
        drop(state);
        if replaced {
            self.emit(MediaEvent::Abort);
        }
        if let Err(e) = &outcome {
            self.emit(MediaEvent::Error(e.to_string()));
        }
        outcome
    }

    /// Last load error, if any.
    pub fn error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    /// Start or resume playback. An ended element restarts from the top.
    pub fn play(&self) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(error) = &state.error {
            return Err(SceneboxError::Transport(error.clone()));
        }
        if state.media.is_none() {
            return Err(SceneboxError::Transport("no media loaded".into()));
        }
        if state.ended {
            state.position = 0.0;
            state.ended = false;
        }
        let was_paused = std::mem::replace(&mut state.paused, false);
        drop(state);
        if was_paused {
            self.emit(MediaEvent::Play);
        }
        Ok(())
    }

    pub fn pause(&self) {
        let was_paused = std::mem::replace(&mut self.state.lock().paused, true);
        if !was_paused {
            self.emit(MediaEvent::Pause);
        }
    }

    pub fn paused(&self) -> bool {
        self.state.lock().paused
    }

    pub fn ended(&self) -> bool {
        self.state.lock().ended
    }

    pub fn looping(&self) -> bool {
        self.state.lock().looping
    }

    pub fn set_looping(&self, looping: bool) {
        self.state.lock().looping = looping;
    }

    pub fn volume(&self) -> f32 {
        self.state.lock().volume
    }

    /// Set the volume, clamped to `[0, 1]`.
    pub fn set_volume(&self, volume: f32) {
        if volume.is_finite() {
            self.state.lock().volume = volume.clamp(0.0, 1.0);
        }
    }

    pub fn muted(&self) -> bool {
        self.state.lock().muted
    }

    pub fn set_muted(&self, muted: bool) {
        self.state.lock().muted = muted;
    }

    /// Media duration in seconds, `None` until something is loaded.
    pub fn duration(&self) -> Option<f64> {
        self.state.lock().media.as_ref().map(|m| m.duration())
    }

    /// Playhead in seconds.
    pub fn current_time(&self) -> f64 {
        let state = self.state.lock();
        match &state.media {
            Some(media) if media.sample_rate() > 0 => state.position / media.sample_rate() as f64,
            _ => 0.0,
        }
    }

    /// Seek, clamped to `[0, duration]`.
    pub fn set_current_time(&self, seconds: f64) {
        let mut state = self.state.lock();
        let Some(media) = state.media.clone() else {
            return;
        };
        let seconds = if seconds.is_finite() { seconds } else { 0.0 };
        let seconds = seconds.clamp(0.0, media.duration());
        state.position = seconds * media.sample_rate() as f64;
        state.ended = false;
    }

    pub(crate) fn try_bind(&self) -> bool {
        let mut state = self.state.lock();
        if state.bound {
            return false;
        }
        state.bound = true;
        true
    }

    /// Produce `frames` frames at `sample_rate`, advancing the playhead.
    pub(crate) fn render(&self, frames: usize, sample_rate: u32) -> Vec<f32> {
        let mut out = vec![0.0f32; frames * 2];
        let finished = self.fill(&mut out, sample_rate);
        if finished {
            self.emit(MediaEvent::Pause);
            self.emit(MediaEvent::Ended);
        }
        out
    }

    /// Returns true when this call reached the end of media.
    fn fill(&self, out: &mut [f32], sample_rate: u32) -> bool {
        let mut state = self.state.lock();
        if state.paused || state.ended {
            return false;
        }
        let Some(media) = state.media.clone() else {
            return false;
        };
        let total = media.frames();
        if total == 0 || sample_rate == 0 {
            state.ended = true;
            state.paused = true;
            return true;
        }

        let step = media.sample_rate() as f64 / sample_rate as f64;
        let level = if state.muted { 0.0 } else { state.volume };
        for frame in out.chunks_exact_mut(2) {
            if state.position >= total as f64 {
                if state.looping {
                    state.position -= total as f64;
                } else {
                    break;
                }
            }
            let index = state.position.floor() as usize;
            let frac = (state.position - index as f64) as f32;
            let (l0, r0) = media.frame(index);
            let (l1, r1) = if index + 1 < total {
                media.frame(index + 1)
            } else if state.looping {
                media.frame(0)
            } else {
                (l0, r0)
            };
            frame[0] = (l0 + (l1 - l0) * frac) * level;
            frame[1] = (r0 + (r1 - r0) * frac) * level;
            state.position += step;
        }
        if state.position < total as f64 {
            return false;
        }
        if state.looping {
            state.position %= total as f64;
            return false;
        }
        state.ended = true;
        state.paused = true;
        true
    }
}
