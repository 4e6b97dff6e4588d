//! A single playable source and its connection into a channel.

use crate::channel::{Channel, ChannelKey};
use crate::element::{MediaElement, MediaEvent};
use crate::graph::{AudioContext, AudioNode, ContextState};
use parking_lot::{Mutex, RwLock};
use scenebox_core::{Result, SceneboxError};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::broadcast;
use tracing::debug;

/// What a track plays.
#[derive(Debug, Clone)]
pub enum TrackSource {
    /// An existing element, used as-is.
    Element(MediaElement),
    /// A file path or base64 `data:` URI to load into a fresh element.
    Url(String),
}

impl From<MediaElement> for TrackSource {
    fn from(element: MediaElement) -> Self {
        TrackSource::Element(element)
    }
}

impl From<&str> for TrackSource {
    fn from(src: &str) -> Self {
        TrackSource::Url(src.to_string())
    }
}

impl From<String> for TrackSource {
    fn from(src: String) -> Self {
        TrackSource::Url(src)
    }
}

struct TrackInner {
    id: RwLock<String>,
    element: MediaElement,
    source: AudioNode,
    /// Channel currently fed by this track.
    attachment: Mutex<Option<ChannelKey>>,
}

/// Shared track handle. Clones are the same track; equality is identity.
#[derive(Clone)]
pub struct Track {
    inner: Arc<TrackInner>,
}

impl std::fmt::Debug for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Track")
            .field("id", &*self.inner.id.read())
            .field("source", &self.inner.source)
            .finish()
    }
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Track {}

impl Track {
    /// Wrap `source` in a track whose output node lives in `context`.
    /// The output starts disconnected.
    pub fn new(source: impl Into<TrackSource>, context: &AudioContext) -> Result<Self> {
        let element = match source.into() {
            TrackSource::Element(element) => element,
            TrackSource::Url(src) => MediaElement::from_src(src),
        };
        let source = context.create_media_element_source(&element)?;
        source.disconnect();
        Ok(Self {
            inner: Arc::new(TrackInner {
                id: RwLock::new("N/A".to_string()),
                element,
                source,
                attachment: Mutex::new(None),
            }),
        })
    }

    pub fn id(&self) -> String {
        self.inner.id.read().clone()
    }

    pub fn set_id(&self, id: impl Into<String>) {
        *self.inner.id.write() = id.into();
    }

    /// Output node of this track.
    pub fn node(&self) -> &AudioNode {
        &self.inner.source
    }

    pub fn element(&self) -> &MediaElement {
        &self.inner.element
    }

    /// Transport events of the underlying element: play, pause, ended,
    /// load errors and aborts.
    pub fn subscribe(&self) -> broadcast::Receiver<MediaEvent> {
        self.inner.element.subscribe()
    }

    /// Attach to `channel`. Attaching to the channel it already feeds is a
    /// no-op; otherwise any previous routing is replaced.
    pub fn output(&self, channel: &mut Channel) -> Result<()> {
        if channel.tracks().any(|t| t == self) {
            return Ok(());
        }
        let source = &self.inner.source;
        source.disconnect();
        source.connect(channel.input_node())?;
        *self.inner.attachment.lock() = Some(channel.key());
        channel.register_track(self.clone());
        debug!(track = %self.id(), channel = %channel.id(), "Track attached");
        Ok(())
    }

    pub(crate) fn is_attached_to(&self, key: ChannelKey) -> bool {
        *self.inner.attachment.lock() == Some(key)
    }

    /// Start or resume playback from the current position.
    pub fn play(&self) -> Playback {
        if self.inner.source.context().state() == ContextState::Closed {
            return Playback::ready(Err(SceneboxError::Transport(
                "audio context is closed".into(),
            )));
        }
        if !self.inner.source.is_alive() {
            return Playback::ready(Err(SceneboxError::Transport("track is closed".into())));
        }
        Playback::ready(self.inner.element.play())
    }

    pub fn pause(&self) {
        self.inner.element.pause();
    }

    /// Pause and rewind to the start.
    pub fn stop(&self) {
        self.inner.element.pause();
        self.inner.element.set_current_time(0.0);
    }

    pub fn volume(&self) -> f32 {
        self.inner.element.volume()
    }

    pub fn set_volume(&self, volume: f32) {
        self.inner.element.set_volume(volume);
    }

    pub fn looping(&self) -> bool {
        self.inner.element.looping()
    }

    pub fn set_looping(&self, looping: bool) {
        self.inner.element.set_looping(looping);
    }

    pub fn muted(&self) -> bool {
        self.inner.element.muted()
    }

    pub fn set_muted(&self, muted: bool) {
        self.inner.element.set_muted(muted);
    }

    /// Playback position in seconds.
    pub fn time(&self) -> f64 {
        self.inner.element.current_time()
    }

    pub fn set_time(&self, seconds: f64) {
        self.inner.element.set_current_time(seconds);
    }

    /// Length in seconds, `None` when nothing is loaded.
    pub fn duration(&self) -> Option<f64> {
        self.inner.element.duration()
    }

    pub fn playing(&self) -> bool {
        !self.paused() && !self.ended()
    }

    pub fn paused(&self) -> bool {
        self.inner.element.paused()
    }

    pub fn ended(&self) -> bool {
        self.inner.element.ended()
    }

    /// Pause, release the output node and detach from its channel. A closed
    /// track cannot play again.
    pub fn close(&self) {
        self.inner.element.pause();
        self.inner.source.release();
        *self.inner.attachment.lock() = None;
    }
}

/// Outcome of a transport request.
///
/// Playback starts when the request is made; awaiting only reports whether
/// it was accepted.
#[derive(Debug)]
#[must_use = "playback errors are only reported through the returned future"]
pub struct Playback {
    outcome: Option<Result<()>>,
}

impl Playback {
    pub(crate) fn ready(outcome: Result<()>) -> Self {
        Self {
            outcome: Some(outcome),
        }
    }

    /// Combine several requests; the first failure wins.
    pub(crate) fn all(requests: impl IntoIterator<Item = Playback>) -> Self {
        let mut outcome = Ok(());
        for request in requests {
            let result = request.into_result();
            if outcome.is_ok() {
                outcome = result;
            }
        }
        Self::ready(outcome)
    }

    /// The outcome without awaiting.
    pub fn into_result(mut self) -> Result<()> {
        self.take()
    }

    fn take(&mut self) -> Result<()> {
        self.outcome
            .take()
            .unwrap_or_else(|| Err(SceneboxError::Runtime("playback outcome already taken".into())))
    }
}

impl Future for Playback {
    type Output = Result<()>;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        Poll::Ready(self.get_mut().take())
    }
}
