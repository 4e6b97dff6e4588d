//! Mixer channel: a fixed EQ / pan / gain strip with optional inserts.
//!
//! Signal path:
//!
//! ```text
//! input -> low shelf -> mid peak -> high shelf -> panner -> gain -> output
//!       -> [custom node 0 -> ... -> custom node n-1] -> mixer master
//! ```
//!
//! `input` carries the fade ramps, `gain` the channel volume and `output`
//! the mute gate; the three act independently and multiply.

use crate::element::MediaElement;
use crate::fade::{Fade, FadeDirection};
use crate::graph::{AudioContext, AudioNode, BiquadKind};
use crate::track::{Playback, Track};
use scenebox_core::{EqConfig, FadeConfig, Result, SceneboxError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::AbortHandle;
use tracing::{debug, error, info};

static NEXT_CHANNEL_KEY: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a channel, independent of its string id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ChannelKey(u64);

impl ChannelKey {
    fn next() -> Self {
        Self(NEXT_CHANNEL_KEY.fetch_add(1, Ordering::Relaxed))
    }
}

/// Anything [`Channel::input`] accepts.
#[derive(Debug, Clone)]
pub enum ChannelSource {
    /// A media element to wrap in a new track.
    Element(MediaElement),
    /// A media-element or media-stream source node, routed straight in.
    Node(AudioNode),
    /// A path or `data:` URI to wrap in a new track.
    Url(String),
    /// An existing track to attach.
    Track(Track),
}

impl From<MediaElement> for ChannelSource {
    fn from(element: MediaElement) -> Self {
        ChannelSource::Element(element)
    }
}

impl From<AudioNode> for ChannelSource {
    fn from(node: AudioNode) -> Self {
        ChannelSource::Node(node)
    }
}

impl From<&str> for ChannelSource {
    fn from(src: &str) -> Self {
        ChannelSource::Url(src.to_string())
    }
}

impl From<String> for ChannelSource {
    fn from(src: String) -> Self {
        ChannelSource::Url(src)
    }
}

impl From<Track> for ChannelSource {
    fn from(track: Track) -> Self {
        ChannelSource::Track(track)
    }
}

/// What [`Channel::input`] connected.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelInput {
    Node(AudioNode),
    Track(Track),
}

impl ChannelInput {
    pub fn into_track(self) -> Option<Track> {
        match self {
            ChannelInput::Track(track) => Some(track),
            ChannelInput::Node(_) => None,
        }
    }
}

/// Pause bookkeeping for [`Channel::play`].
#[derive(Debug, Clone, Default, PartialEq)]
pub enum TransportState {
    #[default]
    Idle,
    /// Tracks that were playing when the channel was paused.
    PausedForResume(Vec<Track>),
}

pub struct Channel {
    id: String,
    key: ChannelKey,
    context: AudioContext,
    master: AudioNode,
    input: AudioNode,
    low: AudioNode,
    mid: AudioNode,
    high: AudioNode,
    panner: AudioNode,
    gain: AudioNode,
    output: AudioNode,
    tracks: Vec<Track>,
    custom_nodes: Vec<AudioNode>,
    transport: TransportState,
    fade: Option<AbortHandle>,
    fade_config: FadeConfig,
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.id)
            .field("tracks", &self.tracks().count())
            .field("custom_nodes", &self.custom_nodes.len())
            .finish()
    }
}

impl Channel {
    pub(crate) fn new(
        id: String,
        context: &AudioContext,
        master: &AudioNode,
        eq: &EqConfig,
        fade_config: FadeConfig,
    ) -> Result<Self> {
        let input = context.create_gain();
        let low = context.create_biquad_filter(BiquadKind::LowShelf);
        let mid = context.create_biquad_filter(BiquadKind::Peaking);
        let high = context.create_biquad_filter(BiquadKind::HighShelf);
        let panner = context.create_stereo_panner();
        let gain = context.create_gain();
        let output = context.create_gain();

        for (band, hz) in [(&low, eq.low_hz), (&mid, eq.mid_hz), (&high, eq.high_hz)] {
            band.frequency().set_value(hz);
            band.q().set_value(eq.q);
            band.gain().set_value(0.0);
        }

        let chain = [&input, &low, &mid, &high, &panner, &gain, &output];
        let wired = chain
            .windows(2)
            .try_for_each(|pair| pair[0].connect(pair[1]))
            .and_then(|()| output.connect(master));
        if let Err(e) = wired {
            for node in chain {
                node.release();
            }
            return Err(e.into());
        }

        info!(channel = %id, "Channel created");
        Ok(Self {
            id,
            key: ChannelKey::next(),
            context: context.clone(),
            master: master.clone(),
            input,
            low,
            mid,
            high,
            panner,
            gain,
            output,
            tracks: Vec::new(),
            custom_nodes: Vec::new(),
            transport: TransportState::Idle,
            fade: None,
            fade_config,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn key(&self) -> ChannelKey {
        self.key
    }

    pub fn context(&self) -> &AudioContext {
        &self.context
    }

    /// Head of the fixed chain; sources connect here.
    pub fn input_node(&self) -> &AudioNode {
        &self.input
    }

    /// Tail of the fixed chain.
    pub fn output_node(&self) -> &AudioNode {
        &self.output
    }

    /// Tracks feeding this channel, in attachment order.
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        let key = self.key;
        self.tracks.iter().filter(move |t| t.is_attached_to(key))
    }

    pub(crate) fn register_track(&mut self, track: Track) {
        let key = self.key;
        self.tracks.retain(|t| t.is_attached_to(key));
        self.tracks.push(track);
    }

    /// Attach `track`. Returns `self` for chaining.
    pub fn add_track(&mut self, track: &Track) -> Result<&mut Self> {
        track.output(self)?;
        Ok(self)
    }

    /// Route a source into the channel, creating a track where needed.
    pub fn input(&mut self, source: impl Into<ChannelSource>) -> Result<ChannelInput> {
        match source.into() {
            ChannelSource::Node(node) => {
                if !node.is_source() {
                    return Err(SceneboxError::InvalidParameter(
                        "only media element or stream source nodes can feed a channel".into(),
                    ));
                }
                node.connect(&self.input)?;
                Ok(ChannelInput::Node(node))
            }
            ChannelSource::Track(track) => {
                self.add_track(&track)?;
                Ok(ChannelInput::Track(track))
            }
            ChannelSource::Element(element) => {
                let track = Track::new(element, &self.context)?;
                self.add_track(&track)?;
                Ok(ChannelInput::Track(track))
            }
            ChannelSource::Url(src) => {
                let track = Track::new(src, &self.context)?;
                self.add_track(&track)?;
                Ok(ChannelInput::Track(track))
            }
        }
    }

    pub fn find_track(&self, id: &str) -> Option<&Track> {
        self.tracks().find(|t| t.id() == id)
    }

    /// Inserted effect nodes, in signal order.
    pub fn custom_nodes(&self) -> &[AudioNode] {
        &self.custom_nodes
    }

    /// Append an effect after the fixed chain.
    pub fn add_node(&mut self, node: AudioNode) -> Result<()> {
        self.custom_nodes.push(node);
        self.reconnect_nodes()
    }

    pub fn remove_node(&mut self, node: &AudioNode) -> Result<()> {
        let index = self
            .custom_nodes
            .iter()
            .position(|n| n == node)
            .ok_or(SceneboxError::NodeNotFound)?;
        let removed = self.custom_nodes.remove(index);
        removed.disconnect();
        self.reconnect_nodes()
    }

    pub fn remove_all_nodes(&mut self) -> Result<()> {
        for node in self.custom_nodes.drain(..) {
            node.disconnect();
        }
        self.reconnect_nodes()
    }

    /// Rebuild the path from the output node to the mixer through the
    /// current effect list.
    ///
    /// The volume stage is held at 0 while edges change and set back to 1
    /// afterwards. If any edge cannot be made the output is routed straight
    /// to the mixer and the error is returned.
    pub fn reconnect_nodes(&self) -> Result<()> {
        let volume = self.gain.gain();
        volume.set_value(0.0);

        let result = self.relink();
        if let Err(e) = &result {
            error!(
                tag = "channel_reconnect",
                channel = %self.id,
                error = %e,
                "Reconnect failed, routing channel straight to the mixer"
            );
            self.output.disconnect();
            if let Err(fallback) = self.output.connect(&self.master) {
                error!(
                    tag = "channel_reconnect",
                    channel = %self.id,
                    error = %fallback,
                    "Fallback routing failed"
                );
            }
        }

        volume.set_value(1.0);
        result
    }

    fn relink(&self) -> Result<()> {
        self.output.disconnect();
        let Some(first) = self.custom_nodes.first() else {
            self.output.connect(&self.master)?;
            return Ok(());
        };
        for node in &self.custom_nodes {
            node.disconnect();
        }
        for (i, node) in self.custom_nodes.iter().enumerate() {
            let next = self.custom_nodes.get(i + 1).unwrap_or(&self.master);
            node.connect(next)?;
        }
        self.output.connect(first)?;
        debug!(channel = %self.id, inserts = self.custom_nodes.len(), "Channel relinked");
        Ok(())
    }

    /// Also route the output to `target`, outside the managed chain.
    pub fn connect(&self, target: &AudioNode) -> Result<()> {
        Ok(self.output.connect(target)?)
    }

    /// Unroute the output from `target`, or from everything when `None`.
    pub fn disconnect(&self, target: Option<&AudioNode>) -> Result<()> {
        match target {
            Some(target) => Ok(self.output.disconnect_from(target)?),
            None => {
                self.output.disconnect();
                Ok(())
            }
        }
    }

    /// Route the output straight to the context's destination.
    pub fn connect_to_context(&self) -> Result<AudioContext> {
        self.connect(&self.context.destination())?;
        Ok(self.context.clone())
    }

    pub fn disconnect_from_context(&self) -> Result<()> {
        self.disconnect(Some(&self.context.destination()))
    }

    pub fn pan(&self) -> f32 {
        self.panner.pan().value()
    }

    pub fn set_pan(&self, pan: f32) {
        self.panner.pan().set_value(pan);
    }

    pub fn volume(&self) -> f32 {
        self.gain.gain().value()
    }

    pub fn set_volume(&self, volume: f32) {
        self.gain.gain().set_value(volume);
    }

    /// Low shelf gain in dB.
    pub fn low_eq(&self) -> f32 {
        self.low.gain().value()
    }

    pub fn set_low_eq(&self, db: f32) {
        self.low.gain().set_value(db);
    }

    /// Mid peak gain in dB.
    pub fn mid_eq(&self) -> f32 {
        self.mid.gain().value()
    }

    pub fn set_mid_eq(&self, db: f32) {
        self.mid.gain().set_value(db);
    }

    /// High shelf gain in dB.
    pub fn high_eq(&self) -> f32 {
        self.high.gain().value()
    }

    pub fn set_high_eq(&self, db: f32) {
        self.high.gain().set_value(db);
    }

    pub fn muted(&self) -> bool {
        self.output.gain().value() == 0.0
    }

    pub fn set_muted(&self, muted: bool) {
        self.output.gain().set_value(if muted { 0.0 } else { 1.0 });
    }

    /// Gain of the input stage, driven by fades.
    pub fn input_gain(&self) -> f32 {
        self.input.gain().value()
    }

    pub fn transport_state(&self) -> &TransportState {
        &self.transport
    }

    /// Resume what [`pause`](Self::pause) stopped; otherwise play the track
    /// named `id`, or the first track.
    pub fn play(&mut self, id: Option<&str>) -> Playback {
        if let TransportState::PausedForResume(paused) = std::mem::take(&mut self.transport) {
            let key = self.key;
            debug!(channel = %self.id, tracks = paused.len(), "Resuming paused tracks");
            return Playback::all(
                paused
                    .iter()
                    .filter(|t| t.is_attached_to(key))
                    .map(Track::play)
                    .collect::<Vec<_>>(),
            );
        }
        let named = id
            .filter(|id| !id.is_empty())
            .and_then(|id| self.find_track(id));
        match named.or_else(|| self.tracks().next()) {
            Some(track) => track.play(),
            None => Playback::ready(Ok(())),
        }
    }

    /// Pause every playing track and remember it for the next
    /// [`play`](Self::play). Tracks that were already paused are not
    /// remembered.
    pub fn pause(&mut self) {
        let playing: Vec<Track> = self.tracks().filter(|t| t.playing()).cloned().collect();
        for track in &playing {
            track.pause();
        }
        if let TransportState::PausedForResume(paused) = &mut self.transport {
            for track in playing {
                if !paused.contains(&track) {
                    paused.push(track);
                }
            }
            return;
        }
        if !playing.is_empty() {
            self.transport = TransportState::PausedForResume(playing);
        }
    }

    /// Stop and rewind every track.
    pub fn stop(&mut self) {
        for track in self.tracks() {
            track.stop();
        }
        self.transport = TransportState::Idle;
    }

    pub fn is_playing(&self) -> bool {
        self.tracks().any(Track::playing)
    }

    /// True when no track is playing, including when there are none.
    pub fn is_paused(&self) -> bool {
        self.tracks().all(|t| t.paused() || t.ended())
    }

    /// Ramp the input stage to 0. `None` or a zero duration uses the
    /// configured default.
    pub fn fade_out(&mut self, duration: Option<Duration>) -> Result<Fade> {
        self.fade(FadeDirection::Out, duration)
    }

    /// Ramp the input stage to 1.
    pub fn fade_in(&mut self, duration: Option<Duration>) -> Result<Fade> {
        self.fade(FadeDirection::In, duration)
    }

    fn fade(&mut self, direction: FadeDirection, duration: Option<Duration>) -> Result<Fade> {
        let duration = duration
            .filter(|d| !d.is_zero())
            .unwrap_or(Duration::from_millis(self.fade_config.default_ms));
        let tick = Duration::from_millis(self.fade_config.tick_ms);
        if let Some(previous) = self.fade.take() {
            previous.abort();
        }
        let fade = Fade::start(self.input.gain(), direction, duration, tick)?;
        self.fade = Some(fade.abort_handle());
        debug!(channel = %self.id, ?direction, ?duration, "Fade started");
        Ok(fade)
    }

    /// Tear the channel down: attached tracks closed, inserts disconnected
    /// and handed back to their owner, fixed stages released.
    pub fn close(&mut self) {
        if let Some(fade) = self.fade.take() {
            fade.abort();
        }
        let key = self.key;
        for track in self.tracks.drain(..) {
            if track.is_attached_to(key) {
                track.close();
            }
        }
        for node in self.custom_nodes.drain(..) {
            node.disconnect();
        }
        for node in [
            &self.output,
            &self.gain,
            &self.panner,
            &self.high,
            &self.mid,
            &self.low,
            &self.input,
        ] {
            node.release();
        }
        self.transport = TransportState::Idle;
        info!(channel = %self.id, "Channel closed");
    }
}
