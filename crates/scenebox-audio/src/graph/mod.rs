//! In-process audio graph.
//!
//! An [`AudioContext`] owns a set of processing nodes joined by directed
//! edges (fan-out allowed, cycles rejected). The control side edits the
//! topology and parameters through cheap [`AudioNode`] / [`AudioParam`]
//! handles; the rendering side pulls interleaved stereo quanta out of the
//! destination node with [`AudioContext::render`].

mod dsp;
mod render;

pub use dsp::BiquadKind;

use crate::element::MediaElement;
use crate::stream::MediaStream;
use dsp::{Biquad, StereoPanner};
use parking_lot::Mutex;
use scenebox_core::{EngineConfig, GraphError, Result, SceneboxError};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Lifecycle state of an audio context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Suspended,
    Running,
    Closed,
}

impl fmt::Display for ContextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContextState::Suspended => "suspended",
            ContextState::Running => "running",
            ContextState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Identifier of a node within one context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Which parameter of a node an [`AudioParam`] addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Gain,
    Frequency,
    Q,
    Pan,
}

/// A caller-supplied processing stage.
///
/// Buffers are interleaved stereo; `output` arrives zeroed and has the same
/// length as `input`. Called from the rendering side with the graph locked,
/// so implementations must not touch the graph themselves.
pub trait AudioProcessor: Send {
    /// Short name used in logs.
    fn name(&self) -> &str {
        "processor"
    }

    fn process(&mut self, input: &[f32], output: &mut [f32], sample_rate: u32);
}

pub(crate) enum NodeKind {
    Destination,
    Gain { gain: f32 },
    Biquad(Biquad),
    StereoPanner(StereoPanner),
    ElementSource(MediaElement),
    StreamSource(MediaStream),
    Processor(Box<dyn AudioProcessor>),
}

impl NodeKind {
    fn name(&self) -> &str {
        match self {
            NodeKind::Destination => "destination",
            NodeKind::Gain { .. } => "gain",
            NodeKind::Biquad(_) => "biquad",
            NodeKind::StereoPanner(_) => "stereo-panner",
            NodeKind::ElementSource(_) => "media-element-source",
            NodeKind::StreamSource(_) => "media-stream-source",
            NodeKind::Processor(p) => p.name(),
        }
    }

    fn param(&self, kind: ParamKind) -> Option<f32> {
        match (self, kind) {
            (NodeKind::Gain { gain }, ParamKind::Gain) => Some(*gain),
            (NodeKind::Biquad(b), ParamKind::Gain) => Some(b.gain()),
            (NodeKind::Biquad(b), ParamKind::Frequency) => Some(b.frequency()),
            (NodeKind::Biquad(b), ParamKind::Q) => Some(b.q()),
            (NodeKind::StereoPanner(p), ParamKind::Pan) => Some(p.pan),
            _ => None,
        }
    }

    fn set_param(&mut self, kind: ParamKind, value: f32) -> bool {
        match (self, kind) {
            (NodeKind::Gain { gain }, ParamKind::Gain) => *gain = value,
            (NodeKind::Biquad(b), ParamKind::Gain) => b.set_gain(value),
            (NodeKind::Biquad(b), ParamKind::Frequency) => b.set_frequency(value),
            (NodeKind::Biquad(b), ParamKind::Q) => b.set_q(value),
            (NodeKind::StereoPanner(p), ParamKind::Pan) => p.pan = value,
            _ => return false,
        }
        true
    }
}

pub(crate) struct Node {
    pub(crate) kind: NodeKind,
    /// Receivers, in connection order.
    pub(crate) outputs: Vec<NodeId>,
}

pub(crate) struct Graph {
    pub(crate) sample_rate: u32,
    pub(crate) state: ContextState,
    pub(crate) resume_pending: bool,
    pub(crate) nodes: HashMap<NodeId, Node>,
    pub(crate) destination: NodeId,
    pub(crate) frames_rendered: u64,
    next_id: u32,
}

impl Graph {
    fn new(sample_rate: u32, state: ContextState) -> Self {
        let mut graph = Self {
            sample_rate,
            state,
            resume_pending: false,
            nodes: HashMap::new(),
            destination: NodeId(0),
            frames_rendered: 0,
            next_id: 0,
        };
        graph.destination = graph.insert(NodeKind::Destination);
        graph
    }

    fn insert(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            Node {
                kind,
                outputs: Vec::new(),
            },
        );
        id
    }

    /// Whether `to` can be reached from `from` by following edges.
    fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        let mut stack = vec![from];
        let mut seen = Vec::new();
        while let Some(id) = stack.pop() {
            if id == to {
                return true;
            }
            if seen.contains(&id) {
                continue;
            }
            seen.push(id);
            if let Some(node) = self.nodes.get(&id) {
                stack.extend(node.outputs.iter().copied());
            }
        }
        false
    }
}

/// Shared handle to an audio processing context.
///
/// Clones refer to the same graph.
#[derive(Clone)]
pub struct AudioContext {
    id: u64,
    graph: Arc<Mutex<Graph>>,
}

impl fmt::Debug for AudioContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioContext")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}

impl PartialEq for AudioContext {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.graph, &other.graph)
    }
}

impl AudioContext {
    /// Create a running context.
    pub fn new(sample_rate: u32) -> Self {
        Self::with_state(sample_rate, ContextState::Running)
    }

    /// Create a context from engine settings. Starts suspended when
    /// `start_suspended` is set, mirroring an autoplay policy.
    pub fn from_config(config: &EngineConfig) -> Self {
        let state = if config.start_suspended {
            ContextState::Suspended
        } else {
            ContextState::Running
        };
        Self::with_state(config.sample_rate, state)
    }

    fn with_state(sample_rate: u32, state: ContextState) -> Self {
        let id = NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed);
        info!(context = id, sample_rate, %state, "Creating audio context");
        Self {
            id,
            graph: Arc::new(Mutex::new(Graph::new(sample_rate, state))),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.graph.lock().sample_rate
    }

    pub fn state(&self) -> ContextState {
        self.graph.lock().state
    }

    /// Seconds of audio rendered so far.
    pub fn current_time(&self) -> f64 {
        let graph = self.graph.lock();
        graph.frames_rendered as f64 / graph.sample_rate as f64
    }

    /// Request a transition to `Running`.
    ///
    /// The request completes on the rendering side at the start of the next
    /// quantum; until then `state()` still reports `Suspended`.
    pub fn resume(&self) {
        let mut graph = self.graph.lock();
        if graph.state == ContextState::Suspended {
            graph.resume_pending = true;
            debug!(context = self.id, "Resume requested");
        }
    }

    /// Stop rendering without releasing anything.
    pub fn suspend(&self) {
        let mut graph = self.graph.lock();
        if graph.state == ContextState::Running {
            graph.state = ContextState::Suspended;
        }
        graph.resume_pending = false;
    }

    /// Release every node. The context renders silence from now on and
    /// refuses new connections.
    pub fn close(&self) {
        let mut graph = self.graph.lock();
        if graph.state == ContextState::Closed {
            return;
        }
        graph.state = ContextState::Closed;
        graph.resume_pending = false;
        graph.nodes.clear();
        info!(context = self.id, "Audio context closed");
    }

    /// Number of live nodes, the destination included.
    pub fn node_count(&self) -> usize {
        self.graph.lock().nodes.len()
    }

    /// The node feeding the physical output.
    pub fn destination(&self) -> AudioNode {
        let id = self.graph.lock().destination;
        self.handle(id)
    }

    pub fn create_gain(&self) -> AudioNode {
        self.create(NodeKind::Gain { gain: 1.0 })
    }

    pub fn create_biquad_filter(&self, kind: BiquadKind) -> AudioNode {
        self.create(NodeKind::Biquad(Biquad::new(kind)))
    }

    pub fn create_stereo_panner(&self) -> AudioNode {
        self.create(NodeKind::StereoPanner(StereoPanner::default()))
    }

    /// Wrap a caller-defined processor in a node.
    pub fn create_processor(&self, processor: Box<dyn AudioProcessor>) -> AudioNode {
        self.create(NodeKind::Processor(processor))
    }

    /// Route a media element through this context.
    ///
    /// An element can feed a single source node for its whole lifetime.
    pub fn create_media_element_source(&self, element: &MediaElement) -> Result<AudioNode> {
        if self.state() == ContextState::Closed {
            return Err(SceneboxError::SourceCreation("audio context is closed".into()));
        }
        if !element.try_bind() {
            return Err(SceneboxError::SourceCreation(
                "media element is already connected to a source node".into(),
            ));
        }
        Ok(self.create(NodeKind::ElementSource(element.clone())))
    }

    /// Route a live stream through this context.
    pub fn create_media_stream_source(&self, stream: &MediaStream) -> Result<AudioNode> {
        if self.state() == ContextState::Closed {
            return Err(SceneboxError::SourceCreation("audio context is closed".into()));
        }
        if !stream.try_bind() {
            return Err(SceneboxError::SourceCreation(
                "media stream is already connected to a source node".into(),
            ));
        }
        Ok(self.create(NodeKind::StreamSource(stream.clone())))
    }

    /// Render `frames` frames of interleaved stereo output.
    pub fn render(&self, frames: usize) -> Vec<f32> {
        self.graph.lock().render(frames)
    }

    /// Like [`render`](Self::render) but gives up instead of blocking when the
    /// control side holds the graph.
    pub fn try_render(&self, frames: usize) -> Option<Vec<f32>> {
        self.graph.try_lock().map(|mut graph| graph.render(frames))
    }

    fn create(&self, kind: NodeKind) -> AudioNode {
        let id = {
            let mut graph = self.graph.lock();
            let id = graph.insert(kind);
            if let Some(node) = graph.nodes.get(&id) {
                debug!(context = self.id, node = id.0, kind = node.kind.name(), "Node created");
            }
            id
        };
        self.handle(id)
    }

    fn handle(&self, id: NodeId) -> AudioNode {
        AudioNode {
            context: self.clone(),
            id,
        }
    }
}

/// Handle to one node of a context. Equality is node identity.
#[derive(Clone)]
pub struct AudioNode {
    context: AudioContext,
    id: NodeId,
}

impl fmt::Debug for AudioNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioNode")
            .field("context", &self.context.id)
            .field("id", &self.id.0)
            .finish()
    }
}

impl PartialEq for AudioNode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.context == other.context
    }
}

impl Eq for AudioNode {}

impl AudioNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn context(&self) -> &AudioContext {
        &self.context
    }

    /// Whether the node still exists in its context.
    pub fn is_alive(&self) -> bool {
        self.context.graph.lock().nodes.contains_key(&self.id)
    }

    /// Whether this node produces signal from a media element or stream.
    pub fn is_source(&self) -> bool {
        matches!(
            self.context.graph.lock().nodes.get(&self.id).map(|n| &n.kind),
            Some(NodeKind::ElementSource(_)) | Some(NodeKind::StreamSource(_))
        )
    }

    /// Add an edge from this node to `destination`. Connecting twice is a no-op.
    pub fn connect(&self, destination: &AudioNode) -> std::result::Result<(), GraphError> {
        if self.context != destination.context {
            return Err(GraphError::ContextMismatch);
        }
        let mut graph = self.context.graph.lock();
        if graph.state == ContextState::Closed {
            return Err(GraphError::ContextClosed);
        }
        for id in [self.id, destination.id] {
            if !graph.nodes.contains_key(&id) {
                return Err(GraphError::NodeReleased(id.0));
            }
        }
        if graph.reaches(destination.id, self.id) {
            return Err(GraphError::WouldCycle {
                from: self.id.0,
                to: destination.id.0,
            });
        }
        if let Some(node) = graph.nodes.get_mut(&self.id) {
            if !node.outputs.contains(&destination.id) {
                node.outputs.push(destination.id);
                debug!(from = self.id.0, to = destination.id.0, "Connected");
            }
        }
        Ok(())
    }

    /// Remove every outgoing edge.
    pub fn disconnect(&self) {
        let mut graph = self.context.graph.lock();
        if let Some(node) = graph.nodes.get_mut(&self.id) {
            if !node.outputs.is_empty() {
                node.outputs.clear();
                debug!(node = self.id.0, "Disconnected from all receivers");
            }
        }
    }

    /// Remove the edge to `destination`.
    pub fn disconnect_from(&self, destination: &AudioNode) -> std::result::Result<(), GraphError> {
        let not_connected = GraphError::NotConnected {
            from: self.id.0,
            to: destination.id.0,
        };
        if self.context != destination.context {
            return Err(not_connected);
        }
        let mut graph = self.context.graph.lock();
        let node = graph.nodes.get_mut(&self.id).ok_or(not_connected.clone())?;
        let before = node.outputs.len();
        node.outputs.retain(|&id| id != destination.id);
        if node.outputs.len() == before {
            return Err(not_connected);
        }
        debug!(from = self.id.0, to = destination.id.0, "Disconnected");
        Ok(())
    }

    /// Drop the node from its context along with every edge into or out of
    /// it. Later edits through any handle to it fail with `NodeReleased`.
    /// The destination is never released.
    pub fn release(&self) {
        let mut graph = self.context.graph.lock();
        if self.id == graph.destination || graph.nodes.remove(&self.id).is_none() {
            return;
        }
        for node in graph.nodes.values_mut() {
            node.outputs.retain(|&id| id != self.id);
        }
        debug!(node = self.id.0, "Node released");
    }

    /// Current receivers, in connection order.
    pub fn receivers(&self) -> Vec<AudioNode> {
        let graph = self.context.graph.lock();
        graph
            .nodes
            .get(&self.id)
            .map(|node| node.outputs.clone())
            .unwrap_or_default()
            .into_iter()
            .map(|id| self.context.handle(id))
            .collect()
    }

    pub fn is_connected_to(&self, destination: &AudioNode) -> bool {
        self.receivers().contains(destination)
    }

    pub fn param(&self, kind: ParamKind) -> AudioParam {
        AudioParam {
            node: self.clone(),
            kind,
        }
    }

    pub fn gain(&self) -> AudioParam {
        self.param(ParamKind::Gain)
    }

    pub fn frequency(&self) -> AudioParam {
        self.param(ParamKind::Frequency)
    }

    pub fn q(&self) -> AudioParam {
        self.param(ParamKind::Q)
    }

    pub fn pan(&self) -> AudioParam {
        self.param(ParamKind::Pan)
    }
}

/// Handle to one automatable value of a node.
#[derive(Clone, Debug)]
pub struct AudioParam {
    node: AudioNode,
    kind: ParamKind,
}

impl AudioParam {
    /// Current value, or `None` once the node is gone or lacks this parameter.
    pub fn get(&self) -> Option<f32> {
        let graph = self.node.context.graph.lock();
        graph
            .nodes
            .get(&self.node.id)
            .and_then(|node| node.kind.param(self.kind))
    }

    /// Current value; `0.0` when the parameter no longer exists.
    pub fn value(&self) -> f32 {
        self.get().unwrap_or(0.0)
    }

    /// Set the value. Non-finite values are ignored.
    pub fn set_value(&self, value: f32) {
        if !value.is_finite() {
            return;
        }
        let mut graph = self.node.context.graph.lock();
        if let Some(node) = graph.nodes.get_mut(&self.node.id) {
            node.kind.set_param(self.kind, value);
        }
    }

    pub fn kind(&self) -> ParamKind {
        self.kind
    }
}
