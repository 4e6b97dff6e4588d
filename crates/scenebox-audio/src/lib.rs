//! Scenebox Audio - Mixing engine
//!
//! Routes tracks through channel strips into a master bus.
//!
//! Architecture:
//! - `graph`: In-process audio graph (`AudioContext`, nodes, params, render)
//! - `Track`: One playable source and its output node
//! - `Channel`: EQ / pan / gain strip with effect inserts, transport and fades
//! - `Mixer`: Channels summed into a master gain feeding the destination
//! - `RingBuffer`: Lock-free SPSC queue between capture callbacks and the renderer
//! - `DeviceOutput` / `request_microphone`: cpal-backed physical I/O

pub mod buffer;
pub mod channel;
pub mod element;
pub mod fade;
pub mod graph;
pub mod microphone;
pub mod mixer;
pub mod output;
pub mod preview;
pub mod ring_buffer;
pub mod scene;
pub mod stream;
pub mod track;

pub use buffer::AudioBuffer;
pub use channel::{Channel, ChannelInput, ChannelSource, TransportState};
pub use element::{MediaElement, MediaEvent};
pub use fade::{Fade, FadeDirection};
pub use graph::{
    AudioContext, AudioNode, AudioParam, AudioProcessor, BiquadKind, ContextState, NodeId,
    ParamKind,
};
pub use microphone::{request_microphone, Microphone};
pub use mixer::Mixer;
pub use output::DeviceOutput;
pub use preview::Preview;
pub use ring_buffer::RingBuffer;
pub use scene::load_scene;
pub use stream::{MediaStream, StreamWriter};
pub use track::{Playback, Track, TrackSource};

use scenebox_core::{EngineConfig, Result};

/// Create a mixer that owns a fresh context built from `config`.
pub fn create_mixer(config: &EngineConfig) -> Result<Mixer> {
    config.validate()?;
    Mixer::with_config(config)
}

/// Create a standalone context from `config`, for callers that share one
/// context between several mixers.
pub fn audio_context(config: &EngineConfig) -> Result<AudioContext> {
    config.validate()?;
    Ok(AudioContext::from_config(config))
}
