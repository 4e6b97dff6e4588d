//! Mixer: channels summed into one master gain feeding the destination.

use crate::channel::Channel;
use crate::graph::{AudioContext, AudioNode, ContextState};
use scenebox_core::{EngineConfig, EqConfig, FadeConfig, Result};
use tracing::{debug, info};

pub struct Mixer {
    context: AudioContext,
    /// Close the context together with the mixer.
    owns_context: bool,
    master: AudioNode,
    channels: Vec<Channel>,
    eq: EqConfig,
    fade: FadeConfig,
}

impl std::fmt::Debug for Mixer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mixer")
            .field("context", &self.context)
            .field("channels", &self.channels)
            .finish()
    }
}

impl Mixer {
    /// A mixer on a caller-owned context, with default channel settings.
    pub fn new(context: AudioContext) -> Result<Self> {
        Self::with_settings(context, &EngineConfig::default())
    }

    /// A mixer on a caller-owned context.
    pub fn with_settings(context: AudioContext, config: &EngineConfig) -> Result<Self> {
        Self::build(context, false, config)
    }

    /// A mixer on a fresh context it owns and closes.
    pub fn with_config(config: &EngineConfig) -> Result<Self> {
        Self::build(AudioContext::from_config(config), true, config)
    }

    fn build(context: AudioContext, owns_context: bool, config: &EngineConfig) -> Result<Self> {
        let master = context.create_gain();
        master.connect(&context.destination())?;
        info!(owns_context, sample_rate = context.sample_rate(), "Mixer created");
        Ok(Self {
            context,
            owns_context,
            master,
            channels: Vec::new(),
            eq: config.eq.clone(),
            fade: config.fade.clone(),
        })
    }

    pub fn context(&self) -> &AudioContext {
        &self.context
    }

    /// Master gain node every channel ends in.
    pub fn input_node(&self) -> &AudioNode {
        &self.master
    }

    /// Add a channel. Without an id (or with an empty one) the channel is
    /// named after the number of channels before it.
    pub fn add_channel(&mut self, id: Option<&str>) -> Result<&mut Channel> {
        let id = match id {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => self.channels.len().to_string(),
        };
        let channel = Channel::new(
            id,
            &self.context,
            &self.master,
            &self.eq,
            self.fade.clone(),
        )?;
        self.channels.push(channel);
        let index = self.channels.len() - 1;
        Ok(&mut self.channels[index])
    }

    /// First channel with `id`.
    pub fn get_channel(&self, id: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.id() == id)
    }

    pub fn get_channel_mut(&mut self, id: &str) -> Option<&mut Channel> {
        self.channels.iter_mut().find(|c| c.id() == id)
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn channels_mut(&mut self) -> &mut [Channel] {
        &mut self.channels
    }

    /// Ask a suspended context to run. Returns the state seen before the
    /// request takes effect; a context that is not suspended is left alone.
    pub fn resume_context(&self) -> ContextState {
        let state = self.context.state();
        if state == ContextState::Suspended {
            self.context.resume();
            debug!("Context resume requested");
        }
        state
    }

    /// Master gain.
    pub fn volume(&self) -> f32 {
        self.master.gain().value()
    }

    pub fn set_volume(&self, volume: f32) {
        self.master.gain().set_value(volume);
    }

    /// Close and drop every channel, release the master stage and, when
    /// owned, close the context. A closed mixer cannot add channels.
    pub fn close(&mut self) {
        let closed = self.channels.len();
        for mut channel in self.channels.drain(..) {
            channel.close();
        }
        self.master.release();
        if self.owns_context {
            self.context.close();
        }
        info!(channels = closed, "Mixer closed");
    }
}
