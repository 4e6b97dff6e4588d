//! Engine configuration.
//!
//! Loaded from a JSON file; every field has a default so a partial (or
//! empty) document is valid.

use crate::error::{Result, SceneboxError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Centre frequencies and Q of a channel's three EQ bands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EqConfig {
    /// Low-shelf corner frequency in Hz.
    pub low_hz: f32,
    /// Mid peaking centre frequency in Hz.
    pub mid_hz: f32,
    /// High-shelf corner frequency in Hz.
    pub high_hz: f32,
    /// Quality factor shared by all three bands.
    pub q: f32,
}

impl Default for EqConfig {
    fn default() -> Self {
        Self {
            low_hz: 320.0,
            mid_hz: 1000.0,
            high_hz: 3200.0,
            q: 1.0,
        }
    }
}

/// Timing of channel fades.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FadeConfig {
    /// Interval between two gain updates, in milliseconds.
    pub tick_ms: u64,
    /// Duration used when a fade is requested without one.
    pub default_ms: u64,
}

impl Default for FadeConfig {
    fn default() -> Self {
        Self {
            tick_ms: 2,
            default_ms: 2000,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Rendering sample rate of new audio contexts.
    pub sample_rate: u32,
    /// Frames rendered per quantum by the device output.
    pub block_size: usize,
    /// New contexts start suspended until `resume` is requested.
    pub start_suspended: bool,
    pub eq: EqConfig,
    pub fade: FadeConfig,
    /// Default `tracing` filter directive for the binary.
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            block_size: 128,
            start_suspended: true,
            eq: EqConfig::default(),
            fade: FadeConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from a JSON string.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(SceneboxError::InvalidParameter(
                "sample_rate must be positive".into(),
            ));
        }
        if self.block_size == 0 {
            return Err(SceneboxError::InvalidParameter(
                "block_size must be positive".into(),
            ));
        }
        if self.fade.tick_ms == 0 || self.fade.default_ms == 0 {
            return Err(SceneboxError::InvalidParameter(
                "fade timings must be positive".into(),
            ));
        }
        Ok(())
    }
}
