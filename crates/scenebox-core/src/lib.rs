//! Scenebox Core - Foundation types for the soundboard
//!
//! This crate provides the types shared by the audio engine and the app:
//! - Error types (`SceneboxError`, `GraphError`)
//! - Engine configuration
//! - Catalog data (sounds, scenes, categories, genres)
//! - Time formatting helpers

pub mod catalog;
pub mod config;
pub mod error;
pub mod time;

pub use catalog::{Library, Scene, SceneItem, Sound, SoundCategory, SoundGenre};
pub use config::{EngineConfig, EqConfig, FadeConfig};
pub use error::{GraphError, Result, SceneboxError};
pub use time::human_time_interval;
