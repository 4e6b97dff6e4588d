//! Error types for Scenebox.

use thiserror::Error;

/// Failures raised by the audio graph when editing its topology.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("nodes belong to different audio contexts")]
    ContextMismatch,

    #[error("audio context is closed")]
    ContextClosed,

    #[error("node {0} is not part of the graph")]
    NodeReleased(u32),

    #[error("connecting node {from} to node {to} would create a cycle")]
    WouldCycle { from: u32, to: u32 },

    #[error("node {from} is not connected to node {to}")]
    NotConnected { from: u32, to: u32 },
}

/// Main error type for Scenebox operations.
#[derive(Error, Debug)]
pub enum SceneboxError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Custom node not found in the channel's node list")]
    NodeNotFound,

    #[error("Cannot create media source: {0}")]
    SourceCreation(String),

    #[error("Playback failed: {0}")]
    Transport(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Decoder error: {0}")]
    Decode(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Audio device error: {0}")]
    Device(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for SceneboxError {
    fn from(err: serde_json::Error) -> Self {
        SceneboxError::Serialization(err.to_string())
    }
}

/// Result type alias for Scenebox operations.
pub type Result<T> = std::result::Result<T, SceneboxError>;
