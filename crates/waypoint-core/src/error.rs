//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("XR error: {0}")]
    Xr(#[from] waypoint_xr::XrError),

    #[error("Marker error: {0}")]
    Marker(#[from] waypoint_markers::MarkerError),

    #[error("Storage error: {0}")]
    Storage(#[from] waypoint_storage::StorageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("No active AR session")]
    NoActiveSession,

    #[error("Saved set not found: {0}")]
    ArchiveNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Renderer failed to take over presentation for a session
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Renderer error: {0}")]
pub struct RenderError(pub String);
