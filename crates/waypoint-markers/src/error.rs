//! Marker error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarkerError {
    #[error("No markers to save")]
    EmptyStore,

    #[error("No saved markers to export")]
    NothingSaved,

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
