//! XR error types

use thiserror::Error;

use crate::types::{SessionMode, SpaceType};

/// A rejected platform request (the platform's exception name and message)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{name}: {message}")]
pub struct PlatformError {
    pub name: String,
    pub message: String,
}

impl PlatformError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::new("NotSupportedError", message)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum XrError {
    #[error("WebXR is not available on this platform")]
    UnsupportedPlatform,

    #[error("Session mode not supported: {0}")]
    UnsupportedMode(SessionMode),

    #[error("Session request failed: {0}")]
    SessionRequestFailed(PlatformError),

    #[error("No usable reference space (tried: {})", format_attempted(.attempted))]
    NoUsableReferenceSpace { attempted: Vec<SpaceType> },

    #[error("Hit testing unavailable: {0}")]
    HitTestUnavailable(PlatformError),
}

fn format_attempted(attempted: &[SpaceType]) -> String {
    if attempted.is_empty() {
        return "none".to_string();
    }
    attempted
        .iter()
        .map(SpaceType::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
