//! Waypoint Core
//!
//! Session lifecycle and marker placement for a WebXR-style AR walk.
//! The controller owns all session state; renderer and UI only receive
//! commands.

mod archive;
mod config;
mod controller;
mod error;
mod interface;
mod state;
mod status;

pub use archive::{ArchivedSet, WaypointArchive};
pub use config::Config;
pub use controller::{FrameOf, SessionController, SessionOf, SourceOf, CLEAR_PROMPT};
pub use error::{CoreError, RenderError};
pub use interface::{Affordances, EndSignal, Interface, Renderer};
pub use state::ControllerState;
pub use status::Status;

// Re-export the layers the controller is built on
pub use waypoint_markers::{
    ExportFile, ExportedMarker, FallbackPlacement, Marker, MarkerError, MarkerStore, Position,
};
pub use waypoint_storage::{Database, StorageError};
pub use waypoint_xr::{
    EntityType, Feature, HitTestStatus, PlatformError, Pose, SessionInit, SessionMode, SpaceType,
    XrError, XrFrame, XrSession, XrSystem,
};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
