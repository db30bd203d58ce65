//! Device AR API seam
//!
//! Everything here is implemented once per host: by the browser glue over
//! `navigator.xr`, and by [`crate::sim`] for tests and replays. Execution is
//! single-threaded, so none of the futures are required to be `Send`.
#![allow(async_fn_in_trait)]

use futures_util::future::LocalBoxFuture;

use crate::error::PlatformError;
use crate::pose::Pose;
use crate::types::{HitTestRequest, SessionInit, SessionMode, SpaceType};

/// A hit-test subscription that has been requested but may not have resolved.
///
/// The future owns everything it needs so it can be stored and polled from
/// later frames.
pub type PendingHitTestSource<T> = LocalBoxFuture<'static, Result<T, PlatformError>>;

/// Entry point to the platform AR subsystem (`navigator.xr`)
pub trait XrSystem {
    type Session: XrSession;

    /// Whether an AR capability API exists at all
    fn is_available(&self) -> bool;

    async fn is_session_supported(&self, mode: SessionMode) -> Result<bool, PlatformError>;

    async fn request_session(
        &self,
        mode: SessionMode,
        init: &SessionInit,
    ) -> Result<Self::Session, PlatformError>;
}

pub trait XrSession {
    type Space: Clone;
    type HitTestSource;
    type Frame: XrFrame<Space = Self::Space, HitTestSource = Self::HitTestSource>;

    async fn request_reference_space(&self, space: SpaceType) -> Result<Self::Space, PlatformError>;

    /// Starts a hit-test subscription; resolution is observed by polling
    fn request_hit_test_source(
        &self,
        request: HitTestRequest<Self::Space>,
    ) -> PendingHitTestSource<Self::HitTestSource>;

    /// Asks the platform to end the session. The platform later fires its end event.
    fn end(&self);
}

/// Per-frame view of the world
pub trait XrFrame {
    type Space;
    type HitTestSource;

    /// Predicted display time in milliseconds, unique per frame
    fn time(&self) -> f64;

    fn viewer_pose(&self, space: &Self::Space) -> Option<Pose>;

    /// Intersections for this frame, nearest first
    fn hit_test_results(&self, source: &Self::HitTestSource, space: &Self::Space) -> Vec<Pose>;
}
