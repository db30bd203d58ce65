//! Waypoint AR platform layer
//!
//! Traits over the device AR API (session, reference spaces, hit testing,
//! per-frame poses) plus the two pieces of logic that sit directly on top of
//! it: reference-space negotiation and the hit-test subscription tracker.

mod error;
mod platform;
mod pose;
pub mod sim;
mod space;
mod types;

pub use error::{PlatformError, XrError};
pub use hit_test::{HitTestStatus, HitTestTracker};
pub use platform::{PendingHitTestSource, XrFrame, XrSession, XrSystem};
pub use pose::Pose;
pub use space::{NegotiatedSpace, SpaceNegotiator};
pub use types::{EntityType, Feature, HitTestRequest, SessionInit, SessionMode, SpaceType};

pub type Result<T> = std::result::Result<T, XrError>;
