//! Scripted AR device
//!
//! Implements the platform traits in memory from a [`DeviceProfile`]. Every
//! request the application makes is recorded in a shared [`SimLog`] so tests
//! can assert on call order. Frames are produced on demand and advance the
//! device clock, which is what pending hit-test subscriptions resolve against.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::task::Poll;

use futures_util::future::{self, FutureExt};
use serde::{Deserialize, Serialize};

use crate::error::PlatformError;
use crate::platform::{PendingHitTestSource, XrFrame, XrSession, XrSystem};
use crate::pose::Pose;
use crate::types::{EntityType, Feature, HitTestRequest, SessionInit, SessionMode, SpaceType};

/// Milliseconds between simulated frames (60 Hz)
const FRAME_INTERVAL_MS: f64 = 1000.0 / 60.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum HitTestBehavior {
    /// Subscription resolves once this many frames have been produced
    ResolveAfter { frames: u64 },
    /// Every subscription request is rejected
    Reject,
    /// Plane-only requests are rejected; requests including points or meshes resolve
    RequiresBroadFilter { frames: u64 },
}

impl Default for HitTestBehavior {
    fn default() -> Self {
        HitTestBehavior::ResolveAfter { frames: 1 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceProfile {
    /// Whether `navigator.xr` exists
    pub xr_available: bool,
    pub supported_modes: Vec<SessionMode>,
    /// Makes the capability probe itself fail
    pub probe_error: Option<String>,
    pub grantable_features: Vec<Feature>,
    /// Reference space types the device accepts
    pub reference_spaces: Vec<SpaceType>,
    pub hit_test: HitTestBehavior,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            xr_available: true,
            supported_modes: vec![SessionMode::ImmersiveAr, SessionMode::Inline],
            probe_error: None,
            grantable_features: vec![
                Feature::HitTest,
                Feature::DomOverlay,
                Feature::Anchors,
                Feature::Local,
                Feature::LocalFloor,
                Feature::Unbounded,
            ],
            reference_spaces: vec![
                SpaceType::LocalFloor,
                SpaceType::Local,
                SpaceType::Unbounded,
                SpaceType::Viewer,
            ],
            hit_test: HitTestBehavior::default(),
        }
    }
}

/// Everything the application asked the device for
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimLog {
    pub session_requests: usize,
    pub granted_features: Vec<Feature>,
    pub space_requests: Vec<SpaceType>,
    pub hit_test_requests: Vec<Vec<EntityType>>,
    pub end_calls: usize,
}

pub struct SimDevice {
    profile: DeviceProfile,
    log: Rc<RefCell<SimLog>>,
    last_session: RefCell<Option<SimSession>>,
}

impl SimDevice {
    pub fn new(profile: DeviceProfile) -> Self {
        Self {
            profile,
            log: Rc::new(RefCell::new(SimLog::default())),
            last_session: RefCell::new(None),
        }
    }

    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    pub fn log(&self) -> SimLog {
        self.log.borrow().clone()
    }

    /// Handle to the most recently created session, for producing frames
    pub fn session(&self) -> Option<SimSession> {
        self.last_session.borrow().clone()
    }
}

impl XrSystem for SimDevice {
    type Session = SimSession;

    fn is_available(&self) -> bool {
        self.profile.xr_available
    }

    async fn is_session_supported(&self, mode: SessionMode) -> Result<bool, PlatformError> {
        if let Some(message) = &self.profile.probe_error {
            return Err(PlatformError::new("SecurityError", message.clone()));
        }
        Ok(self.profile.supported_modes.contains(&mode))
    }

    async fn request_session(
        &self,
        mode: SessionMode,
        init: &SessionInit,
    ) -> Result<SimSession, PlatformError> {
        self.log.borrow_mut().session_requests += 1;

        if !self.profile.supported_modes.contains(&mode) {
            return Err(PlatformError::not_supported(format!(
                "The specified session mode is not supported: {}",
                mode
            )));
        }

        if let Some(missing) = init
            .required_features
            .iter()
            .find(|f| !self.profile.grantable_features.contains(f))
        {
            return Err(PlatformError::not_supported(format!(
                "Required feature '{}' is not supported",
                missing
            )));
        }

        let granted: Vec<Feature> = init
            .required_features
            .iter()
            .chain(init.optional_features.iter())
            .copied()
            .filter(|f| self.profile.grantable_features.contains(f))
            .collect();
        self.log.borrow_mut().granted_features = granted.clone();

        let session = SimSession {
            shared: Rc::new(Shared {
                profile: self.profile.clone(),
                granted,
                log: Rc::clone(&self.log),
                clock: Cell::new(0),
            }),
        };
        *self.last_session.borrow_mut() = Some(session.clone());

        Ok(session)
    }
}

struct Shared {
    profile: DeviceProfile,
    granted: Vec<Feature>,
    log: Rc<RefCell<SimLog>>,
    /// Frames produced so far
    clock: Cell<u64>,
}

#[derive(Clone)]
pub struct SimSession {
    shared: Rc<Shared>,
}

impl SimSession {
    pub fn granted_features(&self) -> &[Feature] {
        &self.shared.granted
    }

    /// Produce the next frame
    pub fn frame(&self, viewer: Option<Pose>, hits: Vec<Pose>) -> SimFrame {
        let index = self.shared.clock.get() + 1;
        self.shared.clock.set(index);

        SimFrame {
            time: index as f64 * FRAME_INTERVAL_MS,
            viewer,
            hits,
        }
    }

    fn resolve_after(&self, frames: u64, source: SimHitTestSource) -> PendingHitTestSource<SimHitTestSource> {
        let shared = Rc::clone(&self.shared);
        let due = shared.clock.get() + frames;
        let mut source = Some(source);

        future::poll_fn(move |_cx| {
            if shared.clock.get() < due {
                return Poll::Pending;
            }
            match source.take() {
                Some(source) => Poll::Ready(Ok(source)),
                None => Poll::Pending,
            }
        })
        .boxed_local()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimSpace {
    space_type: SpaceType,
}

impl SimSpace {
    pub fn space_type(&self) -> SpaceType {
        self.space_type
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimHitTestSource {
    pub entity_types: Vec<EntityType>,
}

impl XrSession for SimSession {
    type Space = SimSpace;
    type HitTestSource = SimHitTestSource;
    type Frame = SimFrame;

    async fn request_reference_space(&self, space: SpaceType) -> Result<SimSpace, PlatformError> {
        self.shared.log.borrow_mut().space_requests.push(space);

        if self.shared.profile.reference_spaces.contains(&space) {
            Ok(SimSpace { space_type: space })
        } else {
            Err(PlatformError::not_supported(format!(
                "This device does not support the requested reference space type: {}",
                space
            )))
        }
    }

    fn request_hit_test_source(
        &self,
        request: HitTestRequest<SimSpace>,
    ) -> PendingHitTestSource<SimHitTestSource> {
        self.shared
            .log
            .borrow_mut()
            .hit_test_requests
            .push(request.entity_types.clone());

        if !self.shared.granted.contains(&Feature::HitTest) {
            return future::ready(Err(PlatformError::not_supported(
                "hit-test feature was not granted for this session",
            )))
            .boxed_local();
        }

        let source = SimHitTestSource {
            entity_types: request.entity_types.clone(),
        };

        match self.shared.profile.hit_test {
            HitTestBehavior::ResolveAfter { frames } => self.resolve_after(frames, source),
            HitTestBehavior::Reject => future::ready(Err(PlatformError::new(
                "OperationError",
                "Hit test source could not be created",
            )))
            .boxed_local(),
            HitTestBehavior::RequiresBroadFilter { frames } => {
                let broad = request
                    .entity_types
                    .iter()
                    .any(|t| matches!(t, EntityType::Point | EntityType::Mesh));
                if broad {
                    self.resolve_after(frames, source)
                } else {
                    future::ready(Err(PlatformError::not_supported(
                        "Plane detection is not available",
                    )))
                    .boxed_local()
                }
            }
        }
    }

    fn end(&self) {
        self.shared.log.borrow_mut().end_calls += 1;
    }
}

#[derive(Debug, Clone)]
pub struct SimFrame {
    time: f64,
    viewer: Option<Pose>,
    hits: Vec<Pose>,
}

impl XrFrame for SimFrame {
    type Space = SimSpace;
    type HitTestSource = SimHitTestSource;

    fn time(&self) -> f64 {
        self.time
    }

    fn viewer_pose(&self, _space: &SimSpace) -> Option<Pose> {
        self.viewer
    }

    fn hit_test_results(&self, _source: &SimHitTestSource, _space: &SimSpace) -> Vec<Pose> {
        self.hits.clone()
    }
}
