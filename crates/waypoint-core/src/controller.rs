//! AR session controller
//!
//! Owns the single live session and everything derived from it: the bound
//! reference space, the hit-test subscription, the latest camera and hit
//! poses, and the markers placed during the session. All transitions run on
//! a user command or inside [`SessionController::on_frame`], never
//! concurrently.

use chrono::Utc;
use uuid::Uuid;
use waypoint_markers::{
    coordinate_label, resolve_position, ExportFile, ExportedMarker, Marker, MarkerError,
    MarkerStore, PlacementSource,
};
use waypoint_xr::{
    HitTestRequest, HitTestStatus, HitTestTracker, PlatformError, Pose, SpaceNegotiator,
    SpaceType, XrError, XrFrame, XrSession, XrSystem,
};

use crate::archive::WaypointArchive;
use crate::config::Config;
use crate::error::CoreError;
use crate::interface::{Affordances, EndSignal, Interface, Renderer};
use crate::state::ControllerState;
use crate::status::Status;
use crate::Result;

pub const CLEAR_PROMPT: &str = "Clear all markers?";

pub type SessionOf<P> = <P as XrSystem>::Session;
pub type SourceOf<P> = <SessionOf<P> as XrSession>::HitTestSource;
pub type FrameOf<P> = <SessionOf<P> as XrSession>::Frame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndReason {
    User,
    Platform,
}

impl EndReason {
    fn as_str(&self) -> &'static str {
        match self {
            EndReason::User => "user",
            EndReason::Platform => "platform",
        }
    }
}

/// Everything that only exists while a session is live
struct LiveSession<S: XrSession> {
    id: Uuid,
    session: S,
    space_type: SpaceType,
    space: S::Space,
    camera: Option<Pose>,
    hit: Option<Pose>,
    auto_placed: bool,
}

pub struct SessionController<P, R, U>
where
    P: XrSystem,
    R: Renderer<Session = SessionOf<P>>,
    U: Interface,
{
    config: Config,
    platform: P,
    renderer: R,
    ui: U,
    negotiator: SpaceNegotiator,
    state: ControllerState,
    live: Option<LiveSession<SessionOf<P>>>,
    hit_test: HitTestTracker<SourceOf<P>>,
    markers: MarkerStore<R::Handle>,
    /// Last saved export; outlives the session so it can still be downloaded
    saved: Vec<ExportedMarker>,
    archive: Option<WaypointArchive>,
    end_signal: EndSignal,
    frame_loop: bool,
}

impl<P, R, U> SessionController<P, R, U>
where
    P: XrSystem,
    R: Renderer<Session = SessionOf<P>>,
    U: Interface,
{
    pub fn new(config: Config, platform: P, renderer: R, ui: U) -> Self {
        let negotiator = SpaceNegotiator::new(config.reference_spaces.clone());
        let markers = MarkerStore::with_label_prefix(config.label_prefix.clone());

        Self {
            config,
            platform,
            renderer,
            ui,
            negotiator,
            state: ControllerState::Idle,
            live: None,
            hit_test: HitTestTracker::new(),
            markers,
            saved: Vec::new(),
            archive: None,
            end_signal: EndSignal::default(),
            frame_loop: false,
        }
    }

    pub fn with_archive(mut self, archive: WaypointArchive) -> Self {
        self.archive = Some(archive);
        self
    }

    fn transition(&mut self, target: ControllerState) -> Result<()> {
        if !self.state.can_transition_to(target) {
            return Err(CoreError::InvalidTransition {
                from: self.state.to_string(),
                to: target.to_string(),
            });
        }

        tracing::debug!(from = %self.state, to = %target, "Controller state transition");
        self.state = target;
        Ok(())
    }

    fn refresh_affordances(&mut self) {
        let affordances =
            Affordances::for_state(self.state, self.markers.count(), !self.saved.is_empty());
        self.ui.set_affordances(&affordances);
    }

    /// Startup capability check; shows the start control when AR is available
    pub async fn probe(&mut self) -> bool {
        let mode = self.config.session_mode;

        let status = if !self.platform.is_available() {
            tracing::info!("WebXR not available");
            Status::Unsupported {
                reason: XrError::UnsupportedPlatform.to_string(),
            }
        } else {
            match self.platform.is_session_supported(mode).await {
                Ok(true) => {
                    tracing::info!(mode = %mode, "AR is supported");
                    Status::Supported
                }
                Ok(false) => Status::Unsupported {
                    reason: XrError::UnsupportedMode(mode).to_string(),
                },
                Err(e) => {
                    tracing::warn!(error = %e, "Checking AR support failed");
                    Status::Unsupported {
                        reason: e.to_string(),
                    }
                }
            }
        };

        let supported = status == Status::Supported;
        self.ui.show_status(&status);
        let mut affordances = Affordances::for_state(self.state, 0, !self.saved.is_empty());
        affordances.start_visible &= supported;
        self.ui.set_affordances(&affordances);

        supported
    }

    /// Request a session, bind it and negotiate a reference space
    pub async fn start(&mut self) -> Result<()> {
        self.transition(ControllerState::Requesting)?;
        self.end_signal.reset();
        self.ui.show_status(&Status::Starting);

        tracing::info!(mode = %self.config.session_mode, "Starting AR session");

        let live = match self.open_session().await {
            Ok(live) => live,
            Err(e) => {
                tracing::error!(error = %e, "AR session failed to start");
                self.transition(ControllerState::Idle)?;
                self.ui.show_status(&Status::StartFailed {
                    reason: e.to_string(),
                });
                self.refresh_affordances();
                return Err(e.into());
            }
        };

        if self.config.hit_test {
            self.hit_test
                .activate(&live.session, HitTestRequest::planes(live.space.clone()));
        }

        if let Some(archive) = self.archive.as_ref() {
            if let Err(e) = archive.remember_space(live.space_type) {
                tracing::warn!(error = %e, "Could not record reference space");
            }
        }

        if !live.space_type.is_world_locked() {
            tracing::warn!(space = %live.space_type, "Markers will move with the viewer");
        }

        tracing::info!(
            session_id = %live.id,
            space = %live.space_type,
            hit_test = self.config.hit_test,
            "AR session started"
        );

        self.live = Some(live);
        self.renderer.set_frame_loop(true);
        self.frame_loop = true;
        self.transition(ControllerState::Active)?;

        self.ui.show_status(&Status::Placing {
            hit_test: self.config.hit_test,
        });
        self.ui.set_marker_count(self.markers.count());
        self.refresh_affordances();

        Ok(())
    }

    async fn open_session(&mut self) -> std::result::Result<LiveSession<SessionOf<P>>, XrError> {
        if !self.platform.is_available() {
            return Err(XrError::UnsupportedPlatform);
        }

        let mode = self.config.session_mode;
        match self.platform.is_session_supported(mode).await {
            Ok(true) => {}
            Ok(false) => return Err(XrError::UnsupportedMode(mode)),
            Err(e) => {
                tracing::warn!(error = %e, "Checking AR support failed");
                return Err(XrError::UnsupportedMode(mode));
            }
        }

        let session = self
            .platform
            .request_session(mode, &self.config.session_init())
            .await
            .map_err(XrError::SessionRequestFailed)?;

        if let Err(e) = self.renderer.bind_session(&session).await {
            session.end();
            return Err(XrError::SessionRequestFailed(PlatformError::new(
                "RenderError",
                e.0,
            )));
        }

        let negotiated = match self.negotiator.negotiate(&session).await {
            Ok(negotiated) => negotiated,
            Err(e) => {
                self.renderer.unbind_session();
                session.end();
                return Err(e);
            }
        };

        Ok(LiveSession {
            id: Uuid::new_v4(),
            session,
            space_type: negotiated.space_type,
            space: negotiated.space,
            camera: None,
            hit: None,
            auto_placed: false,
        })
    }

    /// Per-frame callback
    pub fn on_frame(&mut self, frame: &FrameOf<P>) {
        if !self.state.is_active() || !self.frame_loop {
            tracing::trace!("Dropping frame outside an active session");
            return;
        }
        if self.process_end_signal() {
            return;
        }

        let Some(live) = self.live.as_mut() else {
            return;
        };

        if let Some(pose) = frame.viewer_pose(&live.space) {
            live.camera = Some(pose);
            self.renderer.update_camera(&pose);
        }

        let hit = self.hit_test.sample_frame(frame, &live.space);
        live.hit = hit;
        self.renderer.update_reticle(hit.as_ref());

        if let Some(failure) = self.hit_test.take_failure() {
            self.handle_hit_test_failure(failure);
        }

        // Listeners may have fired while the frame was being processed
        if self.process_end_signal() {
            return;
        }

        self.auto_place();
        self.process_end_signal();
    }

    fn handle_hit_test_failure(&mut self, failure: XrError) {
        let retried = self.config.retry_hit_test_with_broader_filter
            && self.live.as_ref().is_some_and(|live| {
                self.hit_test
                    .retry(&live.session, HitTestRequest::broad(live.space.clone()))
            });
        if retried {
            return;
        }

        tracing::warn!(error = %failure, "Falling back to camera-relative placement");
        self.ui.show_status(&Status::HitTestUnavailable);
    }

    fn auto_place(&mut self) {
        if !self.config.auto_place_on_first_surface || !self.markers.is_empty() {
            return;
        }
        let Some(live) = self.live.as_ref() else {
            return;
        };
        if live.auto_placed {
            return;
        }

        // Without hit testing the first known camera pose is as good as it gets
        let surface_found = live.hit.is_some();
        let no_surface_coming = matches!(
            self.hit_test.status(),
            HitTestStatus::Inactive | HitTestStatus::Unavailable
        ) && live.camera.is_some();

        if !(surface_found || no_surface_coming) {
            return;
        }

        if let Some(live) = self.live.as_mut() {
            live.auto_placed = true;
        }
        let marker = self.place_now();
        self.ui.show_status(&Status::FirstPlaced {
            sequence: marker.sequence,
        });
    }

    /// Place a marker at the reticle, or at the fallback position without one
    pub fn place_marker(&mut self) -> Result<Marker> {
        if !self.state.is_active() {
            self.ui.show_status(&Status::NotActive);
            return Err(CoreError::NoActiveSession);
        }

        let marker = self.place_now();
        self.ui.show_status(&Status::Placed {
            sequence: marker.sequence,
            coordinates: coordinate_label(marker.position),
        });
        Ok(marker)
    }

    fn place_now(&mut self) -> Marker {
        let (hit, camera) = self
            .live
            .as_ref()
            .map(|live| (live.hit, live.camera))
            .unwrap_or((None, None));
        let placement = resolve_position(hit.as_ref(), camera.as_ref(), &self.config.fallback);

        let renderer = &mut self.renderer;
        let marker = self.markers.place_with(placement.position, |marker| {
            renderer.add_marker(marker.position, &coordinate_label(marker.position))
        });

        tracing::info!(
            sequence = marker.sequence,
            on_surface = placement.source == PlacementSource::Surface,
            position = %coordinate_label(marker.position),
            "Marker placed"
        );

        self.ui.set_marker_count(self.markers.count());
        self.refresh_affordances();
        marker
    }

    /// User-requested end
    pub fn end(&mut self) -> bool {
        if let Some(live) = self.live.as_ref() {
            live.session.end();
        }
        self.teardown(EndReason::User)
    }

    /// Platform end event (back button, app switch, error)
    pub fn on_session_end(&mut self) -> bool {
        self.teardown(EndReason::Platform)
    }

    /// Tear down if a listener fired the end signal; true when a teardown ran
    pub fn process_end_signal(&mut self) -> bool {
        if self.end_signal.is_fired() {
            return self.teardown(EndReason::Platform);
        }
        false
    }

    pub fn end_signal(&self) -> EndSignal {
        self.end_signal.clone()
    }

    fn teardown(&mut self, reason: EndReason) -> bool {
        if self.transition(ControllerState::Ended).is_err() {
            tracing::debug!(reason = reason.as_str(), state = %self.state, "Nothing to tear down");
            self.end_signal.reset();
            return false;
        }

        // Stop frames before the state they read goes away
        self.renderer.set_frame_loop(false);
        self.frame_loop = false;

        let live = self.live.take();
        self.hit_test.reset();
        for handle in self.markers.clear() {
            self.renderer.remove_marker(handle);
        }
        self.renderer.update_reticle(None);
        self.renderer.unbind_session();
        self.end_signal.reset();

        if let Some(live) = &live {
            tracing::info!(session_id = %live.id, reason = reason.as_str(), "AR session ended");
        }

        if let Err(e) = self.transition(ControllerState::Idle) {
            tracing::error!(error = %e, "Teardown left the controller stuck");
        }
        self.ui.show_status(&Status::Ended);
        self.ui.set_marker_count(0);
        self.refresh_affordances();

        true
    }

    /// Snapshot the current markers as the saved set
    pub fn save(&mut self) -> Result<usize> {
        if self.markers.is_empty() {
            self.ui.show_status(&Status::NothingToSave);
            return Err(MarkerError::EmptyStore.into());
        }

        let snapshot = self.markers.export();
        let count = snapshot.len();

        if let (Some(archive), Some(live)) = (self.archive.as_ref(), self.live.as_ref()) {
            if let Err(e) = archive.record(&live.id.to_string(), &snapshot) {
                tracing::error!(error = %e, "Archiving saved markers failed");
                self.ui.show_status(&Status::SaveFailed {
                    reason: e.to_string(),
                });
                self.refresh_affordances();
                return Err(e);
            }
        }

        self.saved = snapshot;
        tracing::info!(count, "Saved markers");
        self.ui.show_status(&Status::Saved { count });
        self.refresh_affordances();

        Ok(count)
    }

    /// Download payload for the saved set
    pub fn export_file(&mut self) -> Result<ExportFile> {
        if self.saved.is_empty() {
            self.ui.show_status(&Status::NothingSaved);
            return Err(MarkerError::NothingSaved.into());
        }

        let file = ExportFile::new(&self.saved, Utc::now().date_naive())?;
        self.ui.show_status(&Status::Exported {
            count: self.saved.len(),
        });
        Ok(file)
    }

    /// Remove every marker after the user confirms
    pub fn clear_markers(&mut self) -> bool {
        if !self.ui.confirm(CLEAR_PROMPT) {
            return false;
        }

        for handle in self.markers.clear() {
            self.renderer.remove_marker(handle);
        }
        tracing::info!("All markers cleared");

        self.ui.show_status(&Status::Cleared);
        self.ui.set_marker_count(0);
        self.refresh_affordances();
        true
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn marker_count(&self) -> usize {
        self.markers.count()
    }

    pub fn markers(&self) -> impl Iterator<Item = &Marker> {
        self.markers.markers()
    }

    pub fn saved(&self) -> &[ExportedMarker] {
        &self.saved
    }

    pub fn space_type(&self) -> Option<SpaceType> {
        self.live.as_ref().map(|live| live.space_type)
    }

    pub fn camera_pose(&self) -> Option<Pose> {
        self.live.as_ref().and_then(|live| live.camera)
    }

    pub fn hit_pose(&self) -> Option<Pose> {
        self.live.as_ref().and_then(|live| live.hit)
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.live.as_ref().map(|live| live.id)
    }

    pub fn hit_test_status(&self) -> HitTestStatus {
        self.hit_test.status()
    }

    pub fn archive(&self) -> Option<&WaypointArchive> {
        self.archive.as_ref()
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn ui(&self) -> &U {
        &self.ui
    }

    pub fn ui_mut(&mut self) -> &mut U {
        &mut self.ui
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use waypoint_storage::Database;
    use waypoint_xr::sim::{DeviceProfile, HitTestBehavior, SimDevice, SimFrame, SimSession};
    use waypoint_xr::{EntityType, Feature, SessionMode};

    use crate::error::RenderError;

    #[derive(Default)]
    struct RecordingRenderer {
        binds: usize,
        unbinds: usize,
        frame_loop: Vec<bool>,
        camera_updates: usize,
        reticle: Option<Pose>,
        markers: Vec<(u32, Vec3, String)>,
        next_handle: u32,
        fail_bind: bool,
        end_on_camera: Option<EndSignal>,
    }

    impl Renderer for RecordingRenderer {
        type Session = SimSession;
        type Handle = u32;

        async fn bind_session(&mut self, _session: &SimSession) -> std::result::Result<(), RenderError> {
            if self.fail_bind {
                return Err(RenderError("context lost".to_string()));
            }
            self.binds += 1;
            Ok(())
        }

        fn unbind_session(&mut self) {
            self.unbinds += 1;
        }

        fn set_frame_loop(&mut self, running: bool) {
            self.frame_loop.push(running);
        }

        fn update_camera(&mut self, _pose: &Pose) {
            self.camera_updates += 1;
            if let Some(signal) = &self.end_on_camera {
                signal.fire();
            }
        }

        fn update_reticle(&mut self, pose: Option<&Pose>) {
            self.reticle = pose.copied();
        }

        fn add_marker(&mut self, position: Vec3, label: &str) -> u32 {
            self.next_handle += 1;
            self.markers.push((self.next_handle, position, label.to_string()));
            self.next_handle
        }

        fn remove_marker(&mut self, handle: u32) {
            self.markers.retain(|(h, _, _)| *h != handle);
        }
    }

    struct RecordingUi {
        statuses: Vec<Status>,
        affordances: Affordances,
        count: usize,
        prompts: Vec<String>,
        confirm_answer: bool,
    }

    impl Default for RecordingUi {
        fn default() -> Self {
            Self {
                statuses: Vec::new(),
                affordances: Affordances::default(),
                count: 0,
                prompts: Vec::new(),
                confirm_answer: true,
            }
        }
    }

    impl RecordingUi {
        fn last_status(&self) -> Option<&Status> {
            self.statuses.last()
        }
    }

    impl Interface for RecordingUi {
        fn show_status(&mut self, status: &Status) {
            self.statuses.push(status.clone());
        }

        fn set_affordances(&mut self, affordances: &Affordances) {
            self.affordances = *affordances;
        }

        fn set_marker_count(&mut self, count: usize) {
            self.count = count;
        }

        fn confirm(&mut self, prompt: &str) -> bool {
            self.prompts.push(prompt.to_string());
            self.confirm_answer
        }
    }

    type TestController = SessionController<SimDevice, RecordingRenderer, RecordingUi>;

    fn controller(profile: DeviceProfile, config: Config) -> TestController {
        SessionController::new(
            config,
            SimDevice::new(profile),
            RecordingRenderer::default(),
            RecordingUi::default(),
        )
    }

    fn default_controller() -> TestController {
        controller(DeviceProfile::default(), Config::default())
    }

    fn with_hit_test(behavior: HitTestBehavior) -> DeviceProfile {
        DeviceProfile {
            hit_test: behavior,
            ..DeviceProfile::default()
        }
    }

    fn auto_place() -> Config {
        Config {
            auto_place_on_first_surface: true,
            ..Config::default()
        }
    }

    fn standing() -> Pose {
        Pose::at(Vec3::new(0.0, 1.6, 0.0))
    }

    fn floor_hit(x: f32) -> Pose {
        Pose::at(Vec3::new(x, 0.0, -1.2))
    }

    fn frame(c: &TestController, hits: Vec<Pose>) -> SimFrame {
        c.platform()
            .session()
            .expect("session created")
            .frame(Some(standing()), hits)
    }

    fn step(c: &mut TestController, hits: Vec<Pose>) {
        let f = frame(c, hits);
        c.on_frame(&f);
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let mut c = default_controller();

        assert!(c.probe().await);
        assert_eq!(c.ui().last_status(), Some(&Status::Supported));
        assert!(c.ui().affordances.start_visible);

        c.start().await.unwrap();
        assert_eq!(c.state(), ControllerState::Active);
        assert_eq!(c.space_type(), Some(SpaceType::LocalFloor));
        assert_eq!(c.renderer().binds, 1);
        assert_eq!(c.renderer().frame_loop, vec![true]);
        assert!(c.ui().affordances.place_enabled);

        step(&mut c, vec![floor_hit(0.3), floor_hit(2.0)]);
        assert_eq!(c.hit_test_status(), HitTestStatus::Ready);
        assert_eq!(c.hit_pose(), Some(floor_hit(0.3)));
        assert_eq!(c.camera_pose(), Some(standing()));
        assert_eq!(c.renderer().reticle, Some(floor_hit(0.3)));

        let marker = c.place_marker().unwrap();
        assert_eq!(marker.sequence, 1);
        assert_eq!(marker.position, floor_hit(0.3).position);
        assert_eq!(c.ui().count, 1);
        assert_eq!(c.renderer().markers[0].2, "(0.30, 0.00, -1.20)");
        assert!(matches!(
            c.ui().last_status(),
            Some(Status::Placed { sequence: 1, .. })
        ));

        assert!(c.end());
        assert_eq!(c.state(), ControllerState::Idle);
        assert_eq!(c.platform().log().end_calls, 1);
        assert_eq!(c.renderer().unbinds, 1);
        assert_eq!(c.renderer().frame_loop, vec![true, false]);
        assert!(c.renderer().markers.is_empty());
        assert_eq!(c.renderer().reticle, None);
        assert_eq!(c.marker_count(), 0);
        assert_eq!(c.ui().count, 0);
        assert_eq!(c.ui().last_status(), Some(&Status::Ended));
        assert!(c.ui().affordances.start_visible);
        assert!(!c.ui().affordances.end_visible);
    }

    #[tokio::test]
    async fn test_unsupported_platform() {
        let mut c = controller(
            DeviceProfile {
                xr_available: false,
                ..DeviceProfile::default()
            },
            Config::default(),
        );

        assert!(!c.probe().await);
        assert!(!c.ui().affordances.start_visible);
        assert!(matches!(c.ui().last_status(), Some(Status::Unsupported { .. })));

        let err = c.start().await.unwrap_err();
        assert!(matches!(err, CoreError::Xr(XrError::UnsupportedPlatform)));
        assert_eq!(c.state(), ControllerState::Idle);
        assert_eq!(c.platform().log().session_requests, 0);
    }

    #[tokio::test]
    async fn test_unsupported_mode() {
        let mut c = controller(
            DeviceProfile {
                supported_modes: vec![SessionMode::Inline],
                ..DeviceProfile::default()
            },
            Config::default(),
        );

        assert!(!c.probe().await);

        let err = c.start().await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Xr(XrError::UnsupportedMode(SessionMode::ImmersiveAr))
        ));
        assert_eq!(c.platform().log().session_requests, 0);
        assert!(matches!(c.ui().last_status(), Some(Status::StartFailed { .. })));
    }

    #[tokio::test]
    async fn test_probe_error_reads_as_unsupported() {
        let mut c = controller(
            DeviceProfile {
                probe_error: Some("blocked by permissions policy".to_string()),
                ..DeviceProfile::default()
            },
            Config::default(),
        );

        assert!(!c.probe().await);
        match c.ui().last_status() {
            Some(Status::Unsupported { reason }) => assert!(reason.contains("blocked")),
            other => panic!("unexpected status {:?}", other),
        }

        let err = c.start().await.unwrap_err();
        assert!(matches!(err, CoreError::Xr(XrError::UnsupportedMode(_))));
    }

    #[tokio::test]
    async fn test_session_request_failed() {
        let mut c = controller(
            DeviceProfile::default(),
            Config {
                required_features: vec![Feature::BoundedFloor],
                ..Config::default()
            },
        );

        let err = c.start().await.unwrap_err();
        assert!(matches!(err, CoreError::Xr(XrError::SessionRequestFailed(_))));
        assert_eq!(c.platform().log().session_requests, 1);
        assert_eq!(c.renderer().binds, 0);
        assert_eq!(c.state(), ControllerState::Idle);
        assert!(c.ui().affordances.start_visible);
    }

    #[tokio::test]
    async fn test_no_usable_space_ends_session() {
        let mut c = controller(
            DeviceProfile {
                reference_spaces: vec![],
                ..DeviceProfile::default()
            },
            Config::default(),
        );

        let err = c.start().await.unwrap_err();
        match err {
            CoreError::Xr(XrError::NoUsableReferenceSpace { attempted }) => {
                assert_eq!(attempted, SpaceType::DEFAULT_ORDER.to_vec());
            }
            other => panic!("unexpected error {:?}", other),
        }

        let log = c.platform().log();
        assert_eq!(log.end_calls, 1);
        assert!(log.hit_test_requests.is_empty());
        assert_eq!(c.renderer().unbinds, 1);
        assert!(c.renderer().frame_loop.is_empty());
        assert_eq!(c.state(), ControllerState::Idle);
    }

    #[tokio::test]
    async fn test_bind_failure_ends_session() {
        let mut c = default_controller();
        c.renderer_mut().fail_bind = true;

        let err = c.start().await.unwrap_err();
        match err {
            CoreError::Xr(XrError::SessionRequestFailed(e)) => assert_eq!(e.name, "RenderError"),
            other => panic!("unexpected error {:?}", other),
        }

        let log = c.platform().log();
        assert_eq!(log.end_calls, 1);
        assert!(log.space_requests.is_empty());
        assert_eq!(c.state(), ControllerState::Idle);
    }

    #[tokio::test]
    async fn test_auto_place_waits_for_pending_hit_test() {
        let mut c = controller(
            with_hit_test(HitTestBehavior::ResolveAfter { frames: 3 }),
            auto_place(),
        );
        c.start().await.unwrap();

        step(&mut c, vec![floor_hit(0.5)]);
        step(&mut c, vec![floor_hit(0.5)]);
        assert_eq!(c.hit_test_status(), HitTestStatus::Pending);
        assert_eq!(c.hit_pose(), None);
        assert_eq!(c.renderer().reticle, None);
        assert_eq!(c.marker_count(), 0);

        step(&mut c, vec![floor_hit(0.5)]);
        assert_eq!(c.marker_count(), 1);
        assert_eq!(
            c.markers().next().map(|m| m.position),
            Some(floor_hit(0.5).position)
        );
        assert_eq!(c.ui().last_status(), Some(&Status::FirstPlaced { sequence: 1 }));

        step(&mut c, vec![floor_hit(0.9)]);
        assert_eq!(c.marker_count(), 1);
    }

    #[tokio::test]
    async fn test_hit_test_unavailable_falls_back() {
        let mut c = controller(with_hit_test(HitTestBehavior::Reject), Config::default());
        c.start().await.unwrap();

        // First rejection triggers the broader retry, the second one sticks
        step(&mut c, vec![]);
        step(&mut c, vec![]);
        step(&mut c, vec![]);

        assert_eq!(c.hit_test_status(), HitTestStatus::Unavailable);
        assert_eq!(c.platform().log().hit_test_requests.len(), 2);
        let surfaced = c
            .ui()
            .statuses
            .iter()
            .filter(|s| **s == Status::HitTestUnavailable)
            .count();
        assert_eq!(surfaced, 1);

        let marker = c.place_marker().unwrap();
        assert!(marker.position.abs_diff_eq(Vec3::new(0.0, 0.0, -1.5), 1e-5));
    }

    #[tokio::test]
    async fn test_auto_place_falls_back_without_surfaces() {
        let mut c = controller(
            with_hit_test(HitTestBehavior::Reject),
            Config {
                retry_hit_test_with_broader_filter: false,
                ..auto_place()
            },
        );
        c.start().await.unwrap();

        step(&mut c, vec![floor_hit(0.4)]);
        assert_eq!(c.platform().log().hit_test_requests.len(), 1);
        assert_eq!(c.marker_count(), 1);

        let mut c = controller(
            DeviceProfile::default(),
            Config {
                hit_test: false,
                ..auto_place()
            },
        );
        c.start().await.unwrap();
        assert_eq!(c.hit_test_status(), HitTestStatus::Inactive);
        assert_eq!(c.ui().last_status(), Some(&Status::Placing { hit_test: false }));

        let no_camera = c.platform().session().unwrap().frame(None, vec![]);
        c.on_frame(&no_camera);
        assert_eq!(c.marker_count(), 0);

        step(&mut c, vec![]);
        assert_eq!(c.marker_count(), 1);
        assert!(c.platform().log().hit_test_requests.is_empty());
    }

    #[tokio::test]
    async fn test_broader_retry_after_plane_rejection() {
        let mut c = controller(
            with_hit_test(HitTestBehavior::RequiresBroadFilter { frames: 1 }),
            Config::default(),
        );
        c.start().await.unwrap();

        step(&mut c, vec![floor_hit(0.2)]);
        assert_eq!(c.hit_test_status(), HitTestStatus::Pending);
        assert_eq!(c.hit_pose(), None);

        step(&mut c, vec![floor_hit(0.2)]);
        assert_eq!(c.hit_test_status(), HitTestStatus::Ready);
        assert_eq!(c.hit_pose(), Some(floor_hit(0.2)));

        assert_eq!(
            c.platform().log().hit_test_requests,
            vec![
                vec![EntityType::Plane],
                vec![EntityType::Plane, EntityType::Point, EntityType::Mesh],
            ]
        );
        assert!(!c.ui().statuses.contains(&Status::HitTestUnavailable));
    }

    #[tokio::test]
    async fn test_end_is_idempotent() {
        let mut c = default_controller();
        c.start().await.unwrap();
        step(&mut c, vec![floor_hit(0.1)]);
        c.place_marker().unwrap();

        let stale = frame(&c, vec![floor_hit(0.1)]);

        assert!(c.end());
        assert!(!c.end());
        assert!(!c.on_session_end());

        assert_eq!(c.platform().log().end_calls, 1);
        assert_eq!(c.renderer().unbinds, 1);

        let updates = c.renderer().camera_updates;
        c.on_frame(&stale);
        assert_eq!(c.renderer().camera_updates, updates);
        assert_eq!(c.camera_pose(), None);
    }

    #[tokio::test]
    async fn test_platform_end_event() {
        let mut c = default_controller();
        c.start().await.unwrap();

        assert!(c.on_session_end());
        assert_eq!(c.state(), ControllerState::Idle);
        // The platform already ended the session itself
        assert_eq!(c.platform().log().end_calls, 0);
        assert_eq!(c.renderer().frame_loop, vec![true, false]);
    }

    #[tokio::test]
    async fn test_end_signal_mid_frame() {
        let mut c = controller(DeviceProfile::default(), auto_place());
        c.start().await.unwrap();

        let signal = c.end_signal();
        c.renderer_mut().end_on_camera = Some(signal);

        step(&mut c, vec![floor_hit(0.1)]);

        assert_eq!(c.state(), ControllerState::Idle);
        assert_eq!(c.marker_count(), 0);
        assert!(c.renderer().markers.is_empty());
        assert_eq!(c.renderer().reticle, None);
        assert_eq!(c.renderer().unbinds, 1);
        assert_eq!(c.ui().last_status(), Some(&Status::Ended));
        assert!(!c.end_signal().is_fired());
        assert!(!c.process_end_signal());
    }

    #[tokio::test]
    async fn test_start_while_active_is_rejected() {
        let mut c = default_controller();
        c.start().await.unwrap();

        let err = c.start().await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
        assert_eq!(c.state(), ControllerState::Active);
        assert_eq!(c.platform().log().session_requests, 1);
    }

    #[tokio::test]
    async fn test_place_requires_active_session() {
        let mut c = default_controller();

        assert!(matches!(c.place_marker(), Err(CoreError::NoActiveSession)));
        assert_eq!(c.ui().last_status(), Some(&Status::NotActive));
        assert_eq!(c.marker_count(), 0);
    }

    #[tokio::test]
    async fn test_save_export_and_clear() {
        let mut c = default_controller();
        c.start().await.unwrap();

        step(&mut c, vec![floor_hit(0.1)]);
        c.place_marker().unwrap();
        step(&mut c, vec![floor_hit(0.7)]);
        c.place_marker().unwrap();
        assert!(c.ui().affordances.save_visible);

        assert_eq!(c.save().unwrap(), 2);
        assert_eq!(c.ui().last_status(), Some(&Status::Saved { count: 2 }));
        assert!(c.ui().affordances.download_visible);

        let file = c.export_file().unwrap();
        assert!(file.file_name.starts_with("markers_"));
        assert!(file.file_name.ends_with(".json"));
        let exported: Vec<ExportedMarker> = serde_json::from_str(&file.contents).unwrap();
        assert_eq!(exported.iter().map(|m| m.id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(exported[1].label, "Marker 2");

        c.ui_mut().confirm_answer = false;
        assert!(!c.clear_markers());
        assert_eq!(c.marker_count(), 2);
        assert_eq!(c.ui().prompts, vec![CLEAR_PROMPT.to_string()]);

        c.ui_mut().confirm_answer = true;
        assert!(c.clear_markers());
        assert_eq!(c.marker_count(), 0);
        assert!(c.renderer().markers.is_empty());
        assert_eq!(c.ui().count, 0);
        assert_eq!(c.saved().len(), 2);

        // The snapshot survives the session
        c.end();
        assert_eq!(c.export_file().unwrap().contents, file.contents);
        assert!(c.ui().affordances.download_visible);
    }

    #[tokio::test]
    async fn test_save_and_export_without_markers() {
        let mut c = default_controller();
        c.start().await.unwrap();

        assert!(matches!(
            c.save(),
            Err(CoreError::Marker(MarkerError::EmptyStore))
        ));
        assert_eq!(c.ui().last_status(), Some(&Status::NothingToSave));

        assert!(matches!(
            c.export_file(),
            Err(CoreError::Marker(MarkerError::NothingSaved))
        ));
        assert_eq!(c.ui().last_status(), Some(&Status::NothingSaved));
    }

    #[tokio::test]
    async fn test_restart_resets_session_state() {
        let mut c = controller(DeviceProfile::default(), auto_place());

        c.start().await.unwrap();
        let first_id = c.session_id();
        step(&mut c, vec![floor_hit(0.1)]);
        c.place_marker().unwrap();
        assert_eq!(c.marker_count(), 2);
        c.end();

        c.start().await.unwrap();
        assert_ne!(c.session_id(), first_id);
        assert_eq!(c.hit_test_status(), HitTestStatus::Pending);

        step(&mut c, vec![floor_hit(0.3)]);
        assert_eq!(c.marker_count(), 1);
        assert_eq!(c.markers().next().map(|m| m.sequence), Some(1));
        assert_eq!(c.platform().log().hit_test_requests.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_archive_keeps_previous_snapshot() {
        let db = Database::open_in_memory().unwrap();
        let mut c = default_controller().with_archive(WaypointArchive::new(db.clone()));
        c.start().await.unwrap();

        step(&mut c, vec![floor_hit(0.1)]);
        c.place_marker().unwrap();
        assert_eq!(c.save().unwrap(), 1);

        db.with_connection(|conn| {
            conn.execute_batch("DROP TABLE saved_sets")?;
            Ok(())
        })
        .unwrap();

        c.place_marker().unwrap();
        assert!(matches!(c.save(), Err(CoreError::Storage(_))));
        assert!(matches!(c.ui().last_status(), Some(Status::SaveFailed { .. })));
        assert_eq!(c.saved().len(), 1);
        assert!(c.ui().affordances.download_visible);

        let exported: Vec<ExportedMarker> =
            serde_json::from_str(&c.export_file().unwrap().contents).unwrap();
        assert_eq!(exported.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_first_archive_hides_download() {
        let db = Database::open_in_memory().unwrap();
        db.with_connection(|conn| {
            conn.execute_batch("DROP TABLE saved_sets")?;
            Ok(())
        })
        .unwrap();
        let mut c = default_controller().with_archive(WaypointArchive::new(db));
        c.start().await.unwrap();

        step(&mut c, vec![floor_hit(0.1)]);
        c.place_marker().unwrap();

        assert!(c.save().is_err());
        assert!(c.saved().is_empty());
        assert!(!c.ui().affordances.download_visible);
        assert!(matches!(
            c.export_file(),
            Err(CoreError::Marker(MarkerError::NothingSaved))
        ));
    }

    #[tokio::test]
    async fn test_teardown_follows_transition_table() {
        let mut c = default_controller();
        assert!(!c.end());
        assert_eq!(c.state(), ControllerState::Idle);

        c.start().await.unwrap();
        assert!(c.on_session_end());
        assert_eq!(c.state(), ControllerState::Idle);

        // Idle -> Requesting is still allowed after a teardown
        c.start().await.unwrap();
        assert_eq!(c.state(), ControllerState::Active);
    }

    #[tokio::test]
    async fn test_saves_are_archived() {
        let archive = WaypointArchive::new(Database::open_in_memory().unwrap());
        let mut c = default_controller().with_archive(archive);
        c.start().await.unwrap();
        let session_id = c.session_id().map(|id| id.to_string());

        step(&mut c, vec![floor_hit(0.1)]);
        c.place_marker().unwrap();
        c.save().unwrap();
        c.place_marker().unwrap();
        c.save().unwrap();

        let archive = c.archive().unwrap();
        assert_eq!(archive.last_space().unwrap(), Some(SpaceType::LocalFloor));
        let sets = archive.list().unwrap();
        assert_eq!(sets.len(), 2);
        assert!(sets.iter().all(|s| Some(&s.session_id) == session_id.as_ref()));
        let mut counts: Vec<usize> = sets.iter().map(|s| s.marker_count()).collect();
        counts.sort();
        assert_eq!(counts, vec![1, 2]);
    }
}
