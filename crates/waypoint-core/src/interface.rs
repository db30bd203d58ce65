//! Renderer and UI collaborators
//!
//! The controller drives both; neither calls back into it. Platform event
//! listeners that fire outside the controller's control use [`EndSignal`].
#![allow(async_fn_in_trait)]

use glam::Vec3;
use serde::Serialize;
use std::cell::Cell;
use std::rc::Rc;
use waypoint_xr::Pose;

use crate::error::RenderError;
use crate::state::ControllerState;
use crate::status::Status;

pub trait Renderer {
    /// Platform session type the renderer presents into
    type Session;
    /// Opaque reference to a marker visual
    type Handle;

    async fn bind_session(&mut self, session: &Self::Session) -> Result<(), RenderError>;

    fn unbind_session(&mut self);

    /// Install or stop the per-frame callback
    fn set_frame_loop(&mut self, running: bool);

    fn update_camera(&mut self, pose: &Pose);

    /// `None` hides the reticle
    fn update_reticle(&mut self, pose: Option<&Pose>);

    fn add_marker(&mut self, position: Vec3, label: &str) -> Self::Handle;

    fn remove_marker(&mut self, handle: Self::Handle);
}

pub trait Interface {
    fn show_status(&mut self, status: &Status);

    fn set_affordances(&mut self, affordances: &Affordances);

    fn set_marker_count(&mut self, count: usize);

    /// Blocking yes/no prompt (e.g. before clearing markers)
    fn confirm(&mut self, prompt: &str) -> bool;
}

/// Which controls are shown or enabled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Affordances {
    pub start_visible: bool,
    pub end_visible: bool,
    pub place_enabled: bool,
    pub count_visible: bool,
    pub save_visible: bool,
    pub clear_visible: bool,
    pub download_visible: bool,
}

impl Affordances {
    pub fn for_state(state: ControllerState, marker_count: usize, has_saved: bool) -> Self {
        let active = state.is_active();
        Self {
            start_visible: matches!(state, ControllerState::Idle),
            end_visible: active,
            place_enabled: active,
            count_visible: active,
            save_visible: active && marker_count > 0,
            clear_visible: active && marker_count > 0,
            download_visible: has_saved,
        }
    }
}

/// Session-end notification that can be raised from any event listener,
/// including while a frame callback is running
#[derive(Debug, Clone, Default)]
pub struct EndSignal(Rc<Cell<bool>>);

impl EndSignal {
    pub fn fire(&self) {
        self.0.set(true);
    }

    pub fn is_fired(&self) -> bool {
        self.0.get()
    }

    pub(crate) fn reset(&self) {
        self.0.set(false);
    }
}
