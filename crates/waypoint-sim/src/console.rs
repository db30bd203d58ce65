//! Headless renderer and console UI for replays

use glam::Vec3;
use waypoint_core::{Affordances, Interface, Pose, RenderError, Renderer, Status};
use waypoint_xr::sim::SimSession;

/// Draws nothing; logs what a scene graph would receive
#[derive(Debug, Default)]
pub struct LoggingRenderer {
    next_handle: u32,
    visible: usize,
}

impl LoggingRenderer {
    /// Marker visuals currently in the scene
    pub fn visible_markers(&self) -> usize {
        self.visible
    }
}

impl Renderer for LoggingRenderer {
    type Session = SimSession;
    type Handle = u32;

    async fn bind_session(&mut self, session: &SimSession) -> Result<(), RenderError> {
        tracing::debug!(features = ?session.granted_features(), "Renderer bound to session");
        Ok(())
    }

    fn unbind_session(&mut self) {
        tracing::debug!("Renderer unbound");
    }

    fn set_frame_loop(&mut self, running: bool) {
        tracing::debug!(running, "Frame loop");
    }

    fn update_camera(&mut self, pose: &Pose) {
        tracing::trace!(position = ?pose.position, "Camera");
    }

    fn update_reticle(&mut self, pose: Option<&Pose>) {
        tracing::trace!(visible = pose.is_some(), "Reticle");
    }

    fn add_marker(&mut self, position: Vec3, label: &str) -> u32 {
        self.next_handle += 1;
        self.visible += 1;
        tracing::debug!(handle = self.next_handle, ?position, label, "Marker visual added");
        self.next_handle
    }

    fn remove_marker(&mut self, handle: u32) {
        self.visible = self.visible.saturating_sub(1);
        tracing::debug!(handle, "Marker visual removed");
    }
}

/// Prints status lines and answers prompts with a fixed reply
#[derive(Debug)]
pub struct ConsoleUi {
    assume_yes: bool,
    history: Vec<Status>,
    marker_count: usize,
}

impl ConsoleUi {
    pub fn new(assume_yes: bool) -> Self {
        Self {
            assume_yes,
            history: Vec::new(),
            marker_count: 0,
        }
    }

    pub fn history(&self) -> &[Status] {
        &self.history
    }

    pub fn marker_count(&self) -> usize {
        self.marker_count
    }
}

#[allow(clippy::print_stdout)]
impl Interface for ConsoleUi {
    fn show_status(&mut self, status: &Status) {
        println!("[status] {}", status);
        self.history.push(status.clone());
    }

    fn set_affordances(&mut self, affordances: &Affordances) {
        tracing::debug!(?affordances, "Controls updated");
    }

    fn set_marker_count(&mut self, count: usize) {
        self.marker_count = count;
    }

    fn confirm(&mut self, prompt: &str) -> bool {
        println!("[confirm] {} {}", prompt, if self.assume_yes { "yes" } else { "no" });
        self.assume_yes
    }
}
