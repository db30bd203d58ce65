//! Scenario replay

use chrono::Utc;
use waypoint_core::{
    ControllerState, Config, ExportFile, SessionController, Status, WaypointArchive,
};
use waypoint_xr::sim::{SimDevice, SimLog};

use crate::console::{ConsoleUi, LoggingRenderer};
use crate::scenario::{Action, Scenario};

pub struct ReplayOutcome {
    pub statuses: Vec<Status>,
    pub device_log: SimLog,
    pub final_state: ControllerState,
    /// Marker visuals still in the scene
    pub visible_markers: usize,
    /// Count the UI was last told to show
    pub displayed_count: usize,
    /// Download payload for the last saved snapshot
    pub export: Option<ExportFile>,
}

type Controller = SessionController<SimDevice, LoggingRenderer, ConsoleUi>;

pub async fn run(
    scenario: Scenario,
    config: Config,
    archive: Option<WaypointArchive>,
) -> waypoint_core::Result<ReplayOutcome> {
    let mut controller = SessionController::new(
        config,
        SimDevice::new(scenario.device),
        LoggingRenderer::default(),
        ConsoleUi::new(true),
    );
    if let Some(archive) = archive {
        controller = controller.with_archive(archive);
    }

    if controller.probe().await {
        start(&mut controller).await;
    }

    for (index, step) in scenario.steps.iter().enumerate() {
        for _ in 0..step.frames {
            if !controller.state().is_active() {
                break;
            }
            let Some(session) = controller.platform().session() else {
                break;
            };
            let frame = session.frame(step.viewer, step.hits.clone());
            controller.on_frame(&frame);
        }

        if let Some(action) = step.action {
            tracing::debug!(step = index, ?action, "Applying action");
            apply(&mut controller, action).await;
        }
    }

    if controller.state().is_active() {
        controller.end();
    }

    // Built directly so the replay does not report a download nobody asked for
    let export = if controller.saved().is_empty() {
        None
    } else {
        Some(ExportFile::new(controller.saved(), Utc::now().date_naive())?)
    };

    Ok(ReplayOutcome {
        statuses: controller.ui().history().to_vec(),
        device_log: controller.platform().log(),
        final_state: controller.state(),
        visible_markers: controller.renderer().visible_markers(),
        displayed_count: controller.ui().marker_count(),
        export,
    })
}

async fn start(controller: &mut Controller) {
    if let Err(e) = controller.start().await {
        tracing::warn!(error = %e, "Session did not start");
    }
}

async fn apply(controller: &mut Controller, action: Action) {
    let result = match action {
        Action::Start => {
            start(controller).await;
            Ok(())
        }
        Action::Place => controller.place_marker().map(|_| ()),
        Action::Save => controller.save().map(|_| ()),
        Action::Clear => {
            controller.clear_markers();
            Ok(())
        }
        Action::End => {
            controller.end();
            Ok(())
        }
        Action::DeviceEnd => {
            controller.on_session_end();
            Ok(())
        }
    };

    if let Err(e) = result {
        tracing::warn!(?action, error = %e, "Action had no effect");
    }
}
