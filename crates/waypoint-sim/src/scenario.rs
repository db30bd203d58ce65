//! Scenario files
//!
//! A device profile plus the frames to feed the controller, in order.
//! Each step produces `frames` frames and then performs its action.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use waypoint_xr::sim::DeviceProfile;
use waypoint_xr::Pose;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    /// Start a new session after an earlier one ended
    Start,
    Place,
    Save,
    Clear,
    /// User pressed End
    End,
    /// Platform ended the session on its own
    DeviceEnd,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default = "one")]
    pub frames: u32,
    #[serde(default)]
    pub viewer: Option<Pose>,
    /// Hit-test results for these frames, nearest first
    #[serde(default)]
    pub hits: Vec<Pose>,
    #[serde(default)]
    pub action: Option<Action>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub device: DeviceProfile,
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        let scenario = serde_json::from_str(&contents)
            .with_context(|| format!("parsing scenario {}", path.display()))?;
        Ok(scenario)
    }
}
