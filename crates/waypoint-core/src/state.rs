//! Controller State Machine
//!
//! ```text
//! Idle
//!   ↓ start
//! Requesting ──failure──→ Idle
//!   ↓ session + reference space
//! Active
//!   ↓ user end / platform end
//! Ended
//!   ↓ (immediately)
//! Idle
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControllerState {
    /// No session; start affordance shown
    Idle,
    /// Capability probe, session request and negotiation in flight
    Requesting,
    /// Session live, frame callback installed
    Active,
    /// Teardown in progress
    Ended,
}

impl ControllerState {
    pub fn can_transition_to(&self, target: ControllerState) -> bool {
        matches!(
            (self, target),
            (ControllerState::Idle, ControllerState::Requesting)
                | (ControllerState::Requesting, ControllerState::Active)
                | (ControllerState::Requesting, ControllerState::Idle)
                | (ControllerState::Active, ControllerState::Ended)
                | (ControllerState::Ended, ControllerState::Idle)
        )
    }

    pub fn is_active(&self) -> bool {
        matches!(self, ControllerState::Active)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ControllerState::Idle => "idle",
            ControllerState::Requesting => "requesting",
            ControllerState::Active => "active",
            ControllerState::Ended => "ended",
        }
    }
}

impl std::fmt::Display for ControllerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
