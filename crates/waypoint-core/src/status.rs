//! Status line messages

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Status {
    Supported,
    Unsupported { reason: String },
    Starting,
    /// Session is live and waiting for placements
    Placing { hit_test: bool },
    Placed { sequence: u32, coordinates: String },
    FirstPlaced { sequence: u32 },
    HitTestUnavailable,
    StartFailed { reason: String },
    NotActive,
    Saved { count: usize },
    SaveFailed { reason: String },
    NothingToSave,
    Exported { count: usize },
    NothingSaved,
    Cleared,
    Ended,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Supported => write!(f, "AR is supported on this device, tap Start AR"),
            Status::Unsupported { reason } => write!(f, "AR unavailable: {}", reason),
            Status::Starting => write!(f, "Starting AR..."),
            Status::Placing { hit_test: true } => {
                write!(f, "Point the camera at the ground; the ring shows where a marker goes")
            }
            Status::Placing { hit_test: false } => {
                write!(f, "Move to where you want a marker, then tap Place marker")
            }
            Status::Placed {
                sequence,
                coordinates,
            } => write!(f, "Placed marker #{} {}", sequence, coordinates),
            Status::FirstPlaced { sequence } => write!(
                f,
                "Marker #{} placed automatically; move around to place more",
                sequence
            ),
            Status::HitTestUnavailable => write!(
                f,
                "Surface detection is not available; markers will be placed in front of you"
            ),
            Status::StartFailed { reason } => write!(f, "AR failed to start: {}", reason),
            Status::NotActive => write!(f, "Start AR first"),
            Status::Saved { count } => write!(f, "Saved {} markers", count),
            Status::SaveFailed { reason } => write!(f, "Saving markers failed: {}", reason),
            Status::NothingToSave => write!(f, "No markers to save"),
            Status::Exported { count } => write!(f, "Exported {} markers", count),
            Status::NothingSaved => write!(f, "No saved markers to export"),
            Status::Cleared => write!(f, "All markers cleared"),
            Status::Ended => write!(f, "AR ended"),
        }
    }
}
