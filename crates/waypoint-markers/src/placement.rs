//! Where a new marker goes
//!
//! A detected surface always wins. Devices without hit testing still get
//! markers, positioned relative to the camera.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use waypoint_xr::Pose;

const MIN_HEADING_LENGTH_SQ: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum FallbackPlacement {
    /// On the ground plane, `distance` metres ahead of the camera
    Forward {
        #[serde(default = "default_distance")]
        distance: f32,
        #[serde(default)]
        ground_height: f32,
    },
    /// Straight down from the camera, roughly at the user's feet
    BelowViewer {
        #[serde(default = "default_drop")]
        drop: f32,
    },
}

fn default_distance() -> f32 {
    1.5
}

fn default_drop() -> f32 {
    1.6
}

impl Default for FallbackPlacement {
    fn default() -> Self {
        FallbackPlacement::Forward {
            distance: default_distance(),
            ground_height: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlacementSource {
    /// Taken from a hit-test intersection
    Surface,
    /// Derived from the camera pose
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub position: Vec3,
    pub source: PlacementSource,
}

pub fn resolve_position(
    hit: Option<&Pose>,
    camera: Option<&Pose>,
    fallback: &FallbackPlacement,
) -> Placement {
    if let Some(hit) = hit {
        return Placement {
            position: hit.position,
            source: PlacementSource::Surface,
        };
    }

    let camera = camera.copied().unwrap_or_default();
    let position = match *fallback {
        FallbackPlacement::Forward {
            distance,
            ground_height,
        } => {
            let forward = camera.forward();
            // Pitch is discarded; looking straight up or down leaves no heading
            let flat = Vec3::new(forward.x, 0.0, forward.z);
            let heading = if flat.length_squared() > MIN_HEADING_LENGTH_SQ {
                flat.normalize()
            } else {
                Vec3::ZERO
            };
            let ahead = camera.position + heading * distance;
            Vec3::new(ahead.x, ground_height, ahead.z)
        }
        FallbackPlacement::BelowViewer { drop } => camera.position - Vec3::Y * drop,
    };

    Placement {
        position,
        source: PlacementSource::Fallback,
    }
}
