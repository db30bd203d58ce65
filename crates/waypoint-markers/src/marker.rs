//! Marker data structures

use chrono::{DateTime, Utc};
use glam::Vec3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    /// 1-based placement number within the current session
    pub sequence: u32,
    pub position: Vec3,
    /// Display name, e.g. "Marker 3"
    pub label: String,
    pub created_at: DateTime<Utc>,
}

impl Marker {
    pub fn new(sequence: u32, position: Vec3, label_prefix: &str) -> Self {
        Self {
            sequence,
            position,
            label: format!("{} {}", label_prefix, sequence),
            created_at: Utc::now(),
        }
    }

    pub fn export(&self) -> ExportedMarker {
        ExportedMarker {
            id: self.sequence,
            position: self.position.into(),
            label: self.label.clone(),
            timestamp: self.created_at,
        }
    }
}

/// `{x, y, z}` object form used in exports
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<Vec3> for Position {
    fn from(v: Vec3) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

impl From<Position> for Vec3 {
    fn from(p: Position) -> Self {
        Vec3::new(p.x, p.y, p.z)
    }
}

/// One entry of the exported JSON array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedMarker {
    pub id: u32,
    pub position: Position,
    pub label: String,
    pub timestamp: DateTime<Utc>,
}

/// Label drawn next to the marker visual: `(x.xx, y.xx, z.xx)`
pub fn coordinate_label(position: Vec3) -> String {
    format!("({:.2}, {:.2}, {:.2})", position.x, position.y, position.z)
}
