//! Rigid transforms reported by the platform

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    #[serde(default = "identity")]
    pub orientation: Quat,
}

fn identity() -> Quat {
    Quat::IDENTITY
}

impl Pose {
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    pub fn at(position: Vec3) -> Self {
        Self::new(position, Quat::IDENTITY)
    }

    /// Decompose a column-major 4x4 transform (the WebXR `transform.matrix` layout)
    pub fn from_matrix(cols: &[f32; 16]) -> Self {
        let (_scale, orientation, position) =
            Mat4::from_cols_array(cols).to_scale_rotation_translation();
        Self::new(position, orientation)
    }

    pub fn to_matrix(&self) -> [f32; 16] {
        Mat4::from_rotation_translation(self.orientation, self.position).to_cols_array()
    }

    /// Viewing direction; cameras look down -Z
    pub fn forward(&self) -> Vec3 {
        self.orientation * Vec3::NEG_Z
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::at(Vec3::ZERO)
    }
}
