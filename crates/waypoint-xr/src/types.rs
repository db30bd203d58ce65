//! Platform vocabulary: session modes, features, reference spaces
//!
//! String forms match the WebXR enum values so profiles and configuration
//! files can name them directly.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionMode {
    /// Camera passthrough with world tracking
    ImmersiveAr,
    ImmersiveVr,
    /// Page-embedded, no tracking
    Inline,
}

impl SessionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionMode::ImmersiveAr => "immersive-ar",
            SessionMode::ImmersiveVr => "immersive-vr",
            SessionMode::Inline => "inline",
        }
    }
}

impl std::fmt::Display for SessionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Optional or required capabilities negotiated at session creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Feature {
    HitTest,
    DomOverlay,
    Anchors,
    Local,
    LocalFloor,
    BoundedFloor,
    Unbounded,
}

impl Feature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::HitTest => "hit-test",
            Feature::DomOverlay => "dom-overlay",
            Feature::Anchors => "anchors",
            Feature::Local => "local",
            Feature::LocalFloor => "local-floor",
            Feature::BoundedFloor => "bounded-floor",
            Feature::Unbounded => "unbounded",
        }
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInit {
    /// The session is rejected if any of these cannot be granted
    #[serde(default)]
    pub required_features: Vec<Feature>,
    /// Granted when possible, dropped silently otherwise
    #[serde(default)]
    pub optional_features: Vec<Feature>,
}

impl SessionInit {
    pub fn new(required_features: Vec<Feature>, optional_features: Vec<Feature>) -> Self {
        Self {
            required_features,
            optional_features,
        }
    }

    pub fn requests(&self, feature: Feature) -> bool {
        self.required_features.contains(&feature) || self.optional_features.contains(&feature)
    }
}

/// Reference space types, in no particular preference order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpaceType {
    /// Origin at floor level near the starting position
    LocalFloor,
    /// Origin at the viewer's starting position
    Local,
    BoundedFloor,
    Unbounded,
    /// Origin follows the viewer
    Viewer,
}

impl SpaceType {
    /// Floor-relative first, viewer-relative last
    pub const DEFAULT_ORDER: [SpaceType; 4] = [
        SpaceType::LocalFloor,
        SpaceType::Local,
        SpaceType::Unbounded,
        SpaceType::Viewer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SpaceType::LocalFloor => "local-floor",
            SpaceType::Local => "local",
            SpaceType::BoundedFloor => "bounded-floor",
            SpaceType::Unbounded => "unbounded",
            SpaceType::Viewer => "viewer",
        }
    }

    /// Whether poses in this space stay fixed in the world
    pub fn is_world_locked(&self) -> bool {
        !matches!(self, SpaceType::Viewer)
    }
}

impl std::fmt::Display for SpaceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SpaceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local-floor" => Ok(SpaceType::LocalFloor),
            "local" => Ok(SpaceType::Local),
            "bounded-floor" => Ok(SpaceType::BoundedFloor),
            "unbounded" => Ok(SpaceType::Unbounded),
            "viewer" => Ok(SpaceType::Viewer),
            _ => Err(format!("Unknown reference space type: {}", s)),
        }
    }
}

/// Real-world geometry a hit-test ray may intersect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Plane,
    Point,
    Mesh,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitTestRequest<S> {
    /// Space the hit-test ray originates from
    pub space: S,
    pub entity_types: Vec<EntityType>,
}

impl<S> HitTestRequest<S> {
    /// Detected planes only
    pub fn planes(space: S) -> Self {
        Self {
            space,
            entity_types: vec![EntityType::Plane],
        }
    }

    /// Any geometry the platform can report
    pub fn broad(space: S) -> Self {
        Self {
            space,
            entity_types: vec![EntityType::Plane, EntityType::Point, EntityType::Mesh],
        }
    }
}
