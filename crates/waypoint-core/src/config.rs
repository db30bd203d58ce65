//! Session configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use waypoint_markers::FallbackPlacement;
use waypoint_xr::{Feature, SessionInit, SessionMode, SpaceType};

use crate::error::CoreError;
use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub session_mode: SessionMode,
    /// Features the session cannot run without
    pub required_features: Vec<Feature>,
    pub optional_features: Vec<Feature>,
    /// Reference space candidates, most preferred first
    pub reference_spaces: Vec<SpaceType>,
    /// Subscribe to hit testing and show a reticle
    pub hit_test: bool,
    /// After a rejected plane-only subscription, try once more with all entity types
    pub retry_hit_test_with_broader_filter: bool,
    /// Place a marker on the first detected surface without waiting for a tap
    pub auto_place_on_first_surface: bool,
    /// Where markers go when no surface is available
    pub fallback: FallbackPlacement,
    pub label_prefix: String,
    /// Archive saved sets here when set
    pub database_path: Option<PathBuf>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validate()?;

        tracing::debug!(path = %path.display(), "Loaded configuration");

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.reference_spaces.is_empty() {
            return Err(CoreError::Config(
                "reference_spaces must name at least one space type".to_string(),
            ));
        }
        if self.label_prefix.trim().is_empty() {
            return Err(CoreError::Config("label_prefix cannot be empty".to_string()));
        }
        Ok(())
    }

    /// Feature request for the session; hit testing is added as optional when enabled
    pub fn session_init(&self) -> SessionInit {
        let mut init = SessionInit::new(
            self.required_features.clone(),
            self.optional_features.clone(),
        );
        if self.hit_test && !init.requests(Feature::HitTest) {
            init.optional_features.push(Feature::HitTest);
        }
        init
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session_mode: SessionMode::ImmersiveAr,
            required_features: Vec::new(),
            optional_features: vec![Feature::LocalFloor, Feature::HitTest, Feature::DomOverlay],
            reference_spaces: SpaceType::DEFAULT_ORDER.to_vec(),
            hit_test: true,
            retry_hit_test_with_broader_filter: true,
            auto_place_on_first_surface: false,
            fallback: FallbackPlacement::default(),
            label_prefix: "Marker".to_string(),
            database_path: None,
        }
    }
}
