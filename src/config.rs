// Engine configuration.
//
// Every distance is in the linear units of the working projected CRS (feet
// for the state-plane layers this was built against). Defaults match the
// values the field team has been running with.

use crate::error::ConfigError;
use crate::materials::MaterialTable;
use crate::snapping::SnapMode;
use std::path::Path;

pub const DEFAULT_PIPE_TYPE_FIELD: &str = "PIPE_TYPE";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Endpoint coincidence for adjacency.
    pub xy_tolerance: f64,
    /// How far a dangling endpoint may be moved by snapping.
    pub search_tolerance: f64,
    /// Junction lookup around a segment end. Usually tighter than snapping.
    pub point_tolerance: f64,
    /// Point-to-line distance for the connectivity roll-up.
    pub connection_tolerance: f64,
    pub snap_mode: SnapMode,
    /// Attribute holding the legacy pipe-type code.
    pub pipe_type_field: String,
    /// Line attribute collected onto points, if any.
    pub point_value_field: Option<String>,
    pub pipe_type_map: MaterialTable,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            xy_tolerance: 0.001,
            search_tolerance: 0.3,
            point_tolerance: 0.001,
            connection_tolerance: 0.05,
            snap_mode: SnapMode::PointFeatures,
            pipe_type_field: DEFAULT_PIPE_TYPE_FIELD.to_string(),
            point_value_field: None,
            pipe_type_map: MaterialTable::default(),
        }
    }
}

impl EngineConfig {
    /// Structural checks only. Whether the tolerances are in the right
    /// units for the data cannot be detected here.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let tolerances = [
            ("xy_tolerance", self.xy_tolerance),
            ("search_tolerance", self.search_tolerance),
            ("point_tolerance", self.point_tolerance),
            ("connection_tolerance", self.connection_tolerance),
        ];
        for (name, value) in tolerances {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidTolerance { name, value });
            }
        }
        if self.pipe_type_field.trim().is_empty() {
            return Err(ConfigError::EmptyPipeTypeField);
        }
        Ok(())
    }

    /// Load from a JSON file. Missing keys fall back to the defaults.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
