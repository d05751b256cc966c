use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Tunables for the annotation engine.
///
/// Every field has a default, so a JSON override only needs the keys it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Half-width of the smoothing window, in samples
    pub smoothing_window: usize,
    /// Polygons below this area (square pixels) are never stored
    pub min_artifact_area: f64,
    /// Fewest distinct vertices a repaired ring may keep
    pub min_distinct_vertices: usize,
    /// Vertices used to approximate a full brush disc
    pub circle_segments: usize,
    /// Labels are hidden below this zoom factor
    pub label_zoom_threshold: f64,
    /// Free-hand samples closer than this to the previous one are dropped
    pub min_point_spacing: f64,
    /// Brush radius used by brush-fill and eraser modes
    pub default_brush_radius: f64,
    /// Base seed for colour generation
    pub color_seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            smoothing_window: 2,
            min_artifact_area: 100.0,
            min_distinct_vertices: 3,
            circle_segments: 64,
            label_zoom_threshold: 0.1,
            min_point_spacing: 2.0,
            default_brush_radius: 10.0,
            color_seed: 0x5eed_c0de,
        }
    }
}

impl EngineConfig {
    /// Parse a JSON override on top of the defaults
    pub fn from_json_str(json: &str) -> EngineResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.min_distinct_vertices < 3 {
            return Err(EngineError::ConfigValue(format!(
                "min_distinct_vertices must be at least 3, got {}",
                self.min_distinct_vertices
            )));
        }
        if self.circle_segments < 8 {
            return Err(EngineError::ConfigValue(format!(
                "circle_segments must be at least 8, got {}",
                self.circle_segments
            )));
        }
        let non_negative = [
            ("min_artifact_area", self.min_artifact_area),
            ("label_zoom_threshold", self.label_zoom_threshold),
            ("min_point_spacing", self.min_point_spacing),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(EngineError::ConfigValue(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        if !self.default_brush_radius.is_finite() || self.default_brush_radius <= 0.0 {
            return Err(EngineError::ConfigValue(format!(
                "default_brush_radius must be positive, got {}",
                self.default_brush_radius
            )));
        }
        Ok(())
    }
}
