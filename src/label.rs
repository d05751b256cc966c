use log::debug;
use serde::{Deserialize, Serialize};

use crate::artifact::{Artifact, ArtifactId};
use crate::config::EngineConfig;
use crate::geometry::{Bounds, GeometryEngine, Point, Polygon, largest};

/// What the renderer currently shows, in image space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportState {
    pub zoom_factor: f64,
    pub visible_bounds: Bounds,
}

impl ViewportState {
    pub fn new(zoom_factor: f64, visible_bounds: Bounds) -> Self {
        Self {
            zoom_factor,
            visible_bounds,
        }
    }

    /// Viewport from the painter's zoom and the image-space rectangle it shows.
    pub fn from_egui(zoom: f32, visible: egui::Rect) -> Self {
        Self::new(zoom as f64, visible.into())
    }
}

/// Where to draw one artifact's label for one viewport snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelPlacement {
    pub artifact_id: ArtifactId,
    pub anchor: Point,
    pub visible: bool,
}

/// Derives label anchors and visibility. Stateless between calls, so it can
/// run on every pan or zoom.
#[derive(Debug, Clone)]
pub struct LabelPlacementEngine {
    zoom_threshold: f64,
    engine: GeometryEngine,
}

impl Default for LabelPlacementEngine {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl LabelPlacementEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            zoom_threshold: config.label_zoom_threshold,
            engine: GeometryEngine::new(config),
        }
    }

    pub fn zoom_threshold(&self) -> f64 {
        self.zoom_threshold
    }

    pub fn place_label(&self, artifact: &Artifact, viewport: &ViewportState) -> LabelPlacement {
        let polygon = artifact.geometry();
        let default_anchor = preferred_anchor(polygon).unwrap_or_else(|| polygon.bounds().center());
        let hidden = |anchor| LabelPlacement {
            artifact_id: artifact.id(),
            anchor,
            visible: false,
        };

        if !(viewport.zoom_factor >= self.zoom_threshold) {
            return hidden(default_anchor);
        }
        let visible = viewport.visible_bounds;
        if visible.is_empty() || !polygon.bounds().intersects(&visible) {
            return hidden(default_anchor);
        }
        if visible.contains(default_anchor) {
            return LabelPlacement {
                artifact_id: artifact.id(),
                anchor: default_anchor,
                visible: true,
            };
        }

        // Anchor outside the view: move it into the visible part.
        let clipped = self.engine.intersection(polygon, &visible.to_polygon());
        match largest(clipped).and_then(|part| preferred_anchor(&part)) {
            Some(anchor) => LabelPlacement {
                artifact_id: artifact.id(),
                anchor,
                visible: true,
            },
            None => {
                debug!("artifact {} has no visible area", artifact.id());
                hidden(default_anchor)
            }
        }
    }

    pub fn place_labels(&self, artifacts: &[Artifact], viewport: &ViewportState) -> Vec<LabelPlacement> {
        artifacts
            .iter()
            .map(|artifact| self.place_label(artifact, viewport))
            .collect()
    }
}

/// Centroid when it lies inside the polygon, otherwise an interior point.
fn preferred_anchor(polygon: &Polygon) -> Option<Point> {
    polygon
        .centroid()
        .filter(|c| polygon.contains(*c))
        .or_else(|| polygon.interior_point())
}
