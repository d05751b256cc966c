//! Boundary to the external segmentation model.
//!
//! The engine only depends on [`SegmentationAdapter`]; inference runs on
//! background threads owned by [`DetectionDispatcher`], and results are
//! applied on the interaction thread.

mod color_region;
mod dispatcher;

pub use color_region::ColorRegionAdapter;
pub use dispatcher::{DetectionDispatcher, DetectionKind, DetectionPoll, DetectionResponse};

use std::sync::Arc;

use image::{GrayImage, RgbImage};

use crate::error::EngineResult;
use crate::geometry::{Bounds, Point, Polygon};

/// Pixels handed to the model, positioned in image space.
#[derive(Debug, Clone)]
pub struct ImageRegion {
    /// Image-space position of pixel (0, 0)
    pub origin: Point,
    pub pixels: Arc<RgbImage>,
}

impl ImageRegion {
    pub fn new(pixels: Arc<RgbImage>, origin: Point) -> Self {
        Self { origin, pixels }
    }

    /// The whole image, with its top-left pixel at the image-space origin.
    pub fn whole(pixels: Arc<RgbImage>) -> Self {
        Self::new(pixels, Point::default())
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::from_min_max(
            self.origin,
            self.origin + Point::new(self.width() as f64, self.height() as f64),
        )
    }

    /// Pixel under an image-space point, clamped to the region.
    pub fn pixel_at(&self, point: Point) -> Option<(u32, u32)> {
        if self.width() == 0 || self.height() == 0 || !point.is_finite() {
            return None;
        }
        let local = point - self.origin;
        let x = local.x.floor().clamp(0.0, (self.width() - 1) as f64) as u32;
        let y = local.y.floor().clamp(0.0, (self.height() - 1) as f64) as u32;
        Some((x, y))
    }
}

/// What the user pointed at.
#[derive(Debug, Clone)]
pub enum Prompt {
    /// A single foreground click in image space
    Point(Point),
    /// Coarse foreground mask, pixel-aligned with the region
    Mask(GrayImage),
}

/// External segmentation collaborator.
///
/// Both calls may block for seconds and are only ever invoked from
/// background workers. Candidates come back best first; an empty list is a
/// normal outcome meaning nothing was found. `progress` takes a percentage.
pub trait SegmentationAdapter: Send + Sync {
    fn segment(
        &self,
        region: &ImageRegion,
        prompt: &Prompt,
        progress: &dyn Fn(u8),
    ) -> EngineResult<Vec<Polygon>>;

    /// Every object in the region.
    fn segment_all(&self, region: &ImageRegion, progress: &dyn Fn(u8)) -> EngineResult<Vec<Polygon>>;
}
