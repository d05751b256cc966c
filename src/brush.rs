use std::f64::consts::PI;

use log::debug;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::geometry::{GeometryEngine, Point, Polygon, Ring, largest};

/// Turns a smoothed stroke into the region swept by a disc of the brush
/// radius: the union of one capsule per stroke segment.
#[derive(Debug, Clone)]
pub struct BrushRasterizer {
    circle_segments: usize,
    engine: GeometryEngine,
}

impl BrushRasterizer {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            circle_segments: config.circle_segments.max(8),
            engine: GeometryEngine::new(config),
        }
    }

    pub fn rasterize(&self, stroke: &[Point], brush_radius: f64) -> EngineResult<Polygon> {
        if stroke.is_empty() {
            return Err(EngineError::EmptyStroke);
        }
        if !brush_radius.is_finite() || brush_radius <= 0.0 {
            return Err(EngineError::InvalidBrushRadius(brush_radius));
        }

        let centres = thin_out(stroke, brush_radius * 0.25);
        if centres.is_empty() {
            return Err(EngineError::EmptyStroke);
        }
        if centres.len() == 1 {
            return Ok(Polygon::new(self.disc(centres[0], brush_radius), Vec::new()));
        }

        let capsules: Vec<Polygon> = centres
            .windows(2)
            .map(|pair| Polygon::new(self.capsule(pair[0], pair[1], brush_radius), Vec::new()))
            .collect();
        let components = self.engine.union_all(&capsules);
        debug!(
            "brush sweep of {} centres produced {} component(s)",
            centres.len(),
            components.len()
        );
        largest(components).ok_or(EngineError::UnrepairableGeometry {
            distinct_vertices: centres.len(),
        })
    }

    /// Counter-clockwise regular polygon approximating a disc
    pub fn disc(&self, centre: Point, radius: f64) -> Ring {
        let n = self.circle_segments;
        Ring::new(
            (0..n)
                .map(|k| {
                    let angle = 2.0 * PI * k as f64 / n as f64;
                    centre + Point::new(angle.cos(), angle.sin()) * radius
                })
                .collect(),
        )
    }

    /// Stadium around the segment `a`-`b`, counter-clockwise.
    fn capsule(&self, a: Point, b: Point, radius: f64) -> Ring {
        let dir = b - a;
        let normal = dir.perp() * (1.0 / dir.length());
        let base = normal.y.atan2(normal.x);
        let half = (self.circle_segments / 2).max(4);
        let arc = |centre: Point, start: f64| {
            (0..=half).map(move |k| {
                let angle = start + PI * k as f64 / half as f64;
                centre + Point::new(angle.cos(), angle.sin()) * radius
            })
        };
        // Right side of `b`, round the front to the left side, then back
        // along the left of the segment and round the tail of `a`.
        let points: Vec<Point> = arc(b, base - PI).chain(arc(a, base)).collect();
        Ring::new(points)
    }
}

/// Keeps the first point and every point at least `spacing` from the last
/// kept one, plus the final point when it moved at all.
fn thin_out(points: &[Point], spacing: f64) -> Vec<Point> {
    let mut kept: Vec<Point> = Vec::with_capacity(points.len());
    for p in points.iter().filter(|p| p.is_finite()) {
        match kept.last() {
            Some(last) if last.distance(*p) < spacing => {}
            _ => kept.push(*p),
        }
    }
    if let (Some(last_input), Some(last_kept)) = (points.iter().rev().find(|p| p.is_finite()), kept.last()) {
        if last_input.distance(*last_kept) > f64::EPSILON {
            kept.push(*last_input);
        }
    }
    kept
}
