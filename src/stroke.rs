use serde::{Deserialize, Serialize};

use crate::geometry::Point;
use crate::util::time;

/// One pointer sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokeSample {
    pub pos: Point,
    /// Seconds, from `util::time::current_time_secs`
    pub timestamp: f64,
}

// Immutable stroke handed to the commit pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    samples: Vec<StrokeSample>,
    /// 0 for free-hand outlines, positive for brush-fill and eraser strokes
    brush_radius: f64,
}

impl Stroke {
    pub fn new(samples: Vec<StrokeSample>, brush_radius: f64) -> Self {
        Self {
            samples,
            brush_radius,
        }
    }

    /// Builds a stroke from bare points, stamping them with the current time
    pub fn from_points(points: impl IntoIterator<Item = Point>, brush_radius: f64) -> Self {
        let timestamp = time::current_time_secs();
        let samples = points
            .into_iter()
            .map(|pos| StrokeSample { pos, timestamp })
            .collect();
        Self::new(samples, brush_radius)
    }

    pub fn samples(&self) -> &[StrokeSample] {
        &self.samples
    }

    pub fn points(&self) -> Vec<Point> {
        self.samples.iter().map(|s| s.pos).collect()
    }

    pub fn brush_radius(&self) -> f64 {
        self.brush_radius
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }
}

/// Collects samples while the pointer is down.
#[derive(Debug, Clone)]
pub struct StrokeBuilder {
    samples: Vec<StrokeSample>,
    brush_radius: f64,
    /// Samples closer than this to the last kept one are dropped
    min_spacing: f64,
}

impl StrokeBuilder {
    pub fn new(brush_radius: f64, min_spacing: f64) -> Self {
        Self {
            samples: Vec::new(),
            brush_radius,
            min_spacing,
        }
    }

    /// Adds a sample; returns false when it was filtered out as too close.
    pub fn add_point(&mut self, pos: Point) -> bool {
        self.add_sample(StrokeSample {
            pos,
            timestamp: time::current_time_secs(),
        })
    }

    pub fn add_sample(&mut self, sample: StrokeSample) -> bool {
        if !sample.pos.is_finite() {
            return false;
        }
        if let Some(last) = self.samples.last() {
            if last.pos.distance(sample.pos) < self.min_spacing {
                return false;
            }
        }
        self.samples.push(sample);
        true
    }

    pub fn samples(&self) -> &[StrokeSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn brush_radius(&self) -> f64 {
        self.brush_radius
    }

    pub fn finish(self) -> Stroke {
        Stroke::new(self.samples, self.brush_radius)
    }
}

/// Local averaging filter over raw pointer samples.
///
/// Output has the same number of points as the input. Each point is a
/// triangular-weighted average over a window that is shrunk symmetrically
/// near the ends, so evenly spaced straight lines come back unchanged.
/// The first and last samples have no neighbours on one side, so their
/// window is empty and they are returned as captured.
#[derive(Debug, Clone, Copy)]
pub struct StrokeSmoother {
    window: usize,
}

impl StrokeSmoother {
    pub fn new(window: usize) -> Self {
        Self { window }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn smooth(&self, points: &[Point]) -> Vec<Point> {
        let n = points.len();
        if n < 3 || self.window == 0 {
            return points.to_vec();
        }

        (0..n)
            .map(|i| {
                let reach = self.window.min(i).min(n - 1 - i);
                let mut sum = Point::default();
                let mut weight_sum = 0.0;
                for j in (i - reach)..=(i + reach) {
                    let p = points[j];
                    if !p.is_finite() {
                        continue;
                    }
                    let weight = (reach + 1 - i.abs_diff(j)) as f64;
                    sum = sum + p * weight;
                    weight_sum += weight;
                }
                if weight_sum > 0.0 {
                    sum * (1.0 / weight_sum)
                } else {
                    points[i]
                }
            })
            .collect()
    }
}
