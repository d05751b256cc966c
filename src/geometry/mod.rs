//! Plain geometric data in image pixel space.
//!
//! Rings are stored open (the closing edge is implicit). Polygons keep their
//! outer ring counter-clockwise (positive signed area) and holes clockwise, so
//! nonzero winding gives the filled region directly.

mod engine;
pub mod raster;

pub use engine::GeometryEngine;
pub(crate) use engine::largest;

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// Result type of any boolean operation that may fragment its input.
pub type MultiPolygon = Vec<Polygon>;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn distance(self, other: Point) -> f64 {
        (self - other).length()
    }

    pub fn dot(self, other: Point) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// z-component of the 2D cross product
    pub fn cross(self, other: Point) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// Perpendicular pointing to the left of `self`
    pub fn perp(self) -> Point {
        Point::new(-self.y, self.x)
    }

    pub fn lerp(self, other: Point, t: f64) -> Point {
        self + (other - self) * t
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;
    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl From<egui::Pos2> for Point {
    fn from(pos: egui::Pos2) -> Self {
        Point::new(pos.x as f64, pos.y as f64)
    }
}

impl From<Point> for egui::Pos2 {
    fn from(point: Point) -> Self {
        egui::pos2(point.x as f32, point.y as f32)
    }
}

/// Axis-aligned rectangle in image space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

impl Bounds {
    /// Bounds that contain nothing; extending it with a point yields that point.
    pub const NOTHING: Bounds = Bounds {
        min: Point::new(f64::INFINITY, f64::INFINITY),
        max: Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
    };

    pub fn from_min_max(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point>) -> Self {
        points
            .into_iter()
            .fold(Bounds::NOTHING, |bounds, p| bounds.extended(*p))
    }

    pub fn extended(self, p: Point) -> Self {
        Self {
            min: Point::new(self.min.x.min(p.x), self.min.y.min(p.y)),
            max: Point::new(self.max.x.max(p.x), self.max.y.max(p.y)),
        }
    }

    pub fn union(self, other: Bounds) -> Self {
        self.extended(other.min).extended(other.max)
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn is_empty(&self) -> bool {
        !(self.min.x < self.max.x && self.min.y < self.max.y)
    }

    pub fn center(&self) -> Point {
        self.min.lerp(self.max, 0.5)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn contains_bounds(&self, other: &Bounds) -> bool {
        self.contains(other.min) && self.contains(other.max)
    }

    /// Closed-interval overlap test, so touching rectangles intersect
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }

    pub fn expand(self, amount: f64) -> Self {
        Self {
            min: Point::new(self.min.x - amount, self.min.y - amount),
            max: Point::new(self.max.x + amount, self.max.y + amount),
        }
    }

    pub fn to_polygon(&self) -> Polygon {
        Polygon::new(
            Ring::new(vec![
                self.min,
                Point::new(self.max.x, self.min.y),
                self.max,
                Point::new(self.min.x, self.max.y),
            ]),
            Vec::new(),
        )
    }
}

impl From<egui::Rect> for Bounds {
    fn from(rect: egui::Rect) -> Self {
        Bounds::from_min_max(rect.min.into(), rect.max.into())
    }
}

/// Closed loop of points, stored without repeating the first point.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Ring {
    points: Vec<Point>,
}

impl Ring {
    pub fn new(points: Vec<Point>) -> Self {
        let mut points = points;
        // Accept explicitly closed input.
        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        Self { points }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Edges including the implicit closing edge
    pub fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }

    /// Shoelace area, positive for counter-clockwise rings
    pub fn signed_area(&self) -> f64 {
        self.edges().map(|(a, b)| a.cross(b)).sum::<f64>() * 0.5
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    pub fn reversed(&self) -> Ring {
        let mut points = self.points.clone();
        points.reverse();
        Ring { points }
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::from_points(&self.points)
    }

    /// Nonzero winding number of the ring around `p`.
    pub fn winding_number(&self, p: Point) -> i32 {
        winding_number(&self.points, p)
    }

    pub fn contains(&self, p: Point) -> bool {
        self.winding_number(p) != 0
    }

    /// Distance from `p` to the nearest point on the ring's boundary.
    pub fn distance_to(&self, p: Point) -> f64 {
        self.edges()
            .map(|(a, b)| distance_to_segment(p, a, b))
            .fold(f64::INFINITY, f64::min)
    }

    /// Index of the vertex nearest to `p`, if it is closer than `tolerance`.
    pub fn vertex_near(&self, p: Point, tolerance: f64) -> Option<usize> {
        nearest_within(self.points.iter().map(|v| v.distance(p)), tolerance)
    }

    /// Index of the edge (vertex `i` to vertex `i + 1`) nearest to `p`, if it
    /// is closer than `tolerance`.
    pub fn edge_near(&self, p: Point, tolerance: f64) -> Option<usize> {
        nearest_within(self.edges().map(|(a, b)| distance_to_segment(p, a, b)), tolerance)
    }

    /// Indices of the vertices inside `bounds`, in ring order.
    pub fn vertices_in(&self, bounds: &Bounds) -> Vec<usize> {
        self.points
            .iter()
            .enumerate()
            .filter(|(_, p)| bounds.contains(**p))
            .map(|(i, _)| i)
            .collect()
    }

    /// Number of vertices that are not within `tolerance` of an earlier one.
    pub fn distinct_vertices(&self, tolerance: f64) -> usize {
        let mut distinct: Vec<Point> = Vec::with_capacity(self.points.len());
        for p in &self.points {
            if distinct.iter().all(|q| q.distance(*p) > tolerance) {
                distinct.push(*p);
            }
        }
        distinct.len()
    }

    /// Drops near-duplicate and collinear vertices, which also collapses
    /// zero-width spikes. May leave fewer than three points.
    pub fn cleaned(&self, tolerance: f64) -> Ring {
        let mut points: Vec<Point> = Vec::with_capacity(self.points.len());
        for p in &self.points {
            if !p.is_finite() {
                continue;
            }
            if points.last().is_none_or(|last| last.distance(*p) > tolerance) {
                points.push(*p);
            }
        }
        while points.len() > 1 && points[0].distance(points[points.len() - 1]) <= tolerance {
            points.pop();
        }

        let mut changed = true;
        while changed && points.len() >= 3 {
            changed = false;
            let mut i = 0;
            while i < points.len() && points.len() >= 3 {
                let n = points.len();
                let prev = points[(i + n - 1) % n];
                let cur = points[i];
                let next = points[(i + 1) % n];
                let span = prev.distance(next).max(tolerance);
                // Distance of `cur` from the line through its neighbours.
                let offset = (cur - prev).cross(next - prev).abs() / span;
                if offset <= tolerance || cur.distance(next) <= tolerance {
                    points.remove(i);
                    changed = true;
                } else {
                    i += 1;
                }
            }
        }
        Ring { points }
    }

    /// Area-weighted centroid accumulators: (signed area, sum x, sum y)
    fn centroid_terms(&self) -> (f64, f64, f64) {
        let mut area = 0.0;
        let mut cx = 0.0;
        let mut cy = 0.0;
        for (a, b) in self.edges() {
            let cross = a.cross(b);
            area += cross;
            cx += (a.x + b.x) * cross;
            cy += (a.y + b.y) * cross;
        }
        (area * 0.5, cx / 6.0, cy / 6.0)
    }
}

/// Distance from `p` to the segment `a`-`b`.
pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let segment = b - a;
    let length_sq = segment.dot(segment);
    if length_sq < 1e-12 {
        return p.distance(a);
    }
    let t = ((p - a).dot(segment) / length_sq).clamp(0.0, 1.0);
    p.distance(a + segment * t)
}

fn nearest_within(distances: impl Iterator<Item = f64>, tolerance: f64) -> Option<usize> {
    distances
        .enumerate()
        .filter(|(_, d)| *d < tolerance)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

fn winding_number(points: &[Point], p: Point) -> i32 {
    let n = points.len();
    let mut winding = 0;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        let side = (b - a).cross(p - a);
        if a.y <= p.y {
            if b.y > p.y && side > 0.0 {
                winding += 1;
            }
        } else if b.y <= p.y && side < 0.0 {
            winding -= 1;
        }
    }
    winding
}

/// One outer ring plus holes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    outer: Ring,
    holes: Vec<Ring>,
}

impl Polygon {
    /// Builds a polygon, normalising ring orientation.
    pub fn new(outer: Ring, holes: Vec<Ring>) -> Self {
        let outer = if outer.signed_area() < 0.0 {
            outer.reversed()
        } else {
            outer
        };
        let holes = holes
            .into_iter()
            .map(|hole| {
                if hole.signed_area() > 0.0 {
                    hole.reversed()
                } else {
                    hole
                }
            })
            .collect();
        Self { outer, holes }
    }

    pub fn from_points(points: Vec<Point>) -> Self {
        Self::new(Ring::new(points), Vec::new())
    }

    pub fn outer(&self) -> &Ring {
        &self.outer
    }

    pub fn holes(&self) -> &[Ring] {
        &self.holes
    }

    pub fn rings(&self) -> impl Iterator<Item = &Ring> + '_ {
        std::iter::once(&self.outer).chain(self.holes.iter())
    }

    /// Outer area minus hole areas
    pub fn area(&self) -> f64 {
        self.outer.area() - self.holes.iter().map(Ring::area).sum::<f64>()
    }

    pub fn bounds(&self) -> Bounds {
        self.outer.bounds()
    }

    pub fn contains(&self, p: Point) -> bool {
        self.outer.contains(p) && !self.holes.iter().any(|hole| hole.contains(p))
    }

    pub fn is_finite(&self) -> bool {
        self.rings().all(|ring| ring.points().iter().all(|p| p.is_finite()))
    }

    /// Area-weighted centroid of the outer ring minus holes.
    pub fn centroid(&self) -> Option<Point> {
        let (mut area, mut cx, mut cy) = (0.0, 0.0, 0.0);
        for ring in self.rings() {
            let (a, x, y) = ring.centroid_terms();
            area += a;
            cx += x;
            cy += y;
        }
        if area.abs() < f64::EPSILON {
            return None;
        }
        let centroid = Point::new(cx / area, cy / area);
        centroid.is_finite().then_some(centroid)
    }

    /// A point strictly inside the polygon, preferring the widest horizontal
    /// span near the centroid row.
    pub fn interior_point(&self) -> Option<Point> {
        let bounds = self.bounds();
        if bounds.is_empty() {
            return None;
        }
        let preferred = self.centroid().map_or(bounds.center().y, |c| c.y);
        let rows = [preferred, 0.5, 0.25, 0.75, 0.125, 0.375, 0.625, 0.875];
        for (i, row) in rows.iter().enumerate() {
            let y = if i == 0 {
                *row
            } else {
                bounds.min.y + bounds.height() * row
            };
            if let Some(p) = self.widest_span_midpoint(y) {
                return Some(p);
            }
        }
        None
    }

    fn widest_span_midpoint(&self, y: f64) -> Option<Point> {
        let mut crossings: Vec<f64> = Vec::new();
        for ring in self.rings() {
            for (a, b) in ring.edges() {
                if (a.y <= y) != (b.y <= y) {
                    let t = (y - a.y) / (b.y - a.y);
                    crossings.push(a.x + t * (b.x - a.x));
                }
            }
        }
        crossings.sort_by(f64::total_cmp);
        crossings
            .chunks_exact(2)
            .map(|span| (span[0], span[1]))
            .filter(|(x0, x1)| x1 - x0 > f64::EPSILON)
            .max_by(|a, b| (a.1 - a.0).total_cmp(&(b.1 - b.0)))
            .map(|(x0, x1)| Point::new((x0 + x1) * 0.5, y))
            .filter(|p| self.contains(*p))
    }
}
