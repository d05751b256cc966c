use geo::algorithm::line_intersection::{LineIntersection, line_intersection};
use geo::{BooleanOps, Coord, Line, LineString};
use log::debug;

use super::{MultiPolygon, Point, Polygon, Ring};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};

/// Vertices closer than this are treated as the same vertex.
const VERTEX_TOLERANCE: f64 = 1e-3;

type GeoPolygon = geo::Polygon<f64>;
type GeoMultiPolygon = geo::MultiPolygon<f64>;

/// Boolean combination, repair and validation for artifact geometry.
///
/// The set operations run on `geo`'s `BooleanOps` (even-odd fill for each
/// operand). Results are converted back into [`Polygon`]s with near-duplicate
/// and collinear vertices removed.
#[derive(Debug, Clone)]
pub struct GeometryEngine {
    min_area: f64,
    min_distinct_vertices: usize,
}

impl Default for GeometryEngine {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl GeometryEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            min_area: config.min_artifact_area,
            min_distinct_vertices: config.min_distinct_vertices,
        }
    }

    pub fn min_area(&self) -> f64 {
        self.min_area
    }

    /// Removes `cut` from `base`. Components below the minimum area are
    /// dropped; an empty result means the base was fully erased.
    pub fn subtract(&self, base: &Polygon, cut: &Polygon) -> MultiPolygon {
        let parts = from_geo(to_geo(base).difference(&to_geo(cut)));
        self.drop_slivers(parts)
    }

    /// Union of two polygons. Disjoint inputs come back as two components.
    pub fn union(&self, a: &Polygon, b: &Polygon) -> MultiPolygon {
        let parts = from_geo(to_geo(a).union(&to_geo(b)));
        self.drop_slivers(parts)
    }

    /// Region covered by both polygons. No area threshold is applied, since
    /// callers use this for placement rather than storage.
    pub fn intersection(&self, a: &Polygon, b: &Polygon) -> MultiPolygon {
        from_geo(to_geo(a).intersection(&to_geo(b)))
    }

    /// Union of any number of polygons, merged pairwise. No area threshold.
    pub fn union_all(&self, polygons: &[Polygon]) -> MultiPolygon {
        let mut layer: Vec<GeoMultiPolygon> = polygons
            .iter()
            .map(|p| GeoMultiPolygon::new(vec![to_geo(p)]))
            .collect();
        while layer.len() > 1 {
            layer = layer
                .chunks(2)
                .map(|pair| {
                    pair[1..]
                        .iter()
                        .fold(pair[0].clone(), |merged, next| merged.union(next))
                })
                .collect();
        }
        layer.pop().map(from_geo).unwrap_or_default()
    }

    /// Resolves self-intersections and spikes. A polygon that falls apart is
    /// repaired to its largest component.
    pub fn repair(&self, polygon: &Polygon) -> EngineResult<Polygon> {
        let components = self.repair_components(polygon)?;
        largest(components).ok_or(EngineError::UnrepairableGeometry {
            distinct_vertices: polygon.outer().distinct_vertices(VERTEX_TOLERANCE),
        })
    }

    /// Every valid component of a possibly self-intersecting polygon.
    pub fn repair_components(&self, polygon: &Polygon) -> EngineResult<MultiPolygon> {
        let cleaned = Polygon::new(
            polygon.outer().cleaned(VERTEX_TOLERANCE),
            polygon
                .holes()
                .iter()
                .map(|hole| hole.cleaned(VERTEX_TOLERANCE))
                .filter(|hole| hole.len() >= 3)
                .collect(),
        );
        let distinct = cleaned.outer().distinct_vertices(VERTEX_TOLERANCE);
        if distinct < self.min_distinct_vertices {
            return Err(EngineError::UnrepairableGeometry {
                distinct_vertices: distinct,
            });
        }

        // Overlaying against nothing re-nodes the rings at every crossing.
        let resolved = GeoMultiPolygon::new(vec![to_geo(&cleaned)]).union(&GeoMultiPolygon::new(Vec::new()));
        let components: MultiPolygon = from_geo(resolved)
            .into_iter()
            .filter(|p| p.outer().distinct_vertices(VERTEX_TOLERANCE) >= self.min_distinct_vertices)
            .filter(|p| p.area() > 0.0)
            .collect();
        debug!("repair produced {} component(s)", components.len());
        if components.is_empty() {
            return Err(EngineError::UnrepairableGeometry {
                distinct_vertices: distinct,
            });
        }
        Ok(components)
    }

    /// Checks a polygon against the storage invariants: finite coordinates,
    /// enough distinct vertices, no zero-length edges, no crossing or
    /// overlapping edges, holes inside the outer ring and apart from each
    /// other, and the minimum area.
    pub fn validate(&self, polygon: &Polygon) -> EngineResult<()> {
        if !polygon.is_finite() {
            return Err(EngineError::InvariantViolation(
                "polygon has non-finite coordinates".to_string(),
            ));
        }
        let distinct = polygon.outer().distinct_vertices(VERTEX_TOLERANCE);
        if distinct < self.min_distinct_vertices {
            return Err(EngineError::UnrepairableGeometry {
                distinct_vertices: distinct,
            });
        }
        check_topology(polygon)?;
        let area = polygon.area();
        if !(area >= self.min_area) || area <= 0.0 {
            return Err(EngineError::BelowMinimumArea {
                area,
                minimum: self.min_area,
            });
        }
        Ok(())
    }

    fn drop_slivers(&self, parts: MultiPolygon) -> MultiPolygon {
        let before = parts.len();
        let kept: MultiPolygon = parts
            .into_iter()
            .filter(|p| p.area() >= self.min_area && p.area() > 0.0)
            .collect();
        if kept.len() != before {
            debug!("dropped {} sliver(s) below {:.1}", before - kept.len(), self.min_area);
        }
        kept
    }
}

/// Largest-area component, first discovered wins ties.
pub(crate) fn largest(components: MultiPolygon) -> Option<Polygon> {
    components.into_iter().reduce(|best, p| if p.area() > best.area() { p } else { best })
}

fn to_coord(p: Point) -> Coord<f64> {
    Coord { x: p.x, y: p.y }
}

fn to_line_string(ring: &Ring) -> LineString<f64> {
    ring.points().iter().map(|p| to_coord(*p)).collect()
}

fn to_geo(polygon: &Polygon) -> GeoPolygon {
    GeoPolygon::new(
        to_line_string(polygon.outer()),
        polygon.holes().iter().map(to_line_string).collect(),
    )
}

fn from_line_string(line: &LineString<f64>) -> Ring {
    Ring::new(line.coords().map(|c| Point::new(c.x, c.y)).collect()).cleaned(VERTEX_TOLERANCE)
}

fn from_geo(polygons: GeoMultiPolygon) -> MultiPolygon {
    polygons
        .into_iter()
        .filter_map(|polygon| {
            let (exterior, interiors) = polygon.into_inner();
            let outer = from_line_string(&exterior);
            if outer.len() < 3 {
                return None;
            }
            let holes = interiors
                .iter()
                .map(from_line_string)
                .filter(|hole| hole.len() >= 3)
                .collect();
            Some(Polygon::new(outer, holes))
        })
        .collect()
}

fn ring_name(index: usize) -> String {
    match index {
        0 => "outer ring".to_string(),
        n => format!("hole {}", n - 1),
    }
}

struct RingEdge {
    ring: usize,
    index: usize,
    ring_len: usize,
    line: Line<f64>,
}

impl RingEdge {
    fn min_x(&self) -> f64 {
        self.line.start.x.min(self.line.end.x)
    }

    fn max_x(&self) -> f64 {
        self.line.start.x.max(self.line.end.x)
    }

    fn min_y(&self) -> f64 {
        self.line.start.y.min(self.line.end.y)
    }

    fn max_y(&self) -> f64 {
        self.line.start.y.max(self.line.end.y)
    }

    fn is_adjacent(&self, other: &RingEdge) -> bool {
        let gap = self.index.abs_diff(other.index);
        self.ring == other.ring && (gap == 1 || gap + 1 == self.ring_len)
    }
}

fn check_topology(polygon: &Polygon) -> EngineResult<()> {
    for (r, ring) in polygon.rings().enumerate() {
        if let Some(i) = ring.edges().position(|(a, b)| a.distance(b) <= VERTEX_TOLERANCE) {
            return Err(EngineError::InvalidGeometry(format!(
                "{} has a zero-length edge at vertex {}",
                ring_name(r),
                i
            )));
        }
    }

    // Sweep over x so only edges with overlapping extents are compared.
    let mut edges: Vec<RingEdge> = polygon
        .rings()
        .enumerate()
        .flat_map(|(r, ring)| {
            let ring_len = ring.len();
            ring.edges().enumerate().map(move |(index, (a, b))| RingEdge {
                ring: r,
                index,
                ring_len,
                line: Line::new(to_coord(a), to_coord(b)),
            })
        })
        .collect();
    edges.sort_by(|a, b| a.min_x().total_cmp(&b.min_x()));

    for (k, edge) in edges.iter().enumerate() {
        for other in &edges[k + 1..] {
            if other.min_x() > edge.max_x() {
                break;
            }
            if other.min_y() > edge.max_y() || other.max_y() < edge.min_y() {
                continue;
            }
            match line_intersection(edge.line, other.line) {
                Some(LineIntersection::SinglePoint { is_proper: true, .. }) => {
                    return Err(EngineError::InvalidGeometry(format!(
                        "{} crosses {}",
                        ring_name(edge.ring),
                        ring_name(other.ring)
                    )));
                }
                Some(LineIntersection::Collinear { .. }) => {
                    let what = if edge.is_adjacent(other) { "folds back on itself" } else { "overlaps itself" };
                    return Err(EngineError::InvalidGeometry(format!("{} {}", ring_name(edge.ring), what)));
                }
                // Touching at a single vertex
                _ => {}
            }
        }
    }

    let outer = polygon.outer();
    let holes = polygon.holes();
    for (h, hole) in holes.iter().enumerate() {
        let escapes = hole
            .points()
            .iter()
            .any(|p| !outer.contains(*p) && outer.distance_to(*p) > VERTEX_TOLERANCE);
        if escapes {
            return Err(EngineError::InvalidGeometry(format!(
                "hole {} is not inside the outer ring",
                h
            )));
        }
        for (g, other) in holes.iter().enumerate() {
            let nested = g != h
                && hole
                    .points()
                    .iter()
                    .any(|p| other.contains(*p) && other.distance_to(*p) > VERTEX_TOLERANCE);
            if nested {
                return Err(EngineError::InvalidGeometry(format!("hole {} overlaps hole {}", h, g)));
            }
        }
    }
    Ok(())
}
