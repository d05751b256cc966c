use artifact_annotator::geometry::raster::{mask_to_polygons, polygon_to_mask};
use artifact_annotator::{EngineError, GeometryEngine, Point, Polygon};
use image::{GrayImage, Luma};

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon {
    Polygon::from_points(vec![
        Point::new(x0, y0),
        Point::new(x1, y0),
        Point::new(x1, y1),
        Point::new(x0, y1),
    ])
}

fn total_area(parts: &[Polygon]) -> f64 {
    parts.iter().map(Polygon::area).sum()
}

#[test]
fn test_subtract_bisecting_cut_yields_two_halves() {
    let engine = GeometryEngine::default();
    let square = rect(0.0, 0.0, 20.0, 20.0);
    let cut = rect(8.0, -5.0, 12.0, 25.0);

    let parts = engine.subtract(&square, &cut);

    assert_eq!(parts.len(), 2);
    for part in &parts {
        assert!(part.area() > 0.0 && part.area() < square.area());
        assert!((part.area() - 160.0).abs() < 0.001);
    }
    assert!((total_area(&parts) - 320.0).abs() < 0.001);
}

#[test]
fn test_subtract_enclosing_cut_erases_everything() {
    let engine = GeometryEngine::default();
    let parts = engine.subtract(&rect(0.0, 0.0, 20.0, 20.0), &rect(-1.0, -1.0, 21.0, 21.0));
    assert!(parts.is_empty());
}

#[test]
fn test_subtract_disjoint_cut_keeps_polygon() {
    let engine = GeometryEngine::default();
    let square = rect(0.0, 0.0, 20.0, 20.0);
    let parts = engine.subtract(&square, &rect(50.0, 50.0, 60.0, 60.0));

    assert_eq!(parts.len(), 1);
    assert!((parts[0].area() - 400.0).abs() < 0.001);
    assert_eq!(parts[0].outer().len(), 4);
}

#[test]
fn test_subtract_zero_area_cut_keeps_polygon() {
    let engine = GeometryEngine::default();
    let square = rect(0.0, 0.0, 20.0, 20.0);
    // A line across the square, as a polygon with no area
    let cut = Polygon::from_points(vec![
        Point::new(-5.0, 10.0),
        Point::new(25.0, 10.0),
        Point::new(10.0, 10.0),
    ]);

    let parts = engine.subtract(&square, &cut);

    assert_eq!(parts.len(), 1);
    assert!((parts[0].area() - 400.0).abs() < 0.001);
    assert_eq!(parts[0].outer().len(), 4);
}

#[test]
fn test_subtract_drops_slivers_below_minimum_area() {
    let engine = GeometryEngine::default();
    // Leaves a 0.5 x 20 strip on the left and a 10 x 20 block on the right
    let parts = engine.subtract(&rect(0.0, 0.0, 20.0, 20.0), &rect(0.5, -5.0, 10.0, 25.0));

    assert_eq!(parts.len(), 1);
    assert!((parts[0].area() - 200.0).abs() < 0.001);
    assert!(parts[0].bounds().min.x > 9.99);
}

#[test]
fn test_subtract_interior_cut_leaves_hole() {
    let engine = GeometryEngine::default();
    let parts = engine.subtract(&rect(0.0, 0.0, 30.0, 30.0), &rect(10.0, 10.0, 20.0, 20.0));

    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].holes().len(), 1);
    assert!((parts[0].area() - 800.0).abs() < 0.001);
    assert!(!parts[0].contains(Point::new(15.0, 15.0)));
    assert!(parts[0].contains(Point::new(5.0, 5.0)));
}

#[test]
fn test_union_overlapping_and_disjoint() {
    let engine = GeometryEngine::default();

    let merged = engine.union(&rect(0.0, 0.0, 10.0, 10.0), &rect(5.0, 5.0, 15.0, 15.0));
    assert_eq!(merged.len(), 1);
    assert!((merged[0].area() - 175.0).abs() < 0.001);

    let separate = engine.union(&rect(0.0, 0.0, 20.0, 20.0), &rect(30.0, 0.0, 50.0, 20.0));
    assert_eq!(separate.len(), 2);
    assert!((total_area(&separate) - 800.0).abs() < 0.001);
}

#[test]
fn test_intersection_has_no_area_threshold() {
    let engine = GeometryEngine::default();
    let overlap = engine.intersection(&rect(0.0, 0.0, 10.0, 10.0), &rect(5.0, 5.0, 15.0, 15.0));

    assert_eq!(overlap.len(), 1);
    assert!((overlap[0].area() - 25.0).abs() < 0.001);
}

#[test]
fn test_repair_resolves_self_intersection() {
    let engine = GeometryEngine::default();
    let bow_tie = Polygon::from_points(vec![
        Point::new(0.0, 0.0),
        Point::new(20.0, 20.0),
        Point::new(20.0, 0.0),
        Point::new(0.0, 20.0),
    ]);

    let repaired = engine.repair(&bow_tie).unwrap();

    // Two triangular lobes of 100 each; the largest one is kept
    assert!((repaired.area() - 100.0).abs() < 0.001);
    assert_eq!(repaired.outer().len(), 3);
}

#[test]
fn test_repair_collapses_spike() {
    let engine = GeometryEngine::default();
    let spiked = Polygon::from_points(vec![
        Point::new(0.0, 0.0),
        Point::new(20.0, 0.0),
        Point::new(20.0, 10.0),
        Point::new(30.0, 10.0),
        Point::new(20.0, 10.0),
        Point::new(20.0, 20.0),
        Point::new(0.0, 20.0),
    ]);

    let repaired = engine.repair(&spiked).unwrap();

    assert!((repaired.area() - 400.0).abs() < 0.001);
    assert!(repaired.bounds().max.x < 20.001);
    assert_eq!(repaired.outer().len(), 4);
}

#[test]
fn test_repair_rejects_degenerate_input() {
    let engine = GeometryEngine::default();
    let degenerate = Polygon::from_points(vec![
        Point::new(0.0, 0.0),
        Point::new(0.0, 0.0),
        Point::new(10.0, 0.0),
    ]);

    match engine.repair(&degenerate) {
        Err(EngineError::UnrepairableGeometry { distinct_vertices }) => assert!(distinct_vertices < 3),
        other => panic!("expected UnrepairableGeometry, got {:?}", other),
    }
}

#[test]
fn test_validate_enforces_minimum_area() {
    let engine = GeometryEngine::default();

    assert!(engine.validate(&rect(0.0, 0.0, 20.0, 20.0)).is_ok());
    assert!(matches!(
        engine.validate(&rect(0.0, 0.0, 5.0, 5.0)),
        Err(EngineError::BelowMinimumArea { .. })
    ));

    let broken = Polygon::from_points(vec![
        Point::new(0.0, 0.0),
        Point::new(f64::NAN, 0.0),
        Point::new(20.0, 20.0),
    ]);
    assert!(matches!(
        engine.validate(&broken),
        Err(EngineError::InvariantViolation(_))
    ));
}

#[test]
fn test_validate_rejects_zero_length_edges() {
    let engine = GeometryEngine::default();
    let doubled = Polygon::from_points(vec![
        Point::new(0.0, 0.0),
        Point::new(40.0, 40.0),
        Point::new(40.0, 40.0),
        Point::new(0.0, 40.0),
    ]);

    assert!(matches!(engine.validate(&doubled), Err(EngineError::InvalidGeometry(_))));
}

#[test]
fn test_validate_rejects_crossing_edges() {
    let engine = GeometryEngine::default();
    let crossed = Polygon::from_points(vec![
        Point::new(30.0, 0.0),
        Point::new(20.0, 0.0),
        Point::new(20.0, 20.0),
        Point::new(0.0, 20.0),
    ]);
    let folded = Polygon::from_points(vec![
        Point::new(0.0, 0.0),
        Point::new(20.0, 0.0),
        Point::new(20.0, 20.0),
        Point::new(20.0, 10.0),
        Point::new(0.0, 20.0),
    ]);

    assert!(matches!(engine.validate(&crossed), Err(EngineError::InvalidGeometry(_))));
    assert!(matches!(engine.validate(&folded), Err(EngineError::InvalidGeometry(_))));
}

#[test]
fn test_validate_rejects_misplaced_holes() {
    let engine = GeometryEngine::default();
    let outer = rect(0.0, 0.0, 30.0, 60.0).outer().clone();
    let escaped = Polygon::new(outer.clone(), vec![rect(40.0, 10.0, 50.0, 20.0).outer().clone()]);
    let nested = Polygon::new(
        rect(0.0, 0.0, 60.0, 60.0).outer().clone(),
        vec![
            rect(10.0, 10.0, 40.0, 40.0).outer().clone(),
            rect(20.0, 20.0, 30.0, 30.0).outer().clone(),
        ],
    );
    let proper = Polygon::new(outer, vec![rect(10.0, 10.0, 20.0, 20.0).outer().clone()]);

    assert!(matches!(engine.validate(&escaped), Err(EngineError::InvalidGeometry(_))));
    assert!(matches!(engine.validate(&nested), Err(EngineError::InvalidGeometry(_))));
    assert!(engine.validate(&proper).is_ok());
}

#[test]
fn test_centroid_accounts_for_holes() {
    let engine = GeometryEngine::default();
    // Frame with an off-centre hole pulls the centroid away from the hole
    let parts = engine.subtract(&rect(0.0, 0.0, 30.0, 30.0), &rect(15.0, 10.0, 25.0, 20.0));
    let centroid = parts[0].centroid().unwrap();

    assert!((centroid.y - 15.0).abs() < 0.001);
    assert!(centroid.x < 15.0);
}

#[test]
fn test_polygon_to_mask_samples_pixel_centres() {
    let square = rect(2.0, 3.0, 12.0, 8.0);
    let mask = polygon_to_mask(&square, Point::default(), 20, 20);

    let filled = mask.pixels().filter(|p| p[0] > 0).count();
    assert_eq!(filled, 50);
    assert_eq!(mask.get_pixel(2, 3)[0], 255);
    assert_eq!(mask.get_pixel(12, 3)[0], 0);
}

#[test]
fn test_mask_to_polygons_traces_outline_and_holes() {
    let mut mask = GrayImage::new(12, 12);
    for y in 1..11 {
        for x in 1..11 {
            if !(5..7).contains(&x) || !(5..7).contains(&y) {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
    }

    let polygons = mask_to_polygons(&mask, Point::new(100.0, 200.0));

    assert_eq!(polygons.len(), 1);
    let traced = &polygons[0];
    assert_eq!(traced.holes().len(), 1);
    // Outline through the centres of the border pixels
    assert!((traced.outer().area() - 81.0).abs() < 0.001);
    assert_eq!(traced.outer().len(), 4);
    let bounds = traced.bounds();
    assert!((bounds.min.x - 101.5).abs() < 0.001 && (bounds.min.y - 201.5).abs() < 0.001);
    let hole_area = traced.holes()[0].area();
    assert!(hole_area > 4.0 && hole_area <= 9.0, "hole area {}", hole_area);
    assert!(!traced.contains(Point::new(106.0, 206.0)));
    assert!(traced.contains(Point::new(102.5, 202.5)));
}

#[test]
fn test_mask_to_polygons_separates_components() {
    let mut mask = GrayImage::new(10, 4);
    for y in 0..4 {
        for x in [0, 1, 2, 6, 7] {
            mask.put_pixel(x, y, Luma([200]));
        }
    }
    // Below the threshold
    mask.put_pixel(4, 1, Luma([100]));

    let polygons = mask_to_polygons(&mask, Point::default());

    assert_eq!(polygons.len(), 2);
    assert!((polygons[0].area() - 6.0).abs() < 0.001);
    assert!((polygons[1].area() - 3.0).abs() < 0.001);
}

#[test]
fn test_mask_to_polygons_skips_thin_regions() {
    let mut mask = GrayImage::new(10, 10);
    for x in 0..10 {
        mask.put_pixel(x, 2, Luma([255]));
    }
    mask.put_pixel(7, 7, Luma([255]));

    assert!(mask_to_polygons(&mask, Point::default()).is_empty());
}
