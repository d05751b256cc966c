use artifact_annotator::{ArtifactStore, Attributes, EngineConfig, EngineError, Point, Polygon};

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon {
    Polygon::from_points(vec![
        Point::new(x0, y0),
        Point::new(x1, y0),
        Point::new(x1, y1),
        Point::new(x0, y1),
    ])
}

#[test]
fn test_add_and_get() {
    let mut store = ArtifactStore::default();
    let attributes: Attributes = [("name", "sherd"), ("layer", "3")].into_iter().collect();

    let id = store.add(rect(0.0, 0.0, 20.0, 20.0), Some(attributes.clone())).unwrap();

    let artifact = store.get(id).unwrap();
    assert_eq!(artifact.id(), id);
    assert_eq!(artifact.attributes(), &attributes);
    assert!((artifact.geometry().area() - 400.0).abs() < 0.001);
    assert_eq!(store.len(), 1);
}

#[test]
fn test_add_rejects_small_geometry() {
    let mut store = ArtifactStore::default();

    let result = store.add(rect(0.0, 0.0, 5.0, 5.0), None);

    assert!(matches!(result, Err(EngineError::BelowMinimumArea { .. })));
    assert!(store.is_empty());
}

#[test]
fn test_remove_missing_is_not_found() {
    let mut store = ArtifactStore::default();
    let id = store.add(rect(0.0, 0.0, 20.0, 20.0), None).unwrap();

    store.remove(id).unwrap();

    assert!(matches!(store.remove(id), Err(EngineError::NotFound(missing)) if missing == id));
    assert!(matches!(store.get(id), Err(EngineError::NotFound(_))));
}

#[test]
fn test_failed_replace_keeps_previous_geometry() {
    let mut store = ArtifactStore::default();
    let id = store.add(rect(0.0, 0.0, 20.0, 20.0), None).unwrap();

    assert!(store.replace(id, rect(0.0, 0.0, 2.0, 2.0)).is_err());
    assert!((store.get(id).unwrap().geometry().area() - 400.0).abs() < 0.001);

    let previous = store.replace(id, rect(0.0, 0.0, 30.0, 30.0)).unwrap();
    assert!((previous.area() - 400.0).abs() < 0.001);
    assert!((store.get(id).unwrap().geometry().area() - 900.0).abs() < 0.001);
}

#[test]
fn test_split_assigns_new_ids_and_distinct_colors() {
    let mut store = ArtifactStore::default();
    let attributes: Attributes = [("name", "bone")].into_iter().collect();
    let id = store.add(rect(0.0, 0.0, 20.0, 20.0), Some(attributes.clone())).unwrap();
    let source_color = store.get(id).unwrap().fill_color();

    let parts = vec![rect(0.0, 0.0, 8.0, 20.0), rect(12.0, 0.0, 20.0, 20.0)];
    let ids = store.split(id, parts).unwrap();

    assert_eq!(ids.len(), 2);
    assert!(!store.contains(id));
    assert!(ids.iter().all(|new_id| *new_id != id));
    let first = store.get(ids[0]).unwrap();
    let second = store.get(ids[1]).unwrap();
    assert_eq!(first.attributes(), &attributes);
    assert_eq!(second.attributes(), &attributes);
    assert_ne!(first.fill_color(), source_color);
    assert_ne!(second.fill_color(), source_color);
    assert_ne!(first.fill_color(), second.fill_color());
    assert!(first.geometry().bounds().max.x < 8.001);
}

#[test]
fn test_split_with_invalid_part_changes_nothing() {
    let mut store = ArtifactStore::default();
    let id = store.add(rect(0.0, 0.0, 20.0, 20.0), None).unwrap();

    let result = store.split(id, vec![rect(0.0, 0.0, 15.0, 20.0), rect(19.0, 0.0, 20.0, 1.0)]);

    assert!(result.is_err());
    assert!(store.contains(id));
    assert_eq!(store.len(), 1);
}

#[test]
fn test_all_is_ordered_by_creation() {
    let mut store = ArtifactStore::default();
    let a = store.add(rect(0.0, 0.0, 20.0, 20.0), None).unwrap();
    let b = store.add(rect(30.0, 0.0, 50.0, 20.0), None).unwrap();
    let c = store.add(rect(60.0, 0.0, 80.0, 20.0), None).unwrap();

    let removed = store.remove(b).unwrap();
    store.insert_artifact(removed).unwrap();

    let order: Vec<_> = store.all().iter().map(|artifact| artifact.id()).collect();
    assert_eq!(order, vec![a, b, c]);
    assert!(store.all().windows(2).all(|w| w[0].created_at() < w[1].created_at()));
}

#[test]
fn test_artifact_at_prefers_newest() {
    let mut store = ArtifactStore::default();
    let below = store.add(rect(0.0, 0.0, 40.0, 40.0), None).unwrap();
    let above = store.add(rect(10.0, 10.0, 30.0, 30.0), None).unwrap();

    assert_eq!(store.artifact_at(Point::new(20.0, 20.0)), Some(above));
    assert_eq!(store.artifact_at(Point::new(5.0, 5.0)), Some(below));
    assert_eq!(store.artifact_at(Point::new(100.0, 100.0)), None);
}

#[test]
fn test_set_attribute_keeps_insertion_order() {
    let mut store = ArtifactStore::default();
    let attributes: Attributes = [("a", "1"), ("b", "2")].into_iter().collect();
    let id = store.add(rect(0.0, 0.0, 20.0, 20.0), Some(attributes)).unwrap();

    assert_eq!(store.set_attribute(id, "a", "10").unwrap(), Some("1".to_string()));
    assert_eq!(store.set_attribute(id, "c", "3").unwrap(), None);

    let keys: Vec<&str> = store.get(id).unwrap().attributes().iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["a", "b", "c"]);
    assert_eq!(store.get(id).unwrap().attributes().get("a"), Some("10"));
}

#[test]
fn test_colors_are_reproducible_for_same_seed() {
    let config = EngineConfig {
        color_seed: 1234,
        ..EngineConfig::default()
    };
    let mut first = ArtifactStore::new(&config);
    let mut second = ArtifactStore::new(&config);

    let a = first.add(rect(0.0, 0.0, 20.0, 20.0), None).unwrap();
    let b = second.add(rect(0.0, 0.0, 20.0, 20.0), None).unwrap();

    assert_eq!(first.get(a).unwrap().fill_color(), second.get(b).unwrap().fill_color());
}

#[test]
fn test_new_artifact_avoids_touching_neighbour_color() {
    let mut store = ArtifactStore::default();
    let a = store.add(rect(0.0, 0.0, 20.0, 20.0), None).unwrap();
    let b = store.add(rect(10.0, 10.0, 30.0, 30.0), None).unwrap();

    assert_ne!(store.get(a).unwrap().fill_color(), store.get(b).unwrap().fill_color());
}
