use std::collections::HashMap;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::time::{Duration, Instant};

use artifact_annotator::segmentation::{ColorRegionAdapter, DetectionKind};
use artifact_annotator::state::DetectionOutcome;
use artifact_annotator::{
    AnnotationSession, EditOutcome, EditingMode, EngineConfig, EngineError, EngineResult, EventRecorder,
    ImageRegion, Point, Polygon, Prompt, SegmentationAdapter, SessionEvent,
};
use image::{Rgb, RgbImage};
use parking_lot::Mutex;

/// Blocks each click request until the test releases it, then answers with a
/// 20x20 square centred on the click.
#[derive(Default)]
struct GatedAdapter {
    gates: Mutex<HashMap<u32, Receiver<()>>>,
    report: Option<u8>,
}

impl GatedAdapter {
    fn gate(&self, x: f64) -> Sender<()> {
        let (tx, rx) = channel();
        self.gates.lock().insert(x as u32, rx);
        tx
    }
}

impl SegmentationAdapter for GatedAdapter {
    fn segment(&self, _region: &ImageRegion, prompt: &Prompt, progress: &dyn Fn(u8)) -> EngineResult<Vec<Polygon>> {
        let Prompt::Point(p) = prompt else {
            return Ok(Vec::new());
        };
        if let Some(percent) = self.report {
            progress(percent);
        }
        let gate = self.gates.lock().remove(&(p.x as u32));
        if let Some(gate) = gate {
            let _ = gate.recv_timeout(Duration::from_secs(5));
        }
        Ok(vec![square(p.x - 10.0, p.y - 10.0, 20.0)])
    }

    fn segment_all(&self, _region: &ImageRegion, _progress: &dyn Fn(u8)) -> EngineResult<Vec<Polygon>> {
        Ok(Vec::new())
    }
}

fn square(x: f64, y: f64, size: f64) -> Polygon {
    Polygon::from_points(vec![
        Point::new(x, y),
        Point::new(x + size, y),
        Point::new(x + size, y + size),
        Point::new(x, y + size),
    ])
}

fn blank_image() -> Arc<RgbImage> {
    Arc::new(RgbImage::from_pixel(200, 200, Rgb([255, 255, 255])))
}

/// White 100x100 image with black squares at the given top-left corners.
fn image_with_squares(corners: &[(u32, u32)]) -> Arc<RgbImage> {
    let mut image = RgbImage::from_pixel(100, 100, Rgb([255, 255, 255]));
    for &(x0, y0) in corners {
        for y in y0..y0 + 20 {
            for x in x0..x0 + 20 {
                image.put_pixel(x, y, Rgb([0, 0, 0]));
            }
        }
    }
    Arc::new(image)
}

fn session_with(adapter: Arc<dyn SegmentationAdapter>, image: Arc<RgbImage>) -> AnnotationSession {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut session = AnnotationSession::with_adapter(EngineConfig::default(), adapter).unwrap();
    session.set_image(image);
    session
}

fn click(session: &mut AnnotationSession, at: Point) -> u64 {
    session.set_mode(EditingMode::ClickDetect);
    session.pointer_down(at).unwrap();
    match session.pointer_up(at).unwrap() {
        EditOutcome::DetectionSubmitted { sequence } => sequence,
        other => panic!("expected a submitted detection, got {:?}", other),
    }
}

/// Polls until `done` holds for the outcomes collected so far.
fn wait_for(
    session: &mut AnnotationSession,
    mut done: impl FnMut(&AnnotationSession, &[DetectionOutcome]) -> bool,
) -> Vec<DetectionOutcome> {
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut outcomes = Vec::new();
    loop {
        outcomes.extend(session.poll_detections());
        if done(session, &outcomes) {
            return outcomes;
        }
        assert!(Instant::now() < deadline, "timed out waiting for detection");
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn test_late_result_of_superseded_request_is_discarded() {
    let adapter = Arc::new(GatedAdapter::default());
    let release_a = adapter.gate(50.0);
    let release_b = adapter.gate(150.0);
    let mut session = session_with(adapter.clone(), blank_image());
    let recorder = EventRecorder::new();
    session.events().subscribe(recorder.handler());

    let a = click(&mut session, Point::new(50.0, 50.0));
    let b = click(&mut session, Point::new(150.0, 150.0));
    assert!(b > a);

    release_b.send(()).unwrap();
    let outcomes = wait_for(&mut session, |_, outcomes| !outcomes.is_empty());
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].sequence, b);
    assert_eq!(outcomes[0].kind, DetectionKind::Click);
    let created = outcomes[0].result.as_ref().unwrap().clone();

    // A may already have been skipped before inference started
    let _ = release_a.send(());
    let mut seen = recorder.take();
    let late = wait_for(&mut session, |_, _| {
        seen.extend(recorder.take());
        seen.contains(&SessionEvent::DetectionDiscarded { sequence: a })
    });
    assert!(late.is_empty());

    assert_eq!(session.store().len(), 1);
    let artifact = session.store().get(created[0]).unwrap();
    assert!(artifact.geometry().bounds().contains(Point::new(150.0, 150.0)));
    assert!(!session.detection_pending());
}

#[test]
fn test_stale_result_arriving_first_is_discarded() {
    let adapter = Arc::new(GatedAdapter::default());
    let release_a = adapter.gate(50.0);
    let release_b = adapter.gate(150.0);
    let mut session = session_with(adapter.clone(), blank_image());

    let _a = click(&mut session, Point::new(50.0, 50.0));
    let b = click(&mut session, Point::new(150.0, 150.0));

    let _ = release_a.send(());
    std::thread::sleep(Duration::from_millis(50));
    assert!(session.poll_detections().is_empty());
    assert!(session.store().is_empty());
    assert!(session.detection_pending());

    release_b.send(()).unwrap();
    let outcomes = wait_for(&mut session, |_, outcomes| !outcomes.is_empty());
    assert_eq!(outcomes[0].sequence, b);
    assert_eq!(session.store().len(), 1);
}

#[test]
fn test_progress_of_running_request() {
    let adapter = Arc::new(GatedAdapter {
        report: Some(50),
        ..GatedAdapter::default()
    });
    let release = adapter.gate(50.0);
    let mut session = session_with(adapter.clone(), blank_image());
    assert_eq!(session.detection_progress(), None);

    click(&mut session, Point::new(50.0, 50.0));
    wait_for(&mut session, |s, _| s.detection_progress() == Some(50));

    release.send(()).unwrap();
    wait_for(&mut session, |_, outcomes| !outcomes.is_empty());
    assert_eq!(session.detection_progress(), None);
}

#[test]
fn test_empty_result_means_nothing_found() {
    let mut session = session_with(Arc::new(GatedAdapter::default()), blank_image());

    session.detect_all().unwrap();
    let outcomes = wait_for(&mut session, |_, outcomes| !outcomes.is_empty());

    assert!(matches!(outcomes[0].result, Err(EngineError::NoArtifactFound)));
    assert!(session.store().is_empty());
}

#[test]
fn test_detection_without_image_fails() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut session =
        AnnotationSession::with_adapter(EngineConfig::default(), Arc::new(GatedAdapter::default())).unwrap();
    session.set_mode(EditingMode::ClickDetect);

    session.pointer_down(Point::new(5.0, 5.0)).unwrap();
    assert!(matches!(session.pointer_up(Point::new(5.0, 5.0)), Err(EngineError::NoImage)));
    assert!(session.interaction_state().is_idle());
    assert!(matches!(session.detect_all(), Err(EngineError::NoImage)));
}

#[test]
fn test_click_detect_finds_dark_square() {
    let mut session = session_with(Arc::new(ColorRegionAdapter::default()), image_with_squares(&[(20, 20)]));

    click(&mut session, Point::new(30.0, 30.0));
    let outcomes = wait_for(&mut session, |_, outcomes| !outcomes.is_empty());

    let ids = outcomes[0].result.as_ref().unwrap();
    let area = session.store().get(ids[0]).unwrap().geometry().area();
    // Outline through the centres of the 20x20 border pixels
    assert!((area - 361.0).abs() < 0.01, "area {}", area);
}

#[test]
fn test_brush_fill_detect_finds_dark_square() {
    let mut session = session_with(Arc::new(ColorRegionAdapter::default()), image_with_squares(&[(20, 20)]));
    session.set_mode(EditingMode::BrushFillDetect);
    session.set_brush_radius(3.0).unwrap();

    session.pointer_down(Point::new(25.0, 30.0)).unwrap();
    session.pointer_move(Point::new(30.0, 30.0));
    let outcome = session.pointer_up(Point::new(35.0, 30.0)).unwrap();
    assert!(matches!(outcome, EditOutcome::DetectionSubmitted { .. }));

    let outcomes = wait_for(&mut session, |_, outcomes| !outcomes.is_empty());
    assert_eq!(outcomes[0].kind, DetectionKind::BrushFill);
    let ids = outcomes[0].result.as_ref().unwrap();
    let area = session.store().get(ids[0]).unwrap().geometry().area();
    // Outline through the centres of the 20x20 border pixels
    assert!((area - 361.0).abs() < 0.01, "area {}", area);
}

#[test]
fn test_detect_all_adds_every_region_as_one_step() {
    let mut session = session_with(
        Arc::new(ColorRegionAdapter::default()),
        image_with_squares(&[(10, 10), (60, 60)]),
    );

    session.detect_all().unwrap();
    let outcomes = wait_for(&mut session, |_, outcomes| !outcomes.is_empty());

    assert_eq!(outcomes[0].kind, DetectionKind::DetectAll);
    assert_eq!(outcomes[0].result.as_ref().unwrap().len(), 2);
    assert_eq!(session.store().len(), 2);

    session.undo().unwrap();
    assert!(session.store().is_empty());
}
