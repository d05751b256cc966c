//! The annotation session: routes pointer input through the editing
//! pipelines and owns everything they mutate.
//!
//! All store mutations go through [`Command`]s on the session's history, so
//! every user-visible change is a single undo step and is announced on the
//! event bus.

use std::sync::Arc;

use image::RgbImage;
use log::{debug, info};

use super::{DetectionOutcome, EditOutcome, EditingMode, EraseResult, InteractionState};
use crate::artifact::{Artifact, ArtifactId, ArtifactStore, Attributes};
use crate::brush::BrushRasterizer;
use crate::command::{Command, CommandContext, CommandHistory, CommandResult};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::event::{EventBus, SessionEvent};
use crate::geometry::raster::polygon_to_mask;
use crate::geometry::{Bounds, Point, Polygon, Ring};
use crate::label::{LabelPlacement, LabelPlacementEngine, ViewportState};
use crate::segmentation::{DetectionDispatcher, DetectionKind, ImageRegion, Prompt, SegmentationAdapter};
use crate::stroke::{Stroke, StrokeBuilder, StrokeSmoother};

#[derive(Debug)]
pub struct AnnotationSession {
    config: EngineConfig,
    smoother: StrokeSmoother,
    rasterizer: BrushRasterizer,
    labels: LabelPlacementEngine,
    store: ArtifactStore,
    history: CommandHistory,
    event_bus: EventBus,
    mode: EditingMode,
    state: InteractionState,
    stroke: Option<StrokeBuilder>,
    brush_radius: f64,
    image: Option<Arc<RgbImage>>,
    detector: Option<DetectionDispatcher>,
    selected: Option<ArtifactId>,
}

impl AnnotationSession {
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            smoother: StrokeSmoother::new(config.smoothing_window),
            rasterizer: BrushRasterizer::new(&config),
            labels: LabelPlacementEngine::new(&config),
            store: ArtifactStore::new(&config),
            history: CommandHistory::new(),
            event_bus: EventBus::new(),
            mode: EditingMode::default(),
            state: InteractionState::Idle,
            stroke: None,
            brush_radius: config.default_brush_radius,
            image: None,
            detector: None,
            selected: None,
            config,
        })
    }

    pub fn with_adapter(config: EngineConfig, adapter: Arc<dyn SegmentationAdapter>) -> EngineResult<Self> {
        let mut session = Self::new(config)?;
        session.set_adapter(adapter);
        Ok(session)
    }

    /// Replaces the segmentation backend. Requests still in flight on the
    /// old backend are dropped with it.
    pub fn set_adapter(&mut self, adapter: Arc<dyn SegmentationAdapter>) {
        self.detector = Some(DetectionDispatcher::new(adapter));
    }

    pub fn set_image(&mut self, image: Arc<RgbImage>) {
        info!("🖼️ image set ({}x{})", image.width(), image.height());
        self.image = Some(image);
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    pub fn events(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn mode(&self) -> EditingMode {
        self.mode
    }

    pub fn interaction_state(&self) -> InteractionState {
        self.state
    }

    pub fn brush_radius(&self) -> f64 {
        self.brush_radius
    }

    pub fn selected(&self) -> Option<ArtifactId> {
        self.selected
    }

    /// Switches pipelines. A stroke in progress is cancelled.
    pub fn set_mode(&mut self, mode: EditingMode) {
        if mode == self.mode {
            return;
        }
        self.cancel_stroke();
        let old = self.mode;
        self.mode = mode;
        info!("🔀 mode {} -> {}", old.name(), mode.name());
        self.event_bus.emit(SessionEvent::ModeChanged { old, new: mode });
    }

    pub fn set_brush_radius(&mut self, radius: f64) -> EngineResult<()> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(EngineError::InvalidBrushRadius(radius));
        }
        self.brush_radius = radius;
        Ok(())
    }

    /// Drops the stroke being recorded, if any.
    pub fn cancel_stroke(&mut self) {
        if self.stroke.take().is_some() {
            debug!("stroke cancelled");
        }
        if self.state.is_stroke_in_progress() {
            self.state = InteractionState::Idle;
        }
    }

    pub fn pointer_down(&mut self, pos: Point) -> EngineResult<EditOutcome> {
        if !self.mode.records_strokes() {
            self.selected = self.store.artifact_at(pos);
            return Ok(EditOutcome::Selected(self.selected));
        }
        self.transition_to(InteractionState::StrokeInProgress { mode: self.mode })?;
        let mut builder = if self.mode.uses_brush() {
            StrokeBuilder::new(self.brush_radius, 0.0)
        } else {
            StrokeBuilder::new(0.0, self.config.min_point_spacing)
        };
        builder.add_point(pos);
        self.stroke = Some(builder);
        Ok(EditOutcome::Nothing)
    }

    /// Returns whether the sample was kept.
    pub fn pointer_move(&mut self, pos: Point) -> bool {
        match &mut self.stroke {
            Some(builder) if self.state.is_stroke_in_progress() => builder.add_point(pos),
            _ => false,
        }
    }

    /// Ends the stroke and commits it through the current mode's pipeline.
    /// The session is idle again afterwards, whether or not the commit
    /// succeeded.
    pub fn pointer_up(&mut self, pos: Point) -> EngineResult<EditOutcome> {
        let Some(mut builder) = self.stroke.take() else {
            return Ok(EditOutcome::Nothing);
        };
        builder.add_point(pos);
        let mode = self.mode;
        self.transition_to(InteractionState::Committing { mode })?;
        let result = self.commit_stroke(mode, builder.finish());
        self.transition_to(InteractionState::Idle)?;
        result
    }

    /// Runs a finished stroke through the pipeline for `mode`.
    pub fn commit_stroke(&mut self, mode: EditingMode, stroke: Stroke) -> EngineResult<EditOutcome> {
        if stroke.is_empty() {
            return Err(EngineError::EmptyStroke);
        }
        match mode {
            EditingMode::Select => Ok(EditOutcome::Nothing),
            EditingMode::FreehandDraw => {
                let id = self.add_freehand(&stroke.points())?;
                Ok(EditOutcome::Created(id))
            }
            EditingMode::Erase => {
                let smoothed = self.smoother.smooth(&stroke.points());
                let cut = self.rasterizer.rasterize(&smoothed, stroke.brush_radius())?;
                Ok(EditOutcome::Erased(self.erase(&cut)?))
            }
            EditingMode::ClickDetect => {
                let click = stroke.samples()[0].pos;
                let sequence = self.submit_detection(Some(Prompt::Point(click)), DetectionKind::Click)?;
                Ok(EditOutcome::DetectionSubmitted { sequence })
            }
            EditingMode::BrushFillDetect => {
                let image = self.image.clone().ok_or(EngineError::NoImage)?;
                let smoothed = self.smoother.smooth(&stroke.points());
                let painted = self.rasterizer.rasterize(&smoothed, stroke.brush_radius())?;
                let mask = polygon_to_mask(&painted, Point::default(), image.width(), image.height());
                let sequence = self.submit_detection(Some(Prompt::Mask(mask)), DetectionKind::BrushFill)?;
                Ok(EditOutcome::DetectionSubmitted { sequence })
            }
        }
    }

    /// Smooths a free-hand outline, repairs it and stores it.
    pub fn add_freehand(&mut self, points: &[Point]) -> EngineResult<ArtifactId> {
        if points.len() < 3 {
            return Err(EngineError::UnrepairableGeometry {
                distinct_vertices: points.len(),
            });
        }
        let smoothed = self.smoother.smooth(points);
        let polygon = self.store.engine().repair(&Polygon::from_points(smoothed))?;
        self.add_artifact(polygon, None)
    }

    /// Stores already valid geometry as a new artifact.
    pub fn add_artifact(&mut self, geometry: Polygon, attributes: Option<Attributes>) -> EngineResult<ArtifactId> {
        let artifact = self.store.create_artifact(geometry, attributes)?;
        let id = artifact.id();
        self.apply(Command::AddArtifact(artifact))?;
        info!("🖌️ created artifact {}", id);
        Ok(id)
    }

    /// Subtracts `cut` from every artifact it overlaps, as one undo step.
    pub fn erase(&mut self, cut: &Polygon) -> EngineResult<Vec<(ArtifactId, EraseResult)>> {
        let engine = self.store.engine().clone();
        let cut_bounds = cut.bounds();
        let targets: Vec<Artifact> = self
            .store
            .all()
            .iter()
            .filter(|a| a.geometry().bounds().intersects(&cut_bounds))
            .cloned()
            .collect();

        let mut results = Vec::with_capacity(targets.len());
        let mut steps = Vec::new();
        let mut splits = Vec::new();
        for artifact in targets {
            let id = artifact.id();
            let overlap: f64 = engine
                .intersection(artifact.geometry(), cut)
                .iter()
                .map(Polygon::area)
                .sum();
            if overlap <= f64::EPSILON {
                results.push((id, EraseResult::Untouched));
                continue;
            }

            let mut parts = engine.subtract(artifact.geometry(), cut);
            match parts.len() {
                0 => {
                    steps.push(Command::DeleteArtifact(artifact));
                    results.push((id, EraseResult::FullyErased));
                }
                1 => {
                    let new = parts.remove(0);
                    steps.push(Command::ModifyGeometry {
                        id,
                        old: artifact.geometry().clone(),
                        new,
                    });
                    results.push((id, EraseResult::Reshaped));
                }
                _ => {
                    let created = self.store.create_split_artifacts(&artifact, parts)?;
                    let ids: Vec<ArtifactId> = created.iter().map(Artifact::id).collect();
                    steps.push(Command::ReplaceArtifacts {
                        removed: vec![artifact],
                        added: created,
                    });
                    splits.push((id, ids.clone()));
                    results.push((id, EraseResult::Split(ids)));
                }
            }
        }

        if !steps.is_empty() {
            self.apply(Command::Batch(steps))?;
        }
        for (source, parts) in splits {
            info!("✂️ erase split {} into {} artifact(s)", source, parts.len());
            self.event_bus.emit(SessionEvent::ArtifactSplit { source, parts });
        }
        for (id, result) in &results {
            if *result == EraseResult::FullyErased {
                info!("🧽 artifact {} fully erased", id);
            }
        }
        self.drop_stale_selection();
        Ok(results)
    }

    pub fn delete_artifact(&mut self, id: ArtifactId) -> EngineResult<()> {
        let artifact = self.store.get(id)?.clone();
        self.apply(Command::DeleteArtifact(artifact))?;
        self.drop_stale_selection();
        Ok(())
    }

    pub fn set_attribute(&mut self, id: ArtifactId, key: &str, value: &str) -> EngineResult<()> {
        let old = self.store.get(id)?.attributes().get(key).map(String::from);
        self.apply(Command::ModifyAttribute {
            id,
            key: key.to_string(),
            old,
            new: Some(value.to_string()),
        })
    }

    pub fn remove_attribute(&mut self, id: ArtifactId, key: &str) -> EngineResult<()> {
        let old = self.store.get(id)?.attributes().get(key).map(String::from);
        if old.is_none() {
            return Ok(());
        }
        self.apply(Command::ModifyAttribute {
            id,
            key: key.to_string(),
            old,
            new: None,
        })
    }

    /// Translates outer-ring vertices of `id` by `delta`.
    pub fn move_vertices(&mut self, id: ArtifactId, indices: &[usize], delta: Point) -> EngineResult<()> {
        let old = self.store.get(id)?.geometry().clone();
        let mut points = old.outer().points().to_vec();
        for &index in indices {
            let point = points.get_mut(index).ok_or_else(|| vertex_out_of_range(id, index))?;
            *point = *point + delta;
        }
        self.modify_outer(id, old, points)
    }

    /// Splits outer-ring segment `segment` (from vertex `segment` to the next)
    /// at its midpoint. Returns the index of the new vertex.
    pub fn insert_vertex(&mut self, id: ArtifactId, segment: usize) -> EngineResult<usize> {
        let old = self.store.get(id)?.geometry().clone();
        let mut points = old.outer().points().to_vec();
        let n = points.len();
        if segment >= n {
            return Err(vertex_out_of_range(id, segment));
        }
        let midpoint = points[segment].lerp(points[(segment + 1) % n], 0.5);
        points.insert(segment + 1, midpoint);
        self.modify_outer(id, old, points)?;
        Ok(segment + 1)
    }

    /// Removes outer-ring vertices. Refuses to leave fewer vertices than a
    /// valid ring needs.
    pub fn delete_vertices(&mut self, id: ArtifactId, indices: &[usize]) -> EngineResult<()> {
        let old = self.store.get(id)?.geometry().clone();
        let points = old.outer().points();
        let mut doomed: Vec<usize> = indices.to_vec();
        doomed.sort_unstable();
        doomed.dedup();
        if let Some(&index) = doomed.iter().find(|&&i| i >= points.len()) {
            return Err(vertex_out_of_range(id, index));
        }
        let remaining = points.len() - doomed.len();
        if remaining < self.config.min_distinct_vertices {
            return Err(EngineError::UnrepairableGeometry {
                distinct_vertices: remaining,
            });
        }
        let kept = points
            .iter()
            .enumerate()
            .filter(|(i, _)| doomed.binary_search(i).is_err())
            .map(|(_, p)| *p)
            .collect();
        self.modify_outer(id, old, kept)
    }

    /// Outer-ring vertex of `id` nearest to `point`, if closer than
    /// `tolerance`.
    pub fn vertex_at(&self, id: ArtifactId, point: Point, tolerance: f64) -> EngineResult<Option<usize>> {
        Ok(self.store.get(id)?.geometry().outer().vertex_near(point, tolerance))
    }

    /// Outer-ring segment of `id` nearest to `point`, if closer than
    /// `tolerance`. Segment `i` runs from vertex `i` to the next one.
    pub fn segment_at(&self, id: ArtifactId, point: Point, tolerance: f64) -> EngineResult<Option<usize>> {
        Ok(self.store.get(id)?.geometry().outer().edge_near(point, tolerance))
    }

    /// Rubber-band selection of outer-ring vertices.
    pub fn vertices_in(&self, id: ArtifactId, bounds: &Bounds) -> EngineResult<Vec<usize>> {
        Ok(self.store.get(id)?.geometry().outer().vertices_in(bounds))
    }

    /// Starts a whole-image detection. Returns its sequence number.
    pub fn detect_all(&mut self) -> EngineResult<u64> {
        self.submit_detection(None, DetectionKind::DetectAll)
    }

    pub fn detection_pending(&self) -> bool {
        self.detector.as_ref().is_some_and(DetectionDispatcher::is_pending)
    }

    pub fn detection_progress(&self) -> Option<u8> {
        self.detector.as_ref().and_then(DetectionDispatcher::progress)
    }

    /// Applies whatever detection results have arrived. Superseded results
    /// are dropped and announced as discarded.
    pub fn poll_detections(&mut self) -> Vec<DetectionOutcome> {
        let Some(detector) = self.detector.as_mut() else {
            return Vec::new();
        };
        let poll = detector.poll();
        for sequence in poll.discarded {
            self.event_bus.emit(SessionEvent::DetectionDiscarded { sequence });
        }

        let mut outcomes = Vec::with_capacity(poll.accepted.len());
        for response in poll.accepted {
            let result = self.apply_detection(response.kind, response.result);
            match &result {
                Ok(artifacts) => {
                    info!("🎯 detection #{} added {} artifact(s)", response.sequence, artifacts.len());
                    self.event_bus.emit(SessionEvent::DetectionApplied {
                        sequence: response.sequence,
                        artifacts: artifacts.clone(),
                    });
                }
                Err(e) => info!("detection #{} produced nothing: {}", response.sequence, e),
            }
            outcomes.push(DetectionOutcome {
                sequence: response.sequence,
                kind: response.kind,
                result,
            });
        }
        outcomes
    }

    pub fn undo(&mut self) -> EngineResult<bool> {
        self.cancel_stroke();
        let mut ctx = CommandContext::new(&mut self.store, &self.event_bus);
        let undone = self.history.undo(&mut ctx)?;
        self.drop_stale_selection();
        Ok(undone)
    }

    pub fn redo(&mut self) -> EngineResult<bool> {
        self.cancel_stroke();
        let mut ctx = CommandContext::new(&mut self.store, &self.event_bus);
        let redone = self.history.redo(&mut ctx)?;
        self.drop_stale_selection();
        Ok(redone)
    }

    /// Label placements for every artifact in the given viewport.
    pub fn labels(&self, viewport: &ViewportState) -> Vec<LabelPlacement> {
        self.labels.place_labels(self.store.all(), viewport)
    }

    fn submit_detection(&mut self, prompt: Option<Prompt>, kind: DetectionKind) -> EngineResult<u64> {
        let image = self.image.clone().ok_or(EngineError::NoImage)?;
        let detector = self
            .detector
            .as_mut()
            .ok_or_else(|| EngineError::Segmentation("no segmentation adapter configured".to_string()))?;
        Ok(detector.submit(ImageRegion::whole(image), prompt, kind))
    }

    fn apply_detection(
        &mut self,
        kind: DetectionKind,
        result: EngineResult<Vec<Polygon>>,
    ) -> EngineResult<Vec<ArtifactId>> {
        let candidates = result?;
        match kind {
            DetectionKind::Click | DetectionKind::BrushFill => {
                let best = candidates.into_iter().next().ok_or(EngineError::NoArtifactFound)?;
                let polygon = self.store.engine().repair(&best)?;
                Ok(vec![self.add_artifact(polygon, None)?])
            }
            DetectionKind::DetectAll => {
                let mut created = Vec::new();
                for candidate in candidates {
                    let artifact = self
                        .store
                        .engine()
                        .repair(&candidate)
                        .and_then(|polygon| self.store.create_artifact(polygon, None));
                    match artifact {
                        Ok(artifact) => created.push(artifact),
                        Err(e) => debug!("skipping detected candidate: {}", e),
                    }
                }
                if created.is_empty() {
                    return Err(EngineError::NoArtifactFound);
                }
                let ids = created.iter().map(Artifact::id).collect();
                self.apply(Command::Batch(created.into_iter().map(Command::AddArtifact).collect()))?;
                Ok(ids)
            }
        }
    }

    fn modify_outer(&mut self, id: ArtifactId, old: Polygon, points: Vec<Point>) -> EngineResult<()> {
        let new = Polygon::new(Ring::new(points), old.holes().to_vec());
        self.store.engine().validate(&new)?;
        self.apply(Command::ModifyGeometry { id, old, new })
    }

    fn apply(&mut self, command: Command) -> CommandResult {
        let mut ctx = CommandContext::new(&mut self.store, &self.event_bus);
        self.history.execute(command, &mut ctx)
    }

    fn transition_to(&mut self, new_state: InteractionState) -> EngineResult<()> {
        if !self.state.can_transition_to(&new_state) {
            return Err(EngineError::InvalidTransition {
                from: self.state.name(),
                to: new_state.name(),
            });
        }
        self.state = new_state;
        Ok(())
    }

    fn drop_stale_selection(&mut self) {
        if self.selected.is_some_and(|id| !self.store.contains(id)) {
            self.selected = None;
        }
    }
}

fn vertex_out_of_range(id: ArtifactId, index: usize) -> EngineError {
    EngineError::InvariantViolation(format!("artifact {} has no vertex {}", id, index))
}
