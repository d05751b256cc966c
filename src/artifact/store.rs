use egui::Color32;
use log::{debug, info};

use super::{Artifact, ArtifactId, Attributes, SplitPalette};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::geometry::{Bounds, GeometryEngine, MultiPolygon, Point, Polygon};
use crate::id_generator::{generate_artifact_id, next_creation_token};

/// Owner of every artifact in the session.
///
/// Geometry is validated before it is swapped in, so a failed operation
/// always leaves the previous state in place. Artifacts are kept ordered by
/// their creation token, which is also the drawing order (last is topmost).
#[derive(Debug)]
pub struct ArtifactStore {
    artifacts: Vec<Artifact>,
    engine: GeometryEngine,
    color_seed: u64,
    color_events: u64,
}

impl Default for ArtifactStore {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl ArtifactStore {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            artifacts: Vec::new(),
            engine: GeometryEngine::new(config),
            color_seed: config.color_seed,
            color_events: 0,
        }
    }

    pub fn engine(&self) -> &GeometryEngine {
        &self.engine
    }

    /// Validates `geometry` and stores it as a new artifact.
    pub fn add(&mut self, geometry: Polygon, attributes: Option<Attributes>) -> EngineResult<ArtifactId> {
        let artifact = self.create_artifact(geometry, attributes)?;
        let id = artifact.id();
        self.insert_artifact(artifact)?;
        Ok(id)
    }

    /// Builds a validated artifact with a fresh id and colour without
    /// storing it. The colour avoids artifacts whose bounds touch it.
    pub fn create_artifact(&mut self, geometry: Polygon, attributes: Option<Attributes>) -> EngineResult<Artifact> {
        self.engine.validate(&geometry)?;
        let avoid = self.neighbour_colors(&geometry.bounds(), None);
        let fill_color = self.next_palette().next_distinct(&avoid);
        Ok(Artifact::new(
            generate_artifact_id(),
            geometry,
            attributes.unwrap_or_default(),
            fill_color,
            next_creation_token(),
        ))
    }

    /// Builds one artifact per component of a split `source`, in component
    /// order. Each gets a new id and a colour distinct from the source, its
    /// siblings and touching neighbours; attributes are copied verbatim.
    pub fn create_split_artifacts(&mut self, source: &Artifact, parts: MultiPolygon) -> EngineResult<Vec<Artifact>> {
        for part in &parts {
            self.engine.validate(part)?;
        }
        let mut palette = self.next_palette();
        let mut taken = self.neighbour_colors(&source.geometry().bounds(), Some(source.id()));
        taken.push(source.fill_color());

        let mut created = Vec::with_capacity(parts.len());
        for part in parts {
            let fill_color = palette.next_distinct(&taken);
            taken.push(fill_color);
            created.push(Artifact::new(
                generate_artifact_id(),
                part,
                source.attributes().clone(),
                fill_color,
                next_creation_token(),
            ));
        }
        Ok(created)
    }

    /// Replaces the geometry of `id`, returning the previous geometry.
    pub fn replace(&mut self, id: ArtifactId, geometry: Polygon) -> EngineResult<Polygon> {
        self.engine.validate(&geometry)?;
        let index = self.index_of(id)?;
        let previous = self.artifacts[index].with_geometry(geometry);
        let previous = std::mem::replace(&mut self.artifacts[index], previous);
        debug!("replaced geometry of artifact {}", id);
        Ok(previous.geometry)
    }

    pub fn remove(&mut self, id: ArtifactId) -> EngineResult<Artifact> {
        let index = self.index_of(id)?;
        let removed = self.artifacts.remove(index);
        info!("🗑️ removed artifact {}", id);
        Ok(removed)
    }

    /// Removes `id` and stores `parts` as new artifacts in its place.
    /// Nothing changes if any part fails validation.
    pub fn split(&mut self, id: ArtifactId, parts: MultiPolygon) -> EngineResult<Vec<ArtifactId>> {
        let source = self.get(id)?.clone();
        let created = self.create_split_artifacts(&source, parts)?;
        self.remove(id)?;
        let ids: Vec<ArtifactId> = created.iter().map(Artifact::id).collect();
        for artifact in created {
            self.insert_artifact(artifact)?;
        }
        info!("✂️ split artifact {} into {:?}", id, ids);
        Ok(ids)
    }

    /// Puts a previously built (or removed) artifact back at its creation
    /// position.
    pub fn insert_artifact(&mut self, artifact: Artifact) -> EngineResult<()> {
        if self.contains(artifact.id()) {
            return Err(EngineError::InvariantViolation(format!(
                "artifact {} is already stored",
                artifact.id()
            )));
        }
        self.engine.validate(artifact.geometry())?;
        let index = self
            .artifacts
            .partition_point(|a| a.created_at() < artifact.created_at());
        info!("➕ stored artifact {} ({:.1} px²)", artifact.id(), artifact.geometry().area());
        self.artifacts.insert(index, artifact);
        Ok(())
    }

    /// Sets one attribute, returning its previous value.
    pub fn set_attribute(
        &mut self,
        id: ArtifactId,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> EngineResult<Option<String>> {
        let index = self.index_of(id)?;
        let mut attributes = self.artifacts[index].attributes().clone();
        let previous = attributes.insert(key, value);
        self.artifacts[index] = self.artifacts[index].with_attributes(attributes);
        Ok(previous)
    }

    pub fn remove_attribute(&mut self, id: ArtifactId, key: &str) -> EngineResult<Option<String>> {
        let index = self.index_of(id)?;
        let mut attributes = self.artifacts[index].attributes().clone();
        let previous = attributes.remove(key);
        self.artifacts[index] = self.artifacts[index].with_attributes(attributes);
        Ok(previous)
    }

    pub fn get(&self, id: ArtifactId) -> EngineResult<&Artifact> {
        self.artifacts
            .iter()
            .find(|a| a.id() == id)
            .ok_or(EngineError::NotFound(id))
    }

    pub fn contains(&self, id: ArtifactId) -> bool {
        self.artifacts.iter().any(|a| a.id() == id)
    }

    /// Every artifact, oldest first.
    pub fn all(&self) -> &[Artifact] {
        &self.artifacts
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Topmost artifact under `point`; the most recently created wins.
    pub fn artifact_at(&self, point: Point) -> Option<ArtifactId> {
        self.artifacts
            .iter()
            .rev()
            .find(|a| a.geometry().bounds().contains(point) && a.geometry().contains(point))
            .map(Artifact::id)
    }

    /// Ids of artifacts whose bounds intersect `bounds`, oldest first.
    pub fn artifacts_touching(&self, bounds: &Bounds) -> Vec<ArtifactId> {
        self.artifacts
            .iter()
            .filter(|a| a.geometry().bounds().intersects(bounds))
            .map(Artifact::id)
            .collect()
    }

    fn index_of(&self, id: ArtifactId) -> EngineResult<usize> {
        self.artifacts
            .iter()
            .position(|a| a.id() == id)
            .ok_or(EngineError::NotFound(id))
    }

    fn neighbour_colors(&self, bounds: &Bounds, exclude: Option<ArtifactId>) -> Vec<Color32> {
        self.artifacts
            .iter()
            .filter(|a| Some(a.id()) != exclude && a.geometry().bounds().intersects(bounds))
            .map(Artifact::fill_color)
            .collect()
    }

    fn next_palette(&mut self) -> SplitPalette {
        self.color_events += 1;
        SplitPalette::for_event(self.color_seed, self.color_events)
    }
}
