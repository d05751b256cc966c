mod palette;
mod store;

pub use palette::SplitPalette;
pub use store::ArtifactStore;

use std::fmt;

use egui::Color32;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::Polygon;

/// Stable identifier of an artifact for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactId(Uuid);

impl ArtifactId {
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Insertion-ordered string attributes, so tables render rows in a stable order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Attributes {
    entries: Vec<(String, String)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key`, keeping its original position if it already exists.
    /// Returns the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attributes = Attributes::new();
        for (k, v) in iter {
            attributes.insert(k, v);
        }
        attributes
    }
}

/// A traced object boundary with its attributes and style.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    id: ArtifactId,
    geometry: Polygon,
    attributes: Attributes,
    fill_color: Color32,
    created_at: u64,
}

impl Artifact {
    pub(crate) fn new(
        id: ArtifactId,
        geometry: Polygon,
        attributes: Attributes,
        fill_color: Color32,
        created_at: u64,
    ) -> Self {
        Self {
            id,
            geometry,
            attributes,
            fill_color,
            created_at,
        }
    }

    pub fn id(&self) -> ArtifactId {
        self.id
    }

    pub fn geometry(&self) -> &Polygon {
        &self.geometry
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn fill_color(&self) -> Color32 {
        self.fill_color
    }

    /// Ordering token; larger means created later
    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    pub(crate) fn with_geometry(&self, geometry: Polygon) -> Self {
        Self {
            geometry,
            ..self.clone()
        }
    }

    pub(crate) fn with_attributes(&self, attributes: Attributes) -> Self {
        Self {
            attributes,
            ..self.clone()
        }
    }
}
