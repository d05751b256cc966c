use thiserror::Error;

use crate::artifact::ArtifactId;

/// Errors reported by the annotation engine.
///
/// None of these are fatal: the engine reports them and leaves the
/// `ArtifactStore` in its last valid state. `InvariantViolation` is the only
/// variant that indicates a programming error rather than bad input.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("stroke has no points")]
    EmptyStroke,

    #[error("brush radius must be positive and finite, got {0}")]
    InvalidBrushRadius(f64),

    #[error("geometry cannot be repaired ({distinct_vertices} distinct vertices)")]
    UnrepairableGeometry { distinct_vertices: usize },

    #[error("invalid polygon: {0}")]
    InvalidGeometry(String),

    #[error("polygon area {area:.2} is below the minimum of {minimum:.2}")]
    BelowMinimumArea { area: f64, minimum: f64 },

    #[error("segmentation returned no candidates")]
    NoArtifactFound,

    #[error("artifact {0} not found")]
    NotFound(ArtifactId),

    #[error("no image loaded")]
    NoImage,

    #[error("detection request {sequence} was superseded")]
    Superseded { sequence: u64 },

    #[error("segmentation failed: {0}")]
    Segmentation(String),

    #[error("cannot transition from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    #[error("internal invariant violated: {0}")]
    InvariantViolation(String),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("invalid configuration value: {0}")]
    ConfigValue(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
