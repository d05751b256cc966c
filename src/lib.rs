#![warn(clippy::all, rust_2018_idioms)]

//! Interactive polygon annotation engine: turns pointer strokes and
//! segmentation output into validated artifact polygons, edits them with
//! boolean operations and places their labels for the current viewport.

pub mod artifact;
pub mod brush;
pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod geometry;
pub mod id_generator;
pub mod label;
pub mod segmentation;
pub mod state;
pub mod stroke;
pub mod util;

pub use artifact::{Artifact, ArtifactId, ArtifactStore, Attributes};
pub use brush::BrushRasterizer;
pub use command::{Command, CommandHistory};
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use event::{EventBus, EventRecorder, SessionEvent};
pub use geometry::{Bounds, GeometryEngine, MultiPolygon, Point, Polygon, Ring};
pub use label::{LabelPlacement, LabelPlacementEngine, ViewportState};
pub use segmentation::{ImageRegion, Prompt, SegmentationAdapter};
pub use state::{AnnotationSession, EditOutcome, EditingMode, EraseResult};
pub use stroke::{Stroke, StrokeBuilder, StrokeSmoother};
