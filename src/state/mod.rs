mod context;
mod editor_state;
mod outcome;

pub use context::AnnotationSession;
pub use editor_state::{EditingMode, InteractionState};
pub use outcome::{DetectionOutcome, EditOutcome, EraseResult};
