use crate::artifact::ArtifactId;
use crate::state::EditingMode;

/// Notifications for the UI layer, emitted after the store has changed.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    ArtifactAdded(ArtifactId),
    ArtifactRemoved(ArtifactId),
    /// Geometry of an existing artifact changed in place
    ArtifactReplaced(ArtifactId),
    AttributesChanged(ArtifactId),
    /// An erase cut `source` into independent artifacts
    ArtifactSplit {
        source: ArtifactId,
        parts: Vec<ArtifactId>,
    },
    ModeChanged {
        old: EditingMode,
        new: EditingMode,
    },
    DetectionApplied {
        sequence: u64,
        artifacts: Vec<ArtifactId>,
    },
    DetectionDiscarded {
        sequence: u64,
    },
}
