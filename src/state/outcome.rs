use crate::artifact::ArtifactId;
use crate::error::EngineResult;
use crate::segmentation::DetectionKind;

/// What an erase stroke did to one artifact it touched.
#[derive(Debug, Clone, PartialEq)]
pub enum EraseResult {
    /// Bounds overlapped but no area was removed
    Untouched,
    /// One piece remains; the artifact keeps its id
    Reshaped,
    /// Replaced by these new artifacts, in discovery order
    Split(Vec<ArtifactId>),
    /// Nothing above the minimum area remains; the artifact was removed
    FullyErased,
}

/// Result of handing one pointer event to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    Nothing,
    Selected(Option<ArtifactId>),
    Created(ArtifactId),
    Erased(Vec<(ArtifactId, EraseResult)>),
    DetectionSubmitted { sequence: u64 },
}

impl EditOutcome {
    pub fn erase_result(&self, id: ArtifactId) -> Option<&EraseResult> {
        match self {
            EditOutcome::Erased(results) => results.iter().find(|(a, _)| *a == id).map(|(_, r)| r),
            _ => None,
        }
    }
}

/// A detection response that was applied to the store.
#[derive(Debug)]
pub struct DetectionOutcome {
    pub sequence: u64,
    pub kind: DetectionKind,
    pub result: EngineResult<Vec<ArtifactId>>,
}
