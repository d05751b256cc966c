//! Editing modes and the per-interaction state machine.
//!
//! ```text
//!  ┌──────┐ pointer down ┌──────────────────┐ pointer up ┌────────────┐
//!  │ Idle ├─────────────►│ StrokeInProgress ├───────────►│ Committing │
//!  └──▲───┘              └────────┬─────────┘            └─────┬──────┘
//!     │        cancel / mode change│                            │
//!     └────────────────────────────┴────────────────────────────┘
//! ```
//!
//! Only one stroke can be in flight at a time, which is what keeps two
//! geometry operations from ever touching the same artifact at once.

use serde::{Deserialize, Serialize};

/// Which pipeline a stroke feeds into. Driven by the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EditingMode {
    /// Pointer picks artifacts
    #[default]
    Select,
    ClickDetect,
    BrushFillDetect,
    FreehandDraw,
    Erase,
}

impl EditingMode {
    pub fn name(&self) -> &'static str {
        match self {
            EditingMode::Select => "Select",
            EditingMode::ClickDetect => "ClickDetect",
            EditingMode::BrushFillDetect => "BrushFillDetect",
            EditingMode::FreehandDraw => "FreehandDraw",
            EditingMode::Erase => "Erase",
        }
    }

    /// Whether strokes in this mode are swept with the brush radius
    pub fn uses_brush(&self) -> bool {
        matches!(self, EditingMode::BrushFillDetect | EditingMode::Erase)
    }

    /// Whether pointer input in this mode builds a stroke at all
    pub fn records_strokes(&self) -> bool {
        !matches!(self, EditingMode::Select)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InteractionState {
    #[default]
    Idle,
    StrokeInProgress { mode: EditingMode },
    Committing { mode: EditingMode },
}

impl InteractionState {
    /// Validates whether a transition to the new state is allowed
    pub fn can_transition_to(&self, new_state: &InteractionState) -> bool {
        match (self, new_state) {
            (InteractionState::Idle, InteractionState::StrokeInProgress { .. }) => true,

            // Finish or cancel
            (InteractionState::StrokeInProgress { mode: a }, InteractionState::Committing { mode: b }) => a == b,
            (InteractionState::StrokeInProgress { .. }, InteractionState::Idle) => true,

            (InteractionState::Committing { .. }, InteractionState::Idle) => true,

            _ => false,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            InteractionState::Idle => "Idle",
            InteractionState::StrokeInProgress { .. } => "StrokeInProgress",
            InteractionState::Committing { .. } => "Committing",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, InteractionState::Idle)
    }

    pub fn is_stroke_in_progress(&self) -> bool {
        matches!(self, InteractionState::StrokeInProgress { .. })
    }

    pub fn is_committing(&self) -> bool {
        matches!(self, InteractionState::Committing { .. })
    }
}
