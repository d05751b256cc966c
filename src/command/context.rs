use crate::artifact::ArtifactStore;
use crate::event::EventBus;

/// What a command may touch while executing: the store it mutates and the
/// bus it reports changes on.
#[derive(Debug)]
pub struct CommandContext<'a> {
    pub store: &'a mut ArtifactStore,
    pub event_bus: &'a EventBus,
}

impl<'a> CommandContext<'a> {
    pub fn new(store: &'a mut ArtifactStore, event_bus: &'a EventBus) -> Self {
        Self { store, event_bus }
    }
}
