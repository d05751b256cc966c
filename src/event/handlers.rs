use std::sync::Arc;

use parking_lot::Mutex;

use crate::event::{EventHandler, SessionEvent};

/// Collects every event into a shared list that the owner can drain.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<SessionEvent>>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handler half to subscribe; shares storage with `self`
    pub fn handler(&self) -> Box<dyn EventHandler> {
        Box::new(self.clone())
    }

    pub fn take(&self) -> Vec<SessionEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventHandler for EventRecorder {
    fn handle_event(&mut self, event: &SessionEvent) {
        self.events.lock().push(event.clone());
    }
}
