use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

use crate::artifact::ArtifactId;

// Single static counter for creation order across all stores
static NEXT_CREATION_TOKEN: AtomicU64 = AtomicU64::new(1);

pub fn generate_artifact_id() -> ArtifactId {
    ArtifactId::from_uuid(Uuid::new_v4())
}

/// Monotonic token recording when an artifact was created
pub fn next_creation_token() -> u64 {
    NEXT_CREATION_TOKEN.fetch_add(1, Ordering::SeqCst)
}
