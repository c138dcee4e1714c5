//! Principal and session fixtures.

use std::sync::Arc;

use tollgate_session::{KeyValueStore, MemoryStore, Principal, SessionContext};

/// Principal with the given role and stable placeholder fields.
#[must_use]
pub fn principal(role: &str) -> Principal {
    Principal {
        id: "8d4c2a1e-0b7f-4c3e-9a55-2f6b1d0c9e71".to_string(),
        username: format!("{}-user", role.to_ascii_lowercase()),
        email: "ops@example.test".to_string(),
        role: role.to_string(),
        created_at: "2024-05-01T12:00:00Z".to_string(),
    }
}

/// Fresh in-memory storage paired with a context built over it.
#[must_use]
pub fn memory_context() -> (Arc<dyn KeyValueStore>, SessionContext) {
    let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let context = SessionContext::new(Arc::clone(&storage));
    (storage, context)
}
