//! HTTP API over [`IdentityService`](crate::service::IdentityService).
pub mod roles;
pub mod status;
pub mod users;

use serde::{Deserialize, Serialize};

use crate::repository::Key;

/// Answer of `exists` routes.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Exists {
    pub exists: bool,
}

/// Body of bulk deletions.
#[derive(Debug, Serialize, Deserialize)]
pub struct Keys {
    pub ids: Vec<Key>,
}

/// In-memory state for handler tests.
#[cfg(test)]
pub(crate) fn state() -> crate::AppState {
    use std::sync::Arc;

    crate::AppState {
        config: Arc::new(crate::config::Configuration::default()),
        identity: crate::service::IdentityService::new(Arc::new(
            crate::repository::MemoryStore::new(),
        )),
        metrics: None,
    }
}
