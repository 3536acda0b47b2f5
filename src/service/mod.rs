//! Identity service: maps DTOs onto users, user extends and roles.
//!
//! Each bulk operation runs inside one unit of work. Items are checked and
//! written one after another; the first failing item aborts the call and
//! nothing is committed.

mod role;
mod user;

use std::sync::Arc;

use axum::extract::FromRef;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::repository::{Key, Store};

/// Kind of an [`OperationResult`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationResultType {
    Success,
    NoChanged,
}

/// Aggregated outcome of a bulk operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    pub result_type: OperationResultType,
    pub message: String,
    /// Number of items written.
    pub affected: usize,
}

impl OperationResult {
    pub fn success(affected: usize, message: impl Into<String>) -> Self {
        Self {
            result_type: OperationResultType::Success,
            message: message.into(),
            affected,
        }
    }

    pub fn no_changed() -> Self {
        Self {
            result_type: OperationResultType::NoChanged,
            message: "Nothing has been changed.".to_owned(),
            affected: 0,
        }
    }

    /// Whether something has been written.
    pub fn succeeded(&self) -> bool {
        self.result_type == OperationResultType::Success
    }
}

/// Service for users and roles.
#[derive(Clone)]
pub struct IdentityService {
    store: Arc<dyn Store>,
}

impl IdentityService {
    /// Create a new [`IdentityService`].
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

impl FromRef<AppState> for IdentityService {
    fn from_ref(state: &AppState) -> IdentityService {
        state.identity.clone()
    }
}

/// `0` stands for "no entity" when excluding a key.
fn excluded(exclude: Option<Key>) -> Option<Key> {
    exclude.filter(|key| *key != 0)
}

/// Sort keys and drop duplicates.
fn distinct(mut keys: Vec<Key>) -> Vec<Key> {
    keys.sort_unstable();
    keys.dedup();
    keys
}
