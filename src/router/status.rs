//! Public instance status and Prometheus scrape endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::config::Configuration;

/// Structured configuration.
#[derive(Debug, Serialize, Deserialize)]
pub struct Status {
    version: String,
    name: String,
    url: String,
}

/// Public server status (configuration).
pub async fn status(State(config): State<Arc<Configuration>>) -> Json<Status> {
    Json(Status {
        version: config.version().to_owned(),
        name: config.name.clone(),
        url: config.url.clone(),
    })
}

/// Render Prometheus metrics, if the recorder is installed.
pub async fn metrics(
    State(state): State<AppState>,
) -> Result<String, StatusCode> {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .ok_or(StatusCode::NOT_FOUND)
}
