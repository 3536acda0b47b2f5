//! Delete users along with their extend records.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;

use crate::ServerError;
use crate::router::Keys;
use crate::service::{IdentityService, OperationResult};

pub async fn handler(
    State(identity): State<IdentityService>,
    payload: Result<Json<Keys>, JsonRejection>,
) -> Result<Json<OperationResult>, ServerError> {
    let Json(body) = payload?;

    Ok(Json(identity.delete_users(body.ids).await?))
}
