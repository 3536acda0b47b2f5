//! Update users.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;

use crate::ServerError;
use crate::service::{IdentityService, OperationResult};
use crate::user::UserDto;

pub async fn handler(
    State(identity): State<IdentityService>,
    payload: Result<Json<Vec<UserDto>>, JsonRejection>,
) -> Result<Json<OperationResult>, ServerError> {
    let Json(body) = payload?;

    Ok(Json(identity.edit_users(body).await?))
}
