//! Roles-related HTTP API.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::repository::Key;
use crate::role::{Role, RoleDto, RoleFilter};
use crate::router::{Exists, Keys};
use crate::service::{IdentityService, OperationResult};
use crate::{AppState, ServerError};

#[derive(Debug, Serialize, Deserialize)]
pub struct ExistsQuery {
    name: String,
    exclude: Option<Key>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create).patch(update).delete(delete))
        .route("/exists", get(exists))
}

async fn list(
    State(identity): State<IdentityService>,
) -> Result<Json<Vec<Role>>, ServerError> {
    Ok(Json(identity.roles().await?))
}

async fn exists(
    State(identity): State<IdentityService>,
    Query(query): Query<ExistsQuery>,
) -> Result<Json<Exists>, ServerError> {
    let exists = identity
        .check_role_exists(&RoleFilter::Name(query.name), query.exclude)
        .await?;

    Ok(Json(Exists { exists }))
}

async fn create(
    State(identity): State<IdentityService>,
    payload: Result<Json<Vec<RoleDto>>, JsonRejection>,
) -> Result<Json<OperationResult>, ServerError> {
    let Json(body) = payload?;

    Ok(Json(identity.add_roles(body).await?))
}

async fn update(
    State(identity): State<IdentityService>,
    payload: Result<Json<Vec<RoleDto>>, JsonRejection>,
) -> Result<Json<OperationResult>, ServerError> {
    let Json(body) = payload?;

    Ok(Json(identity.edit_roles(body).await?))
}

async fn delete(
    State(identity): State<IdentityService>,
    payload: Result<Json<Keys>, JsonRejection>,
) -> Result<Json<OperationResult>, ServerError> {
    let Json(body) = payload?;

    Ok(Json(identity.delete_roles(body.ids).await?))
}
