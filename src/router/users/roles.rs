//! Replace the roles of a user.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};

use crate::ServerError;
use crate::repository::Key;
use crate::service::{IdentityService, OperationResult};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Body {
    role_ids: Vec<Key>,
}

pub async fn handler(
    State(identity): State<IdentityService>,
    Path(user_id): Path<Key>,
    payload: Result<Json<Body>, JsonRejection>,
) -> Result<Json<OperationResult>, ServerError> {
    let Json(body) = payload?;

    Ok(Json(identity.set_user_roles(user_id, body.role_ids).await?))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::role::RoleDto;
    use crate::user::UserDto;
    use crate::*;

    #[tokio::test]
    async fn test_roles_handler() {
        let state = router::state();
        state
            .identity
            .add_users(vec![UserDto::new("admin", None)])
            .await
            .unwrap();
        state
            .identity
            .add_roles(vec![RoleDto::new("administrator"), RoleDto::new("editor")])
            .await
            .unwrap();
        let app = app(state.clone());

        let body = json!({ "roleIds": [2, 1, 2] });
        let response = make_request(
            app.clone(),
            Method::PUT,
            "/users/1/roles",
            body.to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.identity.user(1).await.unwrap().roles.len(), 2);

        let body = json!({ "roleIds": [3] });
        let response = make_request(
            app.clone(),
            Method::PUT,
            "/users/1/roles",
            body.to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(state.identity.user(1).await.unwrap().roles.len(), 2);

        let body = json!({ "roleIds": [] });
        let response =
            make_request(app, Method::PUT, "/users/1/roles", body.to_string())
                .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(state.identity.user(1).await.unwrap().roles.is_empty());
    }
}
