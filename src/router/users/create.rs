//! Add users.

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

    Ok(Json(identity.add_users(body).await?))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use http_body_util::BodyExt;
    use serde_json::json;

    use super::*;
    use crate::service::OperationResultType;
    use crate::*;

    #[tokio::test]
    async fn test_create_handler() {
        let state = router::state();
        let app = app(state.clone());

        let body = json!([
            { "name": "admin", "registeredIp": "127.0.0.1" },
            { "name": "guest" },
        ]);
        let response =
            make_request(app.clone(), Method::POST, "/users", body.to_string())
                .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: OperationResult = serde_json::from_slice(&body).unwrap();
        assert_eq!(body.result_type, OperationResultType::Success);
        assert_eq!(body.affected, 2);
        assert_eq!(state.identity.users().await.unwrap().len(), 2);

        // Same name again.
        let body = json!([{ "name": "admin" }]);
        let response =
            make_request(app.clone(), Method::POST, "/users", body.to_string())
                .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        // Empty batch.
        let response =
            make_request(app.clone(), Method::POST, "/users", "[]".to_owned())
                .await;
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: OperationResult = serde_json::from_slice(&body).unwrap();
        assert_eq!(body.result_type, OperationResultType::NoChanged);
    }

    #[tokio::test]
    async fn test_create_handler_invalid_body() {
        let app = app(router::state());

        let body = json!([{ "name": "admin", "registeredIp": "localhost" }]);
        let response =
            make_request(app.clone(), Method::POST, "/users", body.to_string())
                .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response =
            make_request(app, Method::POST, "/users", "{".to_owned()).await;
        assert!(response.status().is_client_error());
    }
}
