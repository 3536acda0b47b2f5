//! Read users.

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};

use crate::ServerError;
use crate::repository::Key;
use crate::router::Exists;
use crate::service::IdentityService;
use crate::user::{User, UserFilter};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistsQuery {
    name: Option<String>,
    registered_ip: Option<String>,
    /// User to ignore, usually the one being edited.
    exclude: Option<Key>,
}

pub async fn list(
    State(identity): State<IdentityService>,
) -> Result<Json<Vec<User>>, ServerError> {
    Ok(Json(identity.users().await?))
}

pub async fn handler(
    State(identity): State<IdentityService>,
    Path(user_id): Path<Key>,
) -> Result<Json<User>, ServerError> {
    Ok(Json(identity.user(user_id).await?))
}

pub async fn exists(
    State(identity): State<IdentityService>,
    Query(query): Query<ExistsQuery>,
) -> Result<Json<Exists>, ServerError> {
    let filter = match (query.name, query.registered_ip) {
        (Some(name), _) => UserFilter::Name(name),
        (None, Some(ip)) => UserFilter::RegisteredIp(ip),
        (None, None) => return Err(ServerError::MissingArgument("name")),
    };

    let exists = identity.check_user_exists(&filter, query.exclude).await?;
    Ok(Json(Exists { exists }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use http_body_util::BodyExt;

    use super::*;
    use crate::user::UserDto;
    use crate::*;

    async fn seeded() -> AppState {
        let state = router::state();
        state
            .identity
            .add_users(vec![
                UserDto::new("admin", Some("127.0.0.1")),
                UserDto::new("guest", None),
            ])
            .await
            .unwrap();
        state
    }

    #[tokio::test]
    async fn test_get_user_handler() {
        let app = app(seeded().await);

        let response =
            make_request(app.clone(), Method::GET, "/users/1", String::default())
                .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: User = serde_json::from_slice(&body).unwrap();
        assert_eq!(body.name, "admin");
        assert_eq!(body.extend.registered_ip.as_deref(), Some("127.0.0.1"));

        let response =
            make_request(app, Method::GET, "/users/42", String::default())
                .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_handler() {
        let app = app(seeded().await);

        let response =
            make_request(app, Method::GET, "/users", String::default()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: Vec<User> = serde_json::from_slice(&body).unwrap();
        assert_eq!(body.len(), 2);
    }

    #[tokio::test]
    async fn test_exists_handler() {
        let app = app(seeded().await);

        for (path, expected) in [
            ("/users/exists?name=admin", true),
            ("/users/exists?name=admin&exclude=1", false),
            ("/users/exists?name=admin&exclude=0", true),
            ("/users/exists?registeredIp=127.0.0.1", true),
            ("/users/exists?name=nobody", false),
        ] {
            let response =
                make_request(app.clone(), Method::GET, path, String::default())
                    .await;
            assert_eq!(response.status(), StatusCode::OK);

            let body = response.into_body().collect().await.unwrap().to_bytes();
            let body: Exists = serde_json::from_slice(&body).unwrap();
            assert_eq!(body.exists, expected, "{path}");
        }

        let response =
            make_request(app, Method::GET, "/users/exists", String::default())
                .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
