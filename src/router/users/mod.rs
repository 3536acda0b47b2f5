//! Users-related HTTP API.
mod create;
mod delete;
mod get;
mod roles;
mod update;

use axum::Router;
use axum::routing::{get, put};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        // `GET /users` goes to `get::list`.
        // `POST /users` goes to `create`.
        // `PATCH /users` goes to `update`.
        // `DELETE /users` goes to `delete`.
        .route(
            "/",
            get(get::list)
                .post(create::handler)
                .patch(update::handler)
                .delete(delete::handler),
        )
        // `GET /users/exists` goes to `get::exists`.
        .route("/exists", get(get::exists))
        // `GET /users/:ID` goes to `get`.
        .route("/{user_id}", get(get::handler))
        // `PUT /users/:ID/roles` goes to `roles`.
        .route("/{user_id}/roles", put(roles::handler))
}
