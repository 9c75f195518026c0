pub mod auth;
pub mod conversations;
pub mod health;
pub mod messages;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/register                                  register (public)
/// /auth/login                                     login (public)
///
/// /conversations                                  list, create
/// /conversations/{id}                             get, update, delete
/// /conversations/{id}/messages                    transcript (GET), send (POST)
/// /conversations/{id}/messages/branches           full forest (GET)
/// /conversations/{id}/messages/assistant          assistant placeholder (POST)
///
/// /messages/{id}                                  edit (PUT), stream fill-in (PATCH), delete
/// /messages/{id}/branch-info                      branch position + siblings (GET)
/// /messages/{id}/siblings                         raw sibling rows (GET)
/// /messages/{id}/switch-branch                    switch active path (POST)
/// /messages/{id}/branch                           create branch / regenerate (POST)
/// /messages/{id}/feedback                         rate assistant message (POST)
/// /messages/{id}/cancel                           cancel streaming (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/conversations", conversations::router())
        .nest("/messages", messages::router())
}
