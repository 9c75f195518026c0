//! Route definitions for message-level operations.
//!
//! ```text
//! PUT    /{id}                 edit_message
//! PATCH  /{id}                 update_message (streaming fill-in)
//! DELETE /{id}                 remove_message (soft)
//! GET    /{id}/branch-info     get_branch_info
//! GET    /{id}/siblings        get_siblings
//! POST   /{id}/switch-branch   switch_branch
//! POST   /{id}/branch          create_branch
//! POST   /{id}/feedback        add_feedback
//! POST   /{id}/cancel          cancel_message
//! ```

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{branching, messages};
use crate::state::AppState;

/// Message routes, mounted at `/messages`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{id}",
            put(messages::edit_message)
                .patch(messages::update_message)
                .delete(messages::remove_message),
        )
        .route("/{id}/branch-info", get(branching::get_branch_info))
        .route("/{id}/siblings", get(branching::get_siblings))
        .route("/{id}/switch-branch", post(branching::switch_branch))
        .route("/{id}/branch", post(branching::create_branch))
        .route("/{id}/feedback", post(messages::add_feedback))
        .route("/{id}/cancel", post(messages::cancel_message))
}
