//! Route definitions for conversations and their message collections.
//!
//! ```text
//! GET    /                          list_conversations
//! POST   /                          create_conversation
//! GET    /{id}                      get_conversation
//! PUT    /{id}                      update_conversation
//! DELETE /{id}                      delete_conversation
//! GET    /{id}/messages             list_messages (?limit)
//! POST   /{id}/messages             send_message
//! GET    /{id}/messages/branches    list_with_branches
//! POST   /{id}/messages/assistant   create_assistant_message
//! ```

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{conversations, messages};
use crate::state::AppState;

/// Conversation routes, mounted at `/conversations`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(conversations::list_conversations).post(conversations::create_conversation),
        )
        .route(
            "/{id}",
            get(conversations::get_conversation)
                .put(conversations::update_conversation)
                .delete(conversations::delete_conversation),
        )
        .route(
            "/{id}/messages",
            get(messages::list_messages).post(messages::send_message),
        )
        .route("/{id}/messages/branches", get(messages::list_with_branches))
        .route(
            "/{id}/messages/assistant",
            post(messages::create_assistant_message),
        )
}
