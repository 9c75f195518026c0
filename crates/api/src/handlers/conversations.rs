//! Handlers for the `/conversations` resource.
//!
//! Plain owner-scoped CRUD; the message counters on these rows are
//! maintained by the message mutations, not here.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tangent_core::error::CoreError;
use tangent_core::types::DbId;
use tangent_db::models::conversation::{CreateConversation, UpdateConversation};
use tangent_db::repositories::ConversationRepo;

use crate::access::{verify_conversation_access, verify_conversation_read_access};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// POST /conversations
// ---------------------------------------------------------------------------

/// Create a new conversation owned by the caller.
pub async fn create_conversation(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateConversation>,
) -> AppResult<impl IntoResponse> {
    let conversation = ConversationRepo::create(&state.pool, auth.user_id, &body).await?;

    tracing::info!(
        conversation_id = conversation.id,
        user_id = auth.user_id,
        "Conversation created"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: conversation })))
}

// ---------------------------------------------------------------------------
// GET /conversations
// ---------------------------------------------------------------------------

/// List the caller's conversations, most recently updated first.
pub async fn list_conversations(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<impl IntoResponse> {
    let conversations = ConversationRepo::list_by_user(&state.pool, auth.user_id).await?;

    tracing::debug!(
        count = conversations.len(),
        user_id = auth.user_id,
        "Listed conversations"
    );

    Ok(Json(DataResponse {
        data: conversations,
    }))
}

// ---------------------------------------------------------------------------
// GET /conversations/{id}
// ---------------------------------------------------------------------------

/// Get a single conversation. Owners and shared-link readers are allowed.
pub async fn get_conversation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let conversation = verify_conversation_read_access(&state.pool, id, auth.user_id).await?;
    Ok(Json(DataResponse { data: conversation }))
}

// ---------------------------------------------------------------------------
// PUT /conversations/{id}
// ---------------------------------------------------------------------------

/// Update a conversation's title, model, prompt, or pinned state.
pub async fn update_conversation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Json(body): Json<UpdateConversation>,
) -> AppResult<impl IntoResponse> {
    verify_conversation_access(&state.pool, id, auth.user_id).await?;

    let conversation = ConversationRepo::update(&state.pool, id, &body)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "Conversation",
                id,
            })
        })?;

    tracing::info!(conversation_id = id, "Conversation updated");

    Ok(Json(DataResponse { data: conversation }))
}

// ---------------------------------------------------------------------------
// DELETE /conversations/{id}
// ---------------------------------------------------------------------------

/// Soft-delete a conversation.
pub async fn delete_conversation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    verify_conversation_access(&state.pool, id, auth.user_id).await?;

    let deleted = ConversationRepo::soft_delete(&state.pool, id).await?;
    if deleted {
        tracing::info!(conversation_id = id, "Conversation deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::NotFound {
            entity: "Conversation",
            id,
        }))
    }
}
