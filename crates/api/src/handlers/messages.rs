//! Handlers for message creation and lifecycle within a conversation.
//!
//! Branch navigation and switching live in
//! [`crate::handlers::branching`].

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tangent_core::error::CoreError;
use tangent_core::message::{self, MessageRole};
use tangent_core::types::DbId;
use tangent_db::models::message::{
    AddFeedback, CreateAssistantMessage, CreateUserMessage, EditUserMessage, Message,
    UpdateAssistantMessage,
};
use tangent_db::repositories::{BranchingRepo, MessageRepo};

use crate::access::{verify_conversation_access, verify_conversation_read_access};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

/// Query parameters for the transcript endpoint.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Resolve a live message, returning the full row.
async fn ensure_message_exists(pool: &sqlx::PgPool, id: DbId) -> AppResult<Message> {
    MessageRepo::find_by_id(pool, id).await?.ok_or_else(|| {
        AppError::Core(CoreError::NotFound {
            entity: "Message",
            id,
        })
    })
}

// ---------------------------------------------------------------------------
// GET /conversations/{conversation_id}/messages
// ---------------------------------------------------------------------------

/// The displayed transcript: live messages on the active branch path.
pub async fn list_messages(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(conversation_id): Path<DbId>,
    Query(params): Query<ListParams>,
) -> AppResult<impl IntoResponse> {
    verify_conversation_read_access(&state.pool, conversation_id, auth.user_id).await?;

    let messages = MessageRepo::list_active(&state.pool, conversation_id, params.limit).await?;

    tracing::debug!(
        count = messages.len(),
        conversation_id,
        "Listed active-path messages"
    );

    Ok(Json(DataResponse { data: messages }))
}

// ---------------------------------------------------------------------------
// GET /conversations/{conversation_id}/messages/branches
// ---------------------------------------------------------------------------

/// Every live message in the conversation, regardless of branch, for
/// branch-navigation UIs that rebuild the tree client-side.
pub async fn list_with_branches(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(conversation_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    verify_conversation_read_access(&state.pool, conversation_id, auth.user_id).await?;

    let messages = MessageRepo::list_with_branches(&state.pool, conversation_id).await?;
    Ok(Json(DataResponse { data: messages }))
}

// ---------------------------------------------------------------------------
// POST /conversations/{conversation_id}/messages
// ---------------------------------------------------------------------------

/// Send a user message, optionally branching from `parent_id`.
pub async fn send_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(conversation_id): Path<DbId>,
    Json(body): Json<CreateUserMessage>,
) -> AppResult<impl IntoResponse> {
    verify_conversation_access(&state.pool, conversation_id, auth.user_id).await?;
    message::validate_message_content(&body.content)?;

    let created =
        BranchingRepo::send_user_message(&state.pool, conversation_id, auth.user_id, &body)
            .await?
            .ok_or_else(|| {
                AppError::Core(CoreError::NotFound {
                    entity: "Message",
                    id: body.parent_id.unwrap_or_default(),
                })
            })?;

    tracing::info!(
        message_id = created.id,
        conversation_id,
        user_id = auth.user_id,
        "User message sent"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: created.id })))
}

// ---------------------------------------------------------------------------
// POST /conversations/{conversation_id}/messages/assistant
// ---------------------------------------------------------------------------

/// Create an assistant placeholder for the response pipeline to fill in.
pub async fn create_assistant_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(conversation_id): Path<DbId>,
    Json(body): Json<CreateAssistantMessage>,
) -> AppResult<impl IntoResponse> {
    verify_conversation_access(&state.pool, conversation_id, auth.user_id).await?;

    let created =
        BranchingRepo::create_assistant_message(&state.pool, conversation_id, auth.user_id, &body)
            .await?
            .ok_or_else(|| {
                AppError::Core(CoreError::NotFound {
                    entity: "Message",
                    id: body.parent_id,
                })
            })?;

    tracing::info!(
        message_id = created.id,
        parent_id = body.parent_id,
        model = %body.model,
        "Assistant placeholder created"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: created.id })))
}

// ---------------------------------------------------------------------------
// PATCH /messages/{id}
// ---------------------------------------------------------------------------

/// Fill in an assistant message during/after streaming.
pub async fn update_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Json(body): Json<UpdateAssistantMessage>,
) -> AppResult<impl IntoResponse> {
    let existing = ensure_message_exists(&state.pool, id).await?;
    verify_conversation_access(&state.pool, existing.conversation_id, auth.user_id).await?;

    let updated = MessageRepo::update_assistant(&state.pool, id, &body)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "Message",
                id,
            })
        })?;

    Ok(Json(DataResponse { data: updated }))
}

// ---------------------------------------------------------------------------
// PUT /messages/{id}
// ---------------------------------------------------------------------------

/// Edit a user message in place. Only the author may edit, and only
/// user-role messages are editable.
pub async fn edit_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Json(body): Json<EditUserMessage>,
) -> AppResult<impl IntoResponse> {
    let existing = ensure_message_exists(&state.pool, id).await?;

    if existing.user_id != auth.user_id {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only the author may edit a message".into(),
        )));
    }
    if existing.role != MessageRole::User.as_str() {
        return Err(AppError::Core(CoreError::Validation(
            "Only user messages can be edited".into(),
        )));
    }
    message::validate_message_content(&body.content)?;

    let parts = match &body.parts {
        Some(parts) => parts.clone(),
        None => json!([{ "type": "text", "text": body.content }]),
    };

    let updated = MessageRepo::edit_user(&state.pool, id, &body, &parts)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "Message",
                id,
            })
        })?;

    tracing::info!(message_id = id, "Message edited");

    Ok(Json(DataResponse { data: updated }))
}

// ---------------------------------------------------------------------------
// POST /messages/{id}/feedback
// ---------------------------------------------------------------------------

/// Rate an assistant message.
pub async fn add_feedback(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Json(body): Json<AddFeedback>,
) -> AppResult<impl IntoResponse> {
    let existing = ensure_message_exists(&state.pool, id).await?;
    verify_conversation_read_access(&state.pool, existing.conversation_id, auth.user_id).await?;

    if existing.role != MessageRole::Assistant.as_str() {
        return Err(AppError::Core(CoreError::Validation(
            "Feedback can only be added to assistant messages".into(),
        )));
    }

    let updated = MessageRepo::add_feedback(&state.pool, id, &body)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "Message",
                id,
            })
        })?;

    Ok(Json(DataResponse { data: updated }))
}

// ---------------------------------------------------------------------------
// DELETE /messages/{id}
// ---------------------------------------------------------------------------

/// Soft-delete a message. Only the author may delete.
///
/// Children of the deleted message remain addressable; they drop out of
/// sibling computations through their deleted ancestor.
pub async fn remove_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let existing = ensure_message_exists(&state.pool, id).await?;

    if existing.user_id != auth.user_id {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only the author may delete a message".into(),
        )));
    }

    let deleted = MessageRepo::soft_delete(&state.pool, id).await?;
    if deleted {
        tracing::info!(message_id = id, "Message deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::NotFound {
            entity: "Message",
            id,
        }))
    }
}

// ---------------------------------------------------------------------------
// POST /messages/{id}/cancel
// ---------------------------------------------------------------------------

/// Cancel an in-flight assistant response. A message already in a terminal
/// state is left untouched.
pub async fn cancel_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let existing = ensure_message_exists(&state.pool, id).await?;
    verify_conversation_access(&state.pool, existing.conversation_id, auth.user_id).await?;

    MessageRepo::cancel_streaming(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
