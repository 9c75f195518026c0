//! Handlers for branch navigation and switching.
//!
//! A message's siblings are its alternative branches: regenerations and
//! edits sharing the same parent slot. These endpoints expose the sibling
//! structure and move the active path between branches.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tangent_core::error::CoreError;
use tangent_core::message;
use tangent_core::types::DbId;
use tangent_db::models::message::{CreateBranch, Message};
use tangent_db::repositories::{BranchingRepo, MessageRepo};

use crate::access::verify_conversation_access;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// GET /messages/{id}/branch-info
// ---------------------------------------------------------------------------

/// Position of a message among its sibling branches, with the sibling
/// projections a branch-switcher UI needs.
///
/// Returns `null` data when the message does not exist (or is deleted),
/// mirroring the query-side convention of empty rather than erroring.
pub async fn get_branch_info(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let info = BranchingRepo::branch_info(&state.pool, id).await?;
    Ok(Json(DataResponse { data: info }))
}

// ---------------------------------------------------------------------------
// GET /messages/{id}/siblings
// ---------------------------------------------------------------------------

/// Raw live sibling rows of a message, itself included. Unknown or deleted
/// messages yield an empty list.
pub async fn get_siblings(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let siblings: Vec<Message> = match MessageRepo::find_by_id(&state.pool, id).await? {
        Some(message) => MessageRepo::siblings_of(&state.pool, &message).await?,
        None => Vec::new(),
    };
    Ok(Json(DataResponse { data: siblings }))
}

// ---------------------------------------------------------------------------
// POST /messages/{id}/switch-branch
// ---------------------------------------------------------------------------

/// Switch the displayed path to the branch containing this message.
///
/// Fails with 404 before any mutation when the target does not exist; the
/// deactivate/activate walk itself is atomic.
pub async fn switch_branch(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let target = MessageRepo::find_by_id(&state.pool, id).await?.ok_or_else(|| {
        AppError::Core(CoreError::NotFound {
            entity: "Message",
            id,
        })
    })?;
    verify_conversation_access(&state.pool, target.conversation_id, auth.user_id).await?;

    let switched = BranchingRepo::switch_branch(&state.pool, id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "Message",
                id,
            })
        })?;

    tracing::info!(message_id = id, user_id = auth.user_id, "Branch switched");

    Ok(Json(DataResponse { data: switched }))
}

// ---------------------------------------------------------------------------
// POST /messages/{id}/branch
// ---------------------------------------------------------------------------

/// Create a new branch under this message ("regenerate" / "try a different
/// approach").
///
/// With `content`: inserts a new user message as the active branch and
/// returns its id. Without `content`: a pure regeneration signal -- nothing
/// is mutated and the parent id comes back unchanged, for the caller to
/// follow up with an assistant placeholder.
pub async fn create_branch(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Json(body): Json<CreateBranch>,
) -> AppResult<impl IntoResponse> {
    let parent = MessageRepo::find_by_id(&state.pool, id).await?.ok_or_else(|| {
        AppError::Core(CoreError::NotFound {
            entity: "Message",
            id,
        })
    })?;
    verify_conversation_access(&state.pool, parent.conversation_id, auth.user_id).await?;

    let Some(content) = body.content.as_deref() else {
        return Ok((StatusCode::OK, Json(DataResponse { data: id })));
    };
    message::validate_message_content(content)?;

    let created = BranchingRepo::create_user_branch(&state.pool, id, auth.user_id, content)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "Message",
                id,
            })
        })?;

    tracing::info!(
        message_id = created.id,
        parent_id = id,
        branch_index = created.branch_index,
        "Branch created"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: created.id })))
}
