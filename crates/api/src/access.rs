//! Conversation access checks.
//!
//! Callers resolve identity through the `AuthUser` extractor and pass the
//! user id in explicitly; nothing below this layer looks up ambient
//! request state.

use tangent_core::error::CoreError;
use tangent_core::types::DbId;
use tangent_db::models::conversation::Conversation;
use tangent_db::repositories::ConversationRepo;
use tangent_db::DbPool;

use crate::error::{AppError, AppResult};

/// Resolve a conversation and verify the caller may mutate it.
///
/// Only the owner has write access.
pub async fn verify_conversation_access(
    pool: &DbPool,
    conversation_id: DbId,
    user_id: DbId,
) -> AppResult<Conversation> {
    let conversation = ConversationRepo::find_by_id(pool, conversation_id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "Conversation",
                id: conversation_id,
            })
        })?;

    if conversation.user_id != user_id {
        return Err(AppError::Core(CoreError::Forbidden(
            "Access denied to conversation".into(),
        )));
    }

    Ok(conversation)
}

/// Resolve a conversation and verify the caller may read it.
///
/// The owner always may; shared conversations are readable by any
/// authenticated user.
pub async fn verify_conversation_read_access(
    pool: &DbPool,
    conversation_id: DbId,
    user_id: DbId,
) -> AppResult<Conversation> {
    let conversation = ConversationRepo::find_by_id(pool, conversation_id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "Conversation",
                id: conversation_id,
            })
        })?;

    if conversation.user_id != user_id && !conversation.is_shared {
        return Err(AppError::Core(CoreError::Forbidden(
            "Access denied to conversation".into(),
        )));
    }

    Ok(conversation)
}
