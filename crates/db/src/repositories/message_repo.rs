//! Repository for the `messages` table: reads and single-message lifecycle
//! mutations (streaming fill-in, edits, feedback, soft delete, cancel).
//!
//! Tree-shape mutations -- branch creation and active-path switching -- live
//! in [`crate::repositories::BranchingRepo`].

use sqlx::{PgExecutor, PgPool};
use tangent_core::types::DbId;

use crate::models::message::{
    AddFeedback, EditUserMessage, Message, UpdateAssistantMessage,
};

/// Column list shared across messages queries.
pub(crate) const COLUMNS: &str = "id, conversation_id, user_id, parent_id, branch_index, \
    is_active_branch, role, parts, content, status, model, model_provider, finish_reason, \
    prompt_tokens, completion_tokens, total_tokens, latency_ms, original_content, is_edited, \
    edited_at, feedback_rating, feedback_comment, feedback_at, deleted_at, created_at, updated_at";

/// Default page size for the transcript query.
const DEFAULT_LIST_LIMIT: i64 = 200;

/// Provides read and lifecycle operations for messages.
pub struct MessageRepo;

impl MessageRepo {
    /// Find a message by its primary key. Excludes soft-deleted rows.
    pub async fn find_by_id<'e, E>(executor: E, id: DbId) -> Result<Option<Message>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {COLUMNS} FROM messages WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Message>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// The displayed transcript: live messages on the active path,
    /// chronological, capped at `limit` (default 200).
    ///
    /// Rows with no `is_active_branch` flag predate branching and are
    /// treated as active.
    pub async fn list_active(
        pool: &PgPool,
        conversation_id: DbId,
        limit: Option<i64>,
    ) -> Result<Vec<Message>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM messages
             WHERE conversation_id = $1
               AND deleted_at IS NULL
               AND (is_active_branch IS NULL OR is_active_branch)
             ORDER BY created_at ASC
             LIMIT $2"
        );
        sqlx::query_as::<_, Message>(&query)
            .bind(conversation_id)
            .bind(limit.unwrap_or(DEFAULT_LIST_LIMIT))
            .fetch_all(pool)
            .await
    }

    /// Every live message in a conversation, chronological, regardless of
    /// active-branch status. Branch-navigation UIs rebuild the tree shape
    /// client-side from `parent_id`/`branch_index`.
    pub async fn list_with_branches(
        pool: &PgPool,
        conversation_id: DbId,
    ) -> Result<Vec<Message>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM messages
             WHERE conversation_id = $1 AND deleted_at IS NULL
             ORDER BY created_at ASC"
        );
        sqlx::query_as::<_, Message>(&query)
            .bind(conversation_id)
            .fetch_all(pool)
            .await
    }

    /// Live siblings of `message`, itself included.
    ///
    /// Non-root messages: all live messages sharing the parent, any role.
    /// Root messages: live roots of the same conversation AND the same
    /// role -- root-level turns are only siblings of their own kind, while
    /// mid-tree siblings are grouped purely by parent.
    pub async fn siblings_of<'e, E>(
        executor: E,
        message: &Message,
    ) -> Result<Vec<Message>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        match message.parent_id {
            Some(parent_id) => {
                let query = format!(
                    "SELECT {COLUMNS} FROM messages
                     WHERE parent_id = $1 AND deleted_at IS NULL"
                );
                sqlx::query_as::<_, Message>(&query)
                    .bind(parent_id)
                    .fetch_all(executor)
                    .await
            }
            None => {
                let query = format!(
                    "SELECT {COLUMNS} FROM messages
                     WHERE conversation_id = $1 AND parent_id IS NULL
                       AND role = $2 AND deleted_at IS NULL"
                );
                sqlx::query_as::<_, Message>(&query)
                    .bind(message.conversation_id)
                    .bind(&message.role)
                    .fetch_all(executor)
                    .await
            }
        }
    }

    /// Fill in an assistant placeholder during/after streaming. Returns the
    /// updated row, or `None` if the message does not exist.
    ///
    /// When the update marks the message `completed` with usage attached,
    /// the conversation counters are bumped in the same transaction.
    pub async fn update_assistant(
        pool: &PgPool,
        id: DbId,
        input: &UpdateAssistantMessage,
    ) -> Result<Option<Message>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE messages SET
                parts = COALESCE($2, parts),
                content = COALESCE($3, content),
                status = COALESCE($4, status),
                finish_reason = COALESCE($5, finish_reason),
                prompt_tokens = COALESCE($6, prompt_tokens),
                completion_tokens = COALESCE($7, completion_tokens),
                total_tokens = COALESCE($8, total_tokens),
                latency_ms = COALESCE($9, latency_ms),
                updated_at = NOW()
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Message>(&query)
            .bind(id)
            .bind(&input.parts)
            .bind(&input.content)
            .bind(input.status.map(|s| s.as_str()))
            .bind(input.finish_reason.map(|r| r.as_str()))
            .bind(input.usage.map(|u| u.prompt_tokens))
            .bind(input.usage.map(|u| u.completion_tokens))
            .bind(input.usage.map(|u| u.total_tokens))
            .bind(input.latency_ms)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(message) = updated else {
            tx.rollback().await?;
            return Ok(None);
        };

        if message.status == "completed" {
            if let Some(usage) = input.usage {
                sqlx::query(
                    "UPDATE conversations SET
                        message_count = message_count + 1,
                        total_tokens = total_tokens + $2,
                        last_message_at = NOW(),
                        updated_at = NOW()
                     WHERE id = $1",
                )
                .bind(message.conversation_id)
                .bind(usage.total_tokens)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(Some(message))
    }

    /// Edit a user message in place, preserving the original content on the
    /// first edit. Returns the updated row, or `None` if not found.
    ///
    /// Ownership and role checks are the caller's responsibility.
    pub async fn edit_user(
        pool: &PgPool,
        id: DbId,
        input: &EditUserMessage,
        parts: &serde_json::Value,
    ) -> Result<Option<Message>, sqlx::Error> {
        let query = format!(
            "UPDATE messages SET
                content = $2,
                parts = $3,
                original_content = COALESCE(original_content, content),
                is_edited = TRUE,
                edited_at = NOW(),
                updated_at = NOW()
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Message>(&query)
            .bind(id)
            .bind(&input.content)
            .bind(parts)
            .fetch_optional(pool)
            .await
    }

    /// Attach feedback to an assistant message. Returns the updated row, or
    /// `None` if not found.
    pub async fn add_feedback(
        pool: &PgPool,
        id: DbId,
        input: &AddFeedback,
    ) -> Result<Option<Message>, sqlx::Error> {
        let query = format!(
            "UPDATE messages SET
                feedback_rating = $2,
                feedback_comment = $3,
                feedback_at = NOW(),
                updated_at = NOW()
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Message>(&query)
            .bind(id)
            .bind(input.rating.as_str())
            .bind(&input.comment)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete a message. Returns `true` if a row was marked deleted.
    ///
    /// Children of a deleted message stay addressable; they are simply
    /// excluded from sibling and active-path computations through their
    /// deleted ancestor.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE messages SET deleted_at = NOW(), updated_at = NOW()
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Cancel an in-flight response: `pending`/`streaming` becomes
    /// `cancelled`. Returns `true` if the status changed; a message already
    /// in a terminal state is left untouched.
    pub async fn cancel_streaming(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE messages SET
                status = 'cancelled',
                finish_reason = 'cancelled',
                updated_at = NOW()
             WHERE id = $1 AND deleted_at IS NULL
               AND status IN ('pending', 'streaming')",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
