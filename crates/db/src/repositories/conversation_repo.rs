//! Repository for the `conversations` table.
//!
//! Soft delete is modelled through the `status` column (`deleted`), so the
//! row and its message forest survive for a conversation-wide purge to
//! clean up later. Aggregate counters are bumped by the message mutations
//! in `branching_repo` / `message_repo`, inside their transactions.

use sqlx::PgPool;
use tangent_core::types::DbId;

use crate::models::conversation::{Conversation, CreateConversation, UpdateConversation};

/// Column list for conversations queries.
const COLUMNS: &str = "id, user_id, title, model, system_prompt, status, is_pinned, \
    is_shared, share_id, message_count, total_tokens, created_at, updated_at, last_message_at";

/// Provides CRUD operations for conversations.
pub struct ConversationRepo;

impl ConversationRepo {
    /// Insert a new conversation owned by `user_id`, returning the created row.
    pub async fn create(
        pool: &PgPool,
        user_id: DbId,
        input: &CreateConversation,
    ) -> Result<Conversation, sqlx::Error> {
        let query = format!(
            "INSERT INTO conversations (user_id, title, model, system_prompt)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Conversation>(&query)
            .bind(user_id)
            .bind(&input.title)
            .bind(&input.model)
            .bind(&input.system_prompt)
            .fetch_one(pool)
            .await
    }

    /// Find a conversation by its primary key. Excludes soft-deleted rows.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Conversation>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM conversations WHERE id = $1 AND status <> 'deleted'"
        );
        sqlx::query_as::<_, Conversation>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a user's conversations, most recently updated first.
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<Conversation>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM conversations
             WHERE user_id = $1 AND status <> 'deleted'
             ORDER BY updated_at DESC"
        );
        sqlx::query_as::<_, Conversation>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Update a conversation. Returns the updated row, or `None` if not found.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateConversation,
    ) -> Result<Option<Conversation>, sqlx::Error> {
        let query = format!(
            "UPDATE conversations SET
                title = COALESCE($2, title),
                model = COALESCE($3, model),
                system_prompt = COALESCE($4, system_prompt),
                is_pinned = COALESCE($5, is_pinned),
                updated_at = NOW()
             WHERE id = $1 AND status <> 'deleted'
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Conversation>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(&input.model)
            .bind(&input.system_prompt)
            .bind(input.is_pinned)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete a conversation. Returns `true` if a row was marked deleted.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE conversations SET status = 'deleted', updated_at = NOW()
             WHERE id = $1 AND status <> 'deleted'",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
