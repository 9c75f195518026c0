//! Tree-shape mutations: active-path switching and branch/message creation.
//!
//! Every public method runs as a single transaction, so concurrent readers
//! never observe a partially applied deactivate/activate walk and the
//! single-active-path invariant holds at every commit point. The walks are
//! depth-first over repeated `parent_id` lookups -- the forest lives in the
//! store, not in memory -- with the path-selection policy itself delegated
//! to `tangent_core::branching`.

use sqlx::{PgConnection, PgPool};
use tangent_core::branching::{self, BranchCandidate, BranchInfo};
use tangent_core::message::{MessageRole, MessageStatus};
use tangent_core::types::{DbId, Timestamp};

use crate::models::message::{CreateAssistantMessage, CreateUserMessage, Message};
use crate::repositories::message_repo::{MessageRepo, COLUMNS};

/// Provides the branching mutations and navigation for the messages forest.
pub struct BranchingRepo;

impl BranchingRepo {
    /// Position of `message_id` among its sibling branches, with the
    /// projections a branch-switcher UI needs.
    ///
    /// Read-only. Returns `None` when the message does not exist (or is
    /// soft-deleted).
    pub async fn branch_info(
        pool: &PgPool,
        message_id: DbId,
    ) -> Result<Option<BranchInfo>, sqlx::Error> {
        let Some(message) = MessageRepo::find_by_id(pool, message_id).await? else {
            return Ok(None);
        };
        let siblings = MessageRepo::siblings_of(pool, &message).await?;
        let candidates: Vec<BranchCandidate> =
            siblings.iter().map(Message::as_branch_candidate).collect();
        Ok(branching::branch_info(&candidates, message_id))
    }

    /// Switch the displayed path to the branch containing `message_id`.
    ///
    /// Deactivates every other sibling's entire subtree, activates the
    /// target, then descends activating the most recently created live
    /// child at each level. Returns `None` (and mutates nothing) when the
    /// target does not exist.
    pub async fn switch_branch(
        pool: &PgPool,
        message_id: DbId,
    ) -> Result<Option<DbId>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let Some(target) = MessageRepo::find_by_id(&mut *tx, message_id).await? else {
            tx.rollback().await?;
            return Ok(None);
        };

        for sibling_id in sibling_ids(&mut tx, &target).await? {
            if sibling_id != target.id {
                deactivate_subtree(&mut tx, sibling_id).await?;
            }
        }

        activate_path(&mut tx, target.id).await?;

        tx.commit().await?;

        tracing::debug!(message_id, "Switched active branch");
        Ok(Some(message_id))
    }

    /// Send a user message, optionally as a new branch under
    /// `input.parent_id`.
    ///
    /// With a parent: assigns the next branch index among live siblings,
    /// clears every flagged-active sibling (all of them, not just the
    /// first found), and inserts the new message as the active branch.
    /// Without a parent: inserts a new root, numbered among live roots of
    /// the same role. Bumps the conversation counters in the same
    /// transaction. Returns `None` when the referenced parent is missing.
    pub async fn send_user_message(
        pool: &PgPool,
        conversation_id: DbId,
        user_id: DbId,
        input: &CreateUserMessage,
    ) -> Result<Option<Message>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let branch_index = match input.parent_id {
            Some(parent_id) => {
                if MessageRepo::find_by_id(&mut *tx, parent_id).await?.is_none() {
                    tx.rollback().await?;
                    return Ok(None);
                }
                let siblings = live_child_candidates(&mut tx, parent_id).await?;
                deactivate_flagged_siblings(&mut tx, parent_id, None).await?;
                branching::next_branch_index(&siblings)
            }
            None => {
                let roots =
                    live_root_candidates(&mut tx, conversation_id, MessageRole::User.as_str())
                        .await?;
                branching::next_branch_index(&roots)
            }
        };

        let parts = match &input.parts {
            Some(parts) => parts.clone(),
            None => default_text_parts(&input.content),
        };

        let message = insert_message(
            &mut tx,
            &NewMessage {
                conversation_id,
                user_id,
                parent_id: input.parent_id,
                branch_index,
                role: MessageRole::User.as_str(),
                parts: &parts,
                content: Some(&input.content),
                status: MessageStatus::Completed.as_str(),
                model: None,
                model_provider: None,
            },
        )
        .await?;

        bump_conversation(&mut tx, conversation_id).await?;

        tx.commit().await?;

        tracing::debug!(
            message_id = message.id,
            conversation_id,
            branch_index,
            "User message created"
        );
        Ok(Some(message))
    }

    /// Create an assistant placeholder under `input.parent_id`, to be
    /// filled in by the streaming pipeline.
    ///
    /// Branch numbering and sibling deactivation are scoped to assistant
    /// siblings only, so user edits and assistant regenerations under the
    /// same parent are numbered independently. Returns `None` when the
    /// parent is missing.
    pub async fn create_assistant_message(
        pool: &PgPool,
        conversation_id: DbId,
        user_id: DbId,
        input: &CreateAssistantMessage,
    ) -> Result<Option<Message>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        if MessageRepo::find_by_id(&mut *tx, input.parent_id).await?.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }

        let siblings = live_assistant_child_candidates(&mut tx, input.parent_id).await?;
        let branch_index = branching::next_branch_index(&siblings);

        deactivate_flagged_siblings(&mut tx, input.parent_id, Some(MessageRole::Assistant.as_str()))
            .await?;

        let empty_parts = serde_json::Value::Array(vec![]);
        let message = insert_message(
            &mut tx,
            &NewMessage {
                conversation_id,
                user_id,
                parent_id: Some(input.parent_id),
                branch_index,
                role: MessageRole::Assistant.as_str(),
                parts: &empty_parts,
                content: None,
                status: MessageStatus::Pending.as_str(),
                model: Some(&input.model),
                model_provider: Some(&input.model_provider),
            },
        )
        .await?;

        tx.commit().await?;

        tracing::debug!(
            message_id = message.id,
            parent_id = input.parent_id,
            branch_index,
            "Assistant placeholder created"
        );
        Ok(Some(message))
    }

    /// Create a user branch under `parent_id` ("try a different approach").
    ///
    /// Unlike the flat sibling clearing in [`Self::send_user_message`],
    /// every currently active sibling has its whole subtree deactivated
    /// before the insert, so the new branch starts as the only active path
    /// below the parent. Returns `None` when the parent is missing.
    pub async fn create_user_branch(
        pool: &PgPool,
        parent_id: DbId,
        user_id: DbId,
        content: &str,
    ) -> Result<Option<Message>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let Some(parent) = MessageRepo::find_by_id(&mut *tx, parent_id).await? else {
            tx.rollback().await?;
            return Ok(None);
        };

        let siblings = live_child_candidates(&mut tx, parent_id).await?;
        let branch_index = branching::next_branch_index(&siblings);

        let flagged: Vec<(DbId,)> = sqlx::query_as(
            "SELECT id FROM messages
             WHERE parent_id = $1 AND deleted_at IS NULL AND is_active_branch IS TRUE",
        )
        .bind(parent_id)
        .fetch_all(&mut *tx)
        .await?;
        for (sibling_id,) in flagged {
            deactivate_subtree(&mut tx, sibling_id).await?;
        }

        let parts = default_text_parts(content);
        let message = insert_message(
            &mut tx,
            &NewMessage {
                conversation_id: parent.conversation_id,
                user_id,
                parent_id: Some(parent_id),
                branch_index,
                role: MessageRole::User.as_str(),
                parts: &parts,
                content: Some(content),
                status: MessageStatus::Completed.as_str(),
                model: None,
                model_provider: None,
            },
        )
        .await?;

        tx.commit().await?;

        tracing::debug!(
            message_id = message.id,
            parent_id,
            branch_index,
            "User branch created"
        );
        Ok(Some(message))
    }
}

// ---------------------------------------------------------------------------
// Internal helpers (transaction-scoped)
// ---------------------------------------------------------------------------

/// Build the default `parts` JSON for a plain-text message: a single
/// `text` part wrapping `content`, matching the AI-SDK parts shape used
/// when no explicit `parts` array is supplied.
fn default_text_parts(content: &str) -> serde_json::Value {
    serde_json::json!([{ "type": "text", "text": content }])
}

/// Fields for a message insert; the row always starts as the active branch.
struct NewMessage<'a> {
    conversation_id: DbId,
    user_id: DbId,
    parent_id: Option<DbId>,
    branch_index: i32,
    role: &'a str,
    parts: &'a serde_json::Value,
    content: Option<&'a str>,
    status: &'a str,
    model: Option<&'a str>,
    model_provider: Option<&'a str>,
}

async fn insert_message(
    conn: &mut PgConnection,
    new: &NewMessage<'_>,
) -> Result<Message, sqlx::Error> {
    let query = format!(
        "INSERT INTO messages
            (conversation_id, user_id, parent_id, branch_index, is_active_branch,
             role, parts, content, status, model, model_provider)
         VALUES ($1, $2, $3, $4, TRUE, $5, $6, $7, $8, $9, $10)
         RETURNING {COLUMNS}"
    );
    sqlx::query_as::<_, Message>(&query)
        .bind(new.conversation_id)
        .bind(new.user_id)
        .bind(new.parent_id)
        .bind(new.branch_index)
        .bind(new.role)
        .bind(new.parts)
        .bind(new.content)
        .bind(new.status)
        .bind(new.model)
        .bind(new.model_provider)
        .fetch_one(conn)
        .await
}

/// Ids of the target's live siblings, target included. Root-level sibling
/// sets are scoped to the same role; mid-tree sets are grouped purely by
/// parent.
async fn sibling_ids(conn: &mut PgConnection, message: &Message) -> Result<Vec<DbId>, sqlx::Error> {
    let rows: Vec<(DbId,)> = match message.parent_id {
        Some(parent_id) => {
            sqlx::query_as("SELECT id FROM messages WHERE parent_id = $1 AND deleted_at IS NULL")
                .bind(parent_id)
                .fetch_all(&mut *conn)
                .await?
        }
        None => {
            sqlx::query_as(
                "SELECT id FROM messages
                 WHERE conversation_id = $1 AND parent_id IS NULL
                   AND role = $2 AND deleted_at IS NULL",
            )
            .bind(message.conversation_id)
            .bind(&message.role)
            .fetch_all(&mut *conn)
            .await?
        }
    };
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Row shape for the pure branch computations.
#[derive(sqlx::FromRow)]
struct CandidateRow {
    id: DbId,
    branch_index: i32,
    created_at: Timestamp,
    model: Option<String>,
}

impl CandidateRow {
    fn into_candidate(self) -> BranchCandidate {
        BranchCandidate {
            id: self.id,
            branch_index: self.branch_index,
            created_at: self.created_at,
            deleted: false,
            model: self.model,
        }
    }
}

/// Live children of `parent_id`, any role.
async fn live_child_candidates(
    conn: &mut PgConnection,
    parent_id: DbId,
) -> Result<Vec<BranchCandidate>, sqlx::Error> {
    let rows: Vec<CandidateRow> = sqlx::query_as(
        "SELECT id, branch_index, created_at, model FROM messages
         WHERE parent_id = $1 AND deleted_at IS NULL",
    )
    .bind(parent_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.into_iter().map(CandidateRow::into_candidate).collect())
}

/// Live assistant children of `parent_id`.
async fn live_assistant_child_candidates(
    conn: &mut PgConnection,
    parent_id: DbId,
) -> Result<Vec<BranchCandidate>, sqlx::Error> {
    let rows: Vec<CandidateRow> = sqlx::query_as(
        "SELECT id, branch_index, created_at, model FROM messages
         WHERE parent_id = $1 AND role = 'assistant' AND deleted_at IS NULL",
    )
    .bind(parent_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.into_iter().map(CandidateRow::into_candidate).collect())
}

/// Live roots of a conversation with the given role.
async fn live_root_candidates(
    conn: &mut PgConnection,
    conversation_id: DbId,
    role: &str,
) -> Result<Vec<BranchCandidate>, sqlx::Error> {
    let rows: Vec<CandidateRow> = sqlx::query_as(
        "SELECT id, branch_index, created_at, model FROM messages
         WHERE conversation_id = $1 AND parent_id IS NULL
           AND role = $2 AND deleted_at IS NULL",
    )
    .bind(conversation_id)
    .bind(role)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.into_iter().map(CandidateRow::into_candidate).collect())
}

/// Clear the active flag on every flagged sibling under `parent_id`,
/// optionally restricted to one role. Flat -- does not touch descendants.
async fn deactivate_flagged_siblings(
    conn: &mut PgConnection,
    parent_id: DbId,
    role: Option<&str>,
) -> Result<(), sqlx::Error> {
    match role {
        Some(role) => {
            sqlx::query(
                "UPDATE messages SET is_active_branch = FALSE, updated_at = NOW()
                 WHERE parent_id = $1 AND role = $2
                   AND deleted_at IS NULL AND is_active_branch IS TRUE",
            )
            .bind(parent_id)
            .bind(role)
            .execute(&mut *conn)
            .await?;
        }
        None => {
            sqlx::query(
                "UPDATE messages SET is_active_branch = FALSE, updated_at = NOW()
                 WHERE parent_id = $1
                   AND deleted_at IS NULL AND is_active_branch IS TRUE",
            )
            .bind(parent_id)
            .execute(&mut *conn)
            .await?;
        }
    }
    Ok(())
}

/// Clear the active flag on `root` and every live descendant.
///
/// Depth-first over an explicit stack; order does not matter since the walk
/// only ever writes `false`, and it is idempotent on already-inactive
/// subtrees.
async fn deactivate_subtree(conn: &mut PgConnection, root: DbId) -> Result<(), sqlx::Error> {
    let mut visited = 0usize;
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        sqlx::query(
            "UPDATE messages SET is_active_branch = FALSE, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;
        visited += 1;

        let children: Vec<(DbId,)> = sqlx::query_as(
            "SELECT id FROM messages WHERE parent_id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;
        stack.extend(children.into_iter().map(|(id,)| id));
    }
    tracing::debug!(root, visited, "Deactivated subtree");
    Ok(())
}

/// Activate `root`, then descend activating the preferred (most recently
/// created) live child at each level until a node has no live children.
///
/// Unselected children are left untouched; callers deactivate competing
/// siblings separately.
async fn activate_path(conn: &mut PgConnection, root: DbId) -> Result<(), sqlx::Error> {
    let mut current = Some(root);
    while let Some(id) = current {
        sqlx::query(
            "UPDATE messages SET is_active_branch = TRUE, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;

        let children = live_child_candidates(conn, id).await?;
        current = branching::preferred_child(&children);
    }
    Ok(())
}

/// Bump the conversation aggregates after a message insert.
async fn bump_conversation(
    conn: &mut PgConnection,
    conversation_id: DbId,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE conversations SET
            message_count = message_count + 1,
            last_message_at = NOW(),
            updated_at = NOW()
         WHERE id = $1",
    )
    .bind(conversation_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
