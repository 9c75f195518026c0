//! Message models and DTOs.
//!
//! Messages form the branching forest: `parent_id` links a message to the
//! turn it continues, `branch_index` orders siblings sharing a parent, and
//! `is_active_branch` marks the path currently displayed. Lineage fields
//! (`parent_id`, `branch_index`) are immutable after insert.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tangent_core::branching::BranchCandidate;
use tangent_core::message::{FeedbackRating, FinishReason, MessageStatus};
use tangent_core::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A message row from the `messages` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Message {
    pub id: DbId,
    pub conversation_id: DbId,
    pub user_id: DbId,

    pub parent_id: Option<DbId>,
    pub branch_index: i32,
    /// `None` on rows created before branching existed; treated as active.
    pub is_active_branch: Option<bool>,

    pub role: String,
    pub parts: serde_json::Value,
    pub content: Option<String>,
    pub status: String,

    pub model: Option<String>,
    pub model_provider: Option<String>,
    pub finish_reason: Option<String>,
    pub prompt_tokens: Option<i64>,
    pub completion_tokens: Option<i64>,
    pub total_tokens: Option<i64>,
    pub latency_ms: Option<i64>,

    pub original_content: Option<String>,
    pub is_edited: bool,
    pub edited_at: Option<Timestamp>,

    pub feedback_rating: Option<String>,
    pub feedback_comment: Option<String>,
    pub feedback_at: Option<Timestamp>,

    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Message {
    /// Whether this message lies on the displayed path. Rows without a flag
    /// predate branching and count as active.
    pub fn is_on_active_path(&self) -> bool {
        self.is_active_branch.unwrap_or(true)
    }

    /// View used by the pure branching computations in `tangent-core`.
    pub fn as_branch_candidate(&self) -> BranchCandidate {
        BranchCandidate {
            id: self.id,
            branch_index: self.branch_index,
            created_at: self.created_at,
            deleted: self.deleted_at.is_some(),
            model: self.model.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Create DTOs
// ---------------------------------------------------------------------------

/// Input for sending a user message, optionally as a branch under
/// `parent_id`.
#[derive(Debug, Deserialize)]
pub struct CreateUserMessage {
    pub content: String,
    /// Structured payload; defaults to a single text part built from
    /// `content`.
    pub parts: Option<serde_json::Value>,
    pub parent_id: Option<DbId>,
}

/// Input for creating an assistant placeholder before streaming starts.
#[derive(Debug, Deserialize)]
pub struct CreateAssistantMessage {
    pub parent_id: DbId,
    pub model: String,
    pub model_provider: String,
}

/// Request body for the create-branch endpoint. Without `content` the call
/// is a pure regeneration signal and performs no mutation.
#[derive(Debug, Deserialize)]
pub struct CreateBranch {
    pub content: Option<String>,
}

// ---------------------------------------------------------------------------
// Update DTOs
// ---------------------------------------------------------------------------

/// Token usage reported by the model provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
}

/// Streaming fill-in for an assistant placeholder (all fields optional).
#[derive(Debug, Deserialize)]
pub struct UpdateAssistantMessage {
    pub parts: Option<serde_json::Value>,
    pub content: Option<String>,
    pub status: Option<MessageStatus>,
    pub finish_reason: Option<FinishReason>,
    pub usage: Option<TokenUsage>,
    pub latency_ms: Option<i64>,
}

/// Input for editing a user message in place.
#[derive(Debug, Deserialize)]
pub struct EditUserMessage {
    pub content: String,
    pub parts: Option<serde_json::Value>,
}

/// Input for rating an assistant message.
#[derive(Debug, Deserialize)]
pub struct AddFeedback {
    pub rating: FeedbackRating,
    pub comment: Option<String>,
}
