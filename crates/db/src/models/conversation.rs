//! Conversation models and DTOs.
//!
//! A conversation owns a forest of messages and carries aggregate counters
//! (`message_count`, `total_tokens`, `last_message_at`) that the message
//! mutations keep up to date.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tangent_core::types::{DbId, Timestamp};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A conversation row from the `conversations` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Conversation {
    pub id: DbId,
    pub user_id: DbId,
    pub title: Option<String>,
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    /// `active`, `archived`, or `deleted` (soft delete).
    pub status: String,
    pub is_pinned: bool,
    pub is_shared: bool,
    pub share_id: Option<Uuid>,
    pub message_count: i64,
    pub total_tokens: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub last_message_at: Option<Timestamp>,
}

// ---------------------------------------------------------------------------
// Create DTO
// ---------------------------------------------------------------------------

/// Input for creating a new conversation.
#[derive(Debug, Deserialize)]
pub struct CreateConversation {
    pub title: Option<String>,
    pub model: Option<String>,
    pub system_prompt: Option<String>,
}

// ---------------------------------------------------------------------------
// Update DTO
// ---------------------------------------------------------------------------

/// Input for updating a conversation (all fields optional).
#[derive(Debug, Deserialize)]
pub struct UpdateConversation {
    pub title: Option<String>,
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub is_pinned: Option<bool>,
}
