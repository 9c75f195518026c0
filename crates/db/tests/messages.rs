//! Integration tests for message lifecycle operations: transcript listing,
//! streaming fill-in, edits, feedback, soft delete, and cancellation.

use sqlx::PgPool;
use tangent_core::message::{FinishReason, MessageStatus};
use tangent_core::types::DbId;
use tangent_db::models::conversation::CreateConversation;
use tangent_db::models::message::{
    CreateAssistantMessage, CreateUserMessage, EditUserMessage, Message, TokenUsage,
    UpdateAssistantMessage,
};
use tangent_db::models::user::CreateUser;
use tangent_db::repositories::{BranchingRepo, ConversationRepo, MessageRepo, UserRepo};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn seed(pool: &PgPool) -> (DbId, DbId) {
    let user = UserRepo::create(
        pool,
        &CreateUser {
            email: "messages@example.com".to_string(),
            display_name: Some("Tester".to_string()),
            password_hash: "$argon2id$test".to_string(),
        },
    )
    .await
    .unwrap();

    let conversation = ConversationRepo::create(
        pool,
        user.id,
        &CreateConversation {
            title: None,
            model: Some("gpt-test".to_string()),
            system_prompt: None,
        },
    )
    .await
    .unwrap();

    (user.id, conversation.id)
}

async fn send_user(
    pool: &PgPool,
    conversation_id: DbId,
    user_id: DbId,
    content: &str,
    parent_id: Option<DbId>,
) -> Message {
    BranchingRepo::send_user_message(
        pool,
        conversation_id,
        user_id,
        &CreateUserMessage {
            content: content.to_string(),
            parts: None,
            parent_id,
        },
    )
    .await
    .unwrap()
    .unwrap()
}

// ---------------------------------------------------------------------------
// Test: sending builds default parts and bumps conversation counters
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_send_user_message_defaults_and_counters(pool: PgPool) {
    let (user_id, conversation_id) = seed(&pool).await;

    let message = send_user(&pool, conversation_id, user_id, "hello there", None).await;

    assert_eq!(message.role, "user");
    assert_eq!(message.status, "completed");
    assert_eq!(message.branch_index, 0);
    assert_eq!(message.is_active_branch, Some(true));
    assert_eq!(
        message.parts,
        serde_json::json!([{ "type": "text", "text": "hello there" }])
    );

    let conversation = ConversationRepo::find_by_id(&pool, conversation_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(conversation.message_count, 1);
    assert!(conversation.last_message_at.is_some());
}

// ---------------------------------------------------------------------------
// Test: assistant placeholder starts pending and empty
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_assistant_placeholder_shape(pool: PgPool) {
    let (user_id, conversation_id) = seed(&pool).await;
    let root = send_user(&pool, conversation_id, user_id, "prompt", None).await;

    let placeholder = BranchingRepo::create_assistant_message(
        &pool,
        conversation_id,
        user_id,
        &CreateAssistantMessage {
            parent_id: root.id,
            model: "gpt-test".to_string(),
            model_provider: "testing".to_string(),
        },
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(placeholder.role, "assistant");
    assert_eq!(placeholder.status, "pending");
    assert_eq!(placeholder.parts, serde_json::json!([]));
    assert!(placeholder.content.is_none());
    assert_eq!(placeholder.model.as_deref(), Some("gpt-test"));
    assert_eq!(placeholder.is_active_branch, Some(true));
}

// ---------------------------------------------------------------------------
// Test: completing a response bumps counters once, with usage
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_assistant_completion_bumps_counters(pool: PgPool) {
    let (user_id, conversation_id) = seed(&pool).await;
    let root = send_user(&pool, conversation_id, user_id, "prompt", None).await;
    let placeholder = BranchingRepo::create_assistant_message(
        &pool,
        conversation_id,
        user_id,
        &CreateAssistantMessage {
            parent_id: root.id,
            model: "gpt-test".to_string(),
            model_provider: "testing".to_string(),
        },
    )
    .await
    .unwrap()
    .unwrap();

    // Streaming progress without usage leaves counters alone.
    MessageRepo::update_assistant(
        &pool,
        placeholder.id,
        &UpdateAssistantMessage {
            parts: None,
            content: Some("partial".to_string()),
            status: Some(MessageStatus::Streaming),
            finish_reason: None,
            usage: None,
            latency_ms: None,
        },
    )
    .await
    .unwrap()
    .unwrap();

    let mid = ConversationRepo::find_by_id(&pool, conversation_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(mid.message_count, 1, "only the user message counted so far");
    assert_eq!(mid.total_tokens, 0);

    let updated = MessageRepo::update_assistant(
        &pool,
        placeholder.id,
        &UpdateAssistantMessage {
            parts: None,
            content: Some("full answer".to_string()),
            status: Some(MessageStatus::Completed),
            finish_reason: Some(FinishReason::Stop),
            usage: Some(TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 20,
                total_tokens: 30,
            }),
            latency_ms: Some(1234),
        },
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(updated.status, "completed");
    assert_eq!(updated.finish_reason.as_deref(), Some("stop"));
    assert_eq!(updated.total_tokens, Some(30));

    let done = ConversationRepo::find_by_id(&pool, conversation_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(done.message_count, 2);
    assert_eq!(done.total_tokens, 30);
}

// ---------------------------------------------------------------------------
// Test: editing preserves the original content only on the first edit
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_edit_preserves_original_once(pool: PgPool) {
    let (user_id, conversation_id) = seed(&pool).await;
    let message = send_user(&pool, conversation_id, user_id, "original", None).await;

    let parts = serde_json::json!([{ "type": "text", "text": "first edit" }]);
    let edited = MessageRepo::edit_user(
        &pool,
        message.id,
        &EditUserMessage {
            content: "first edit".to_string(),
            parts: None,
        },
        &parts,
    )
    .await
    .unwrap()
    .unwrap();

    assert!(edited.is_edited);
    assert_eq!(edited.content.as_deref(), Some("first edit"));
    assert_eq!(edited.original_content.as_deref(), Some("original"));

    let parts = serde_json::json!([{ "type": "text", "text": "second edit" }]);
    let edited_again = MessageRepo::edit_user(
        &pool,
        message.id,
        &EditUserMessage {
            content: "second edit".to_string(),
            parts: None,
        },
        &parts,
    )
    .await
    .unwrap()
    .unwrap();

    // Still the first original, not the intermediate edit.
    assert_eq!(edited_again.original_content.as_deref(), Some("original"));
}

// ---------------------------------------------------------------------------
// Test: transcript listing follows the active path only
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_list_active_excludes_inactive_branches(pool: PgPool) {
    let (user_id, conversation_id) = seed(&pool).await;

    let root = send_user(&pool, conversation_id, user_id, "root", None).await;
    let inactive = BranchingRepo::create_user_branch(&pool, root.id, user_id, "old take")
        .await
        .unwrap()
        .unwrap();
    let active = BranchingRepo::create_user_branch(&pool, root.id, user_id, "new take")
        .await
        .unwrap()
        .unwrap();

    let transcript = MessageRepo::list_active(&pool, conversation_id, None)
        .await
        .unwrap();
    let ids: Vec<DbId> = transcript.iter().map(|m| m.id).collect();

    assert!(ids.contains(&root.id));
    assert!(ids.contains(&active.id));
    assert!(!ids.contains(&inactive.id));

    // The full forest still exposes every live branch.
    let forest = MessageRepo::list_with_branches(&pool, conversation_id)
        .await
        .unwrap();
    assert_eq!(forest.len(), 3);
}

// ---------------------------------------------------------------------------
// Test: soft delete hides the row from reads
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_soft_delete_hides_message(pool: PgPool) {
    let (user_id, conversation_id) = seed(&pool).await;
    let message = send_user(&pool, conversation_id, user_id, "delete me", None).await;

    assert!(MessageRepo::soft_delete(&pool, message.id).await.unwrap());
    assert!(MessageRepo::find_by_id(&pool, message.id).await.unwrap().is_none());

    // Second delete is a no-op.
    assert!(!MessageRepo::soft_delete(&pool, message.id).await.unwrap());

    let transcript = MessageRepo::list_active(&pool, conversation_id, None)
        .await
        .unwrap();
    assert!(transcript.is_empty());
}

// ---------------------------------------------------------------------------
// Test: cancellation only applies to in-flight responses
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_cancel_streaming_only_in_flight(pool: PgPool) {
    let (user_id, conversation_id) = seed(&pool).await;
    let root = send_user(&pool, conversation_id, user_id, "prompt", None).await;
    let placeholder = BranchingRepo::create_assistant_message(
        &pool,
        conversation_id,
        user_id,
        &CreateAssistantMessage {
            parent_id: root.id,
            model: "gpt-test".to_string(),
            model_provider: "testing".to_string(),
        },
    )
    .await
    .unwrap()
    .unwrap();

    assert!(MessageRepo::cancel_streaming(&pool, placeholder.id).await.unwrap());
    let cancelled = MessageRepo::find_by_id(&pool, placeholder.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cancelled.status, "cancelled");
    assert_eq!(cancelled.finish_reason.as_deref(), Some("cancelled"));

    // Terminal states are left untouched.
    assert!(!MessageRepo::cancel_streaming(&pool, placeholder.id).await.unwrap());
    assert!(!MessageRepo::cancel_streaming(&pool, root.id).await.unwrap());
}
