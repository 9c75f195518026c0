//! HTTP-level integration tests for branch creation, navigation, and
//! switching.

mod common;

use axum::http::StatusCode;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Branch creation + navigation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_branch_info_after_two_branches(pool: PgPool) {
    let (token, _) = common::register(&pool, "branch@example.com").await;
    let conversation_id = common::create_conversation(&pool, &token).await;
    let parent = common::send_message(&pool, &token, conversation_id, "question", None).await;

    let app = common::build_test_app(pool.clone());
    let response = common::post_json(
        app,
        &format!("/api/v1/messages/{parent}/branch"),
        Some(&token),
        serde_json::json!({ "content": "take one" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let first = common::body_json(response).await["data"].as_i64().unwrap();

    let app = common::build_test_app(pool.clone());
    let response = common::post_json(
        app,
        &format!("/api/v1/messages/{parent}/branch"),
        Some(&token),
        serde_json::json!({ "content": "take two" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let second = common::body_json(response).await["data"].as_i64().unwrap();

    // The newest branch is the current one: 2 of 2 with a previous sibling.
    let app = common::build_test_app(pool.clone());
    let response = common::get(
        app,
        &format!("/api/v1/messages/{second}/branch-info"),
        Some(&token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let info = common::body_json(response).await;
    assert_eq!(info["data"]["total_branches"], 2);
    assert_eq!(info["data"]["current_branch"], 2);
    assert_eq!(info["data"]["has_previous"], true);
    assert_eq!(info["data"]["has_next"], false);
    assert_eq!(info["data"]["previous_id"], first);

    // The older branch sees the same set from position 1.
    let app = common::build_test_app(pool);
    let response = common::get(
        app,
        &format!("/api/v1/messages/{first}/branch-info"),
        Some(&token),
    )
    .await;
    let info = common::body_json(response).await;
    assert_eq!(info["data"]["current_branch"], 1);
    assert_eq!(info["data"]["next_id"], second);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_branch_info_unknown_message_is_null(pool: PgPool) {
    let (token, _) = common::register(&pool, "nullinfo@example.com").await;

    let app = common::build_test_app(pool);
    let response = common::get(app, "/api/v1/messages/424242/branch-info", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = common::body_json(response).await;
    assert!(json["data"].is_null());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_siblings_include_self(pool: PgPool) {
    let (token, _) = common::register(&pool, "siblings@example.com").await;
    let conversation_id = common::create_conversation(&pool, &token).await;

    let r1 = common::send_message(&pool, &token, conversation_id, "first root", None).await;
    let _r2 = common::send_message(&pool, &token, conversation_id, "second root", None).await;

    let app = common::build_test_app(pool);
    let response = common::get(
        app,
        &format!("/api/v1/messages/{r1}/siblings"),
        Some(&token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = common::body_json(response).await;
    let siblings = json["data"].as_array().unwrap();
    assert_eq!(siblings.len(), 2);
    assert!(siblings.iter().any(|s| s["id"] == r1));
}

// ---------------------------------------------------------------------------
// Regeneration signal (no content)
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_branch_without_content_is_pure_signal(pool: PgPool) {
    let (token, _) = common::register(&pool, "regen@example.com").await;
    let conversation_id = common::create_conversation(&pool, &token).await;
    let parent = common::send_message(&pool, &token, conversation_id, "question", None).await;

    let app = common::build_test_app(pool.clone());
    let response = common::post_json(
        app,
        &format!("/api/v1/messages/{parent}/branch"),
        Some(&token),
        serde_json::json!({}),
    )
    .await;

    // The parent id comes back unchanged and nothing was created.
    assert_eq!(response.status(), StatusCode::OK);
    let json = common::body_json(response).await;
    assert_eq!(json["data"], parent);

    let app = common::build_test_app(pool);
    let response = common::get(
        app,
        &format!("/api/v1/conversations/{conversation_id}/messages/branches"),
        Some(&token),
    )
    .await;
    let forest = common::body_json(response).await;
    assert_eq!(forest["data"].as_array().unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// Branch switching
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_switch_branch_changes_transcript(pool: PgPool) {
    let (token, _) = common::register(&pool, "switch@example.com").await;
    let conversation_id = common::create_conversation(&pool, &token).await;
    let parent = common::send_message(&pool, &token, conversation_id, "question", None).await;

    let first = common::send_message(
        &pool,
        &token,
        conversation_id,
        "first answer path",
        Some(parent),
    )
    .await;
    let second = common::send_message(
        &pool,
        &token,
        conversation_id,
        "second answer path",
        Some(parent),
    )
    .await;

    // The transcript follows the newest branch.
    let app = common::build_test_app(pool.clone());
    let response = common::get(
        app,
        &format!("/api/v1/conversations/{conversation_id}/messages"),
        Some(&token),
    )
    .await;
    let transcript = common::body_json(response).await;
    let ids: Vec<i64> = transcript["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_i64().unwrap())
        .collect();
    assert!(ids.contains(&second));
    assert!(!ids.contains(&first));

    // Switch back to the first branch.
    let app = common::build_test_app(pool.clone());
    let response = common::post_json(
        app,
        &format!("/api/v1/messages/{first}/switch-branch"),
        Some(&token),
        serde_json::json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = common::body_json(response).await;
    assert_eq!(json["data"], first);

    let app = common::build_test_app(pool);
    let response = common::get(
        app,
        &format!("/api/v1/conversations/{conversation_id}/messages"),
        Some(&token),
    )
    .await;
    let transcript = common::body_json(response).await;
    let ids: Vec<i64> = transcript["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_i64().unwrap())
        .collect();
    assert!(ids.contains(&first));
    assert!(!ids.contains(&second));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_switch_branch_unknown_message_404(pool: PgPool) {
    let (token, _) = common::register(&pool, "switch404@example.com").await;

    let app = common::build_test_app(pool);
    let response = common::post_json(
        app,
        "/api/v1/messages/424242/switch-branch",
        Some(&token),
        serde_json::json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Access control
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_switch_branch_on_foreign_conversation_forbidden(pool: PgPool) {
    let (owner_token, _) = common::register(&pool, "owner@example.com").await;
    let conversation_id = common::create_conversation(&pool, &owner_token).await;
    let message = common::send_message(&pool, &owner_token, conversation_id, "mine", None).await;

    let (intruder_token, _) = common::register(&pool, "intruder@example.com").await;

    let app = common::build_test_app(pool);
    let response = common::post_json(
        app,
        &format!("/api/v1/messages/{message}/switch-branch"),
        Some(&intruder_token),
        serde_json::json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
