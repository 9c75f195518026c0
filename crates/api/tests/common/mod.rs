//! Shared helpers for HTTP-level integration tests.
//!
//! Builds the full application router with the production middleware stack
//! (CORS, request ID, timeout, tracing, panic recovery) and provides
//! request/response helpers plus fixture builders that go through the real
//! HTTP surface.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;

use tangent_api::auth::jwt::JwtConfig;
use tangent_api::config::ServerConfig;
use tangent_api::router::build_app_router;
use tangent_api::state::AppState;
use tangent_core::types::DbId;

/// Build a test `ServerConfig` with safe defaults and a fixed JWT secret.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "integration-test-secret".to_string(),
            access_token_expiry_mins: 60,
        },
    }
}

/// Build the full application router with all middleware layers, using the
/// given database pool. Mirrors the router construction in `main.rs`.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

async fn send(
    app: Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str, token: Option<&str>) -> Response {
    send(app, "GET", uri, token, None).await
}

pub async fn post_json(app: Router, uri: &str, token: Option<&str>, body: Value) -> Response {
    send(app, "POST", uri, token, Some(body)).await
}

pub async fn put_json(app: Router, uri: &str, token: Option<&str>, body: Value) -> Response {
    send(app, "PUT", uri, token, Some(body)).await
}

pub async fn patch_json(app: Router, uri: &str, token: Option<&str>, body: Value) -> Response {
    send(app, "PATCH", uri, token, Some(body)).await
}

pub async fn delete(app: Router, uri: &str, token: Option<&str>) -> Response {
    send(app, "DELETE", uri, token, None).await
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Fixtures (built through the HTTP surface)
// ---------------------------------------------------------------------------

/// Register a user and return `(access_token, user_id)`.
pub async fn register(pool: &PgPool, email: &str) -> (String, DbId) {
    let app = build_test_app(pool.clone());
    let response = post_json(
        app,
        "/api/v1/auth/register",
        None,
        serde_json::json!({ "email": email, "password": "super-secret-pw" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    let token = json["access_token"].as_str().unwrap().to_string();
    let user_id = json["user"]["id"].as_i64().unwrap();
    (token, user_id)
}

/// Create a conversation and return its id.
pub async fn create_conversation(pool: &PgPool, token: &str) -> DbId {
    let app = build_test_app(pool.clone());
    let response = post_json(
        app,
        "/api/v1/conversations",
        Some(token),
        serde_json::json!({ "title": "test conversation" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    json["data"]["id"].as_i64().unwrap()
}

/// Send a user message and return the new message id.
pub async fn send_message(
    pool: &PgPool,
    token: &str,
    conversation_id: DbId,
    content: &str,
    parent_id: Option<DbId>,
) -> DbId {
    let app = build_test_app(pool.clone());
    let response = post_json(
        app,
        &format!("/api/v1/conversations/{conversation_id}/messages"),
        Some(token),
        serde_json::json!({ "content": content, "parent_id": parent_id }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    json["data"].as_i64().unwrap()
}

/// Create an assistant placeholder and return the new message id.
pub async fn create_assistant(
    pool: &PgPool,
    token: &str,
    conversation_id: DbId,
    parent_id: DbId,
) -> DbId {
    let app = build_test_app(pool.clone());
    let response = post_json(
        app,
        &format!("/api/v1/conversations/{conversation_id}/messages/assistant"),
        Some(token),
        serde_json::json!({
            "parent_id": parent_id,
            "model": "gpt-test",
            "model_provider": "testing",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    json["data"].as_i64().unwrap()
}
