//! Test helper factories and mock state builders
//!
//! Provides convenience functions for building server state over the
//! in-memory store, issuing bearer tokens, and driving the router in-process.
#![allow(dead_code)]

use crate::api::handlers::{ServerState, TaskboardState};
use crate::api::routes::create_router;
use crate::auth::jwt::encode_jwt;
use crate::store::{DocumentStore, MemoryStore};
use crate::AuthConfig;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

/// JWT secret shared by all test configs
pub const TEST_SECRET: &str = "test-secret-key-minimum-32-chars!!";

// ============================================================================
// Mock state builders
// ============================================================================

/// Create a test AuthConfig.
///
/// Uses a fixed JWT secret and the minimum bcrypt cost so signup/login tests
/// stay fast.
pub fn test_auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: TEST_SECRET.to_string(),
        jwt_expiry_secs: 3600,
        allow_registration: true,
        allow_demo: true,
        bcrypt_cost: 4,
    }
}

/// Create server state over an empty in-memory store
pub fn mock_server_state(auth_config: AuthConfig) -> TaskboardState {
    mock_server_state_with(Arc::new(MemoryStore::new()), auth_config)
}

/// Create server state over the given store
pub fn mock_server_state_with(
    store: Arc<dyn DocumentStore>,
    auth_config: AuthConfig,
) -> TaskboardState {
    Arc::new(ServerState::new(store, auth_config))
}

/// Full router over an empty in-memory store, plus its state for inspection
pub fn test_app() -> (Router, TaskboardState) {
    let state = mock_server_state(test_auth_config());
    (create_router(state.clone()), state)
}

/// Generate a valid Bearer header value for `user_id`.
///
/// Uses the same secret as `test_auth_config()`.
pub fn test_bearer_token(user_id: Uuid) -> String {
    let token = encode_jwt(user_id, "test@example.com", "Test User", TEST_SECRET, 3600)
        .expect("encode test token");
    format!("Bearer {}", token)
}

// ============================================================================
// Request helpers
// ============================================================================

/// Send one request through the router and decode the JSON body
/// (`Value::Null` for an empty body).
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    auth: Option<&str>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        req = req.header("authorization", auth);
    }
    let req = match body {
        Some(json) => req
            .header("content-type", "application/json")
            .body(Body::from(json.to_string())),
        None => req.body(Body::empty()),
    }
    .expect("build request");

    let resp = app.clone().oneshot(req).await.expect("router is infallible");
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}
