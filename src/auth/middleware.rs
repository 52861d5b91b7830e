//! Auth middleware for Axum routes.
//!
//! Validates JWT Bearer tokens and injects Claims into request extensions.

use crate::api::handlers::{AppError, TaskboardState};
use crate::auth::jwt::decode_jwt;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

/// Middleware that requires a valid JWT Bearer token.
///
/// # Behavior
/// 1. Extract `Authorization: Bearer <token>` header → 401 if missing
/// 2. Validate JWT with the configured secret → 401 if invalid/expired
/// 3. Inject `Claims` into request extensions for downstream handlers
///
/// A rejected request never reaches the handler, so nothing is mutated.
pub async fn require_auth(
    State(state): State<TaskboardState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Invalid Authorization header format".to_string()))?;

    let claims = decode_jwt(token, &state.auth_config.jwt_secret).map_err(|e| {
        tracing::debug!("Rejected bearer token: {:#}", e);
        AppError::Unauthorized("Invalid or expired token".to_string())
    })?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

// ============================================================================
// Tests
// ============================================================================
