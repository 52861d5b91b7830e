//! Shared server state, health check and error handling

use crate::board::ReferenceSync;
use crate::store::DocumentStore;
use crate::AuthConfig;
use axum::{
    extract::{rejection::JsonRejection, FromRequest, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Shared server state
pub struct ServerState {
    /// Persistence adapter, constructed once at startup
    pub store: Arc<dyn DocumentStore>,
    /// Project/task reference synchronizer (owns the repair queue)
    pub references: Arc<ReferenceSync>,
    pub auth_config: AuthConfig,
    /// Pull a deleted project's id out of the owner's tasks
    pub cascade_project_delete: bool,
}

/// Shared taskboard state
pub type TaskboardState = Arc<ServerState>;

impl ServerState {
    pub fn new(store: Arc<dyn DocumentStore>, auth_config: AuthConfig) -> Self {
        Self {
            references: Arc::new(ReferenceSync::new(store.clone())),
            store,
            auth_config,
            cascade_project_delete: false,
        }
    }
}

// ============================================================================
// Health check
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub storage: StorageHealth,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StorageHealth {
    pub backend: String,
    pub status: String,
}

/// GET /health - 200 when the store answers, 503 otherwise
pub async fn health(State(state): State<TaskboardState>) -> (StatusCode, Json<HealthResponse>) {
    let store_ok = match state.store.health_check().await {
        Ok(ok) => ok,
        Err(e) => {
            tracing::warn!("Store health check failed: {:#}", e);
            false
        }
    };

    let http_status = if store_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        http_status,
        Json(HealthResponse {
            status: if store_ok { "ok" } else { "unhealthy" }.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            storage: StorageHealth {
                backend: state.store.backend_name().to_string(),
                status: if store_ok { "connected" } else { "disconnected" }.to_string(),
            },
        }),
    )
}

// ============================================================================
// Request helpers
// ============================================================================

/// JSON body extractor whose rejections render as `{"error": ...}` with 400
#[derive(FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Body returned by delete endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Parse a path identifier. Anything that is not a UUID cannot name a
/// stored document, so it is reported as not found.
pub fn parse_id(raw: &str, what: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(format!("{} not found", what)))
}

// ============================================================================
// Error handling
// ============================================================================

/// Application error type
#[derive(Debug)]
pub enum AppError {
    Internal(anyhow::Error),
    NotFound(String),
    BadRequest(String),
    /// Field-level validation failures, rendered with a `details` list
    Validation(Vec<String>),
    Unauthorized(String),
    Conflict(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message, details) = match self {
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::Validation(details) => (
                StatusCode::BAD_REQUEST,
                "Validation error".to_string(),
                Some(details),
            ),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, None),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg, None),
        };

        let body = match details {
            Some(details) => serde_json::json!({ "error": message, "details": details }),
            None => serde_json::json!({ "error": message }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{mock_server_state, test_auth_config};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_internal_error_is_opaque() {
        let resp = AppError::Internal(anyhow::anyhow!("bolt connection refused")).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(resp).await;
        assert_eq!(json["error"], "Internal server error");
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let cases = [
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (AppError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (AppError::Conflict("x".into()), StatusCode::CONFLICT),
        ];
        for (err, status) in cases {
            let resp = err.into_response();
            assert_eq!(resp.status(), status);
            assert_eq!(body_json(resp).await["error"], "x");
        }
    }

    #[tokio::test]
    async fn test_validation_error_lists_details() {
        let resp = AppError::Validation(vec!["Name is required".into()]).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["error"], "Validation error");
        assert_eq!(json["details"][0], "Name is required");
    }

    #[test]
    fn test_parse_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string(), "Task").unwrap(), id);
        assert!(matches!(
            parse_id("nope", "Task"),
            Err(AppError::NotFound(msg)) if msg == "Task not found"
        ));
    }

    #[tokio::test]
    async fn test_health_reports_storage() {
        let state = mock_server_state(test_auth_config());
        let app = Router::new()
            .route("/health", get(health))
            .with_state(state);

        let resp = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["storage"]["backend"], "memory");
    }
}
