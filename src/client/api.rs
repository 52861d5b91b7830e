//! HTTP client for the Taskboard REST API
//!
//! Thin wrapper over reqwest: joins paths onto the base URL, attaches the
//! bearer token, and turns `{"error": ...}` bodies into [`ClientError::Api`].

use crate::api::auth_handlers::{
    AuthTokenResponse, LoginRequest, SignupRequest, SignupResponse, UserResponse,
};
use crate::api::TaskListQuery;
use crate::board::{
    CreateProjectRequest, CreateTaskRequest, Project, Task, UpdateProjectRequest,
    UpdateTaskRequest,
};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Errors surfaced by [`ApiClient`] and the client stores
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Connection, timeout or body decoding failure
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("{message} (HTTP {status})")]
    Api { status: u16, message: String },

    /// A store operation referenced an entry missing from the local cache
    #[error("{0} not found")]
    NotCached(String),
}

impl ClientError {
    /// HTTP status for API errors
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Deserialize)]
struct SuccessBody {
    #[allow(dead_code)]
    success: bool,
}

/// Taskboard API client.
///
/// Cheap to clone; clones share the HTTP connection pool and the session
/// token, so a login through one handle authenticates every store built on it.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: Arc::new(RwLock::new(None)),
        })
    }

    /// Start with an existing session token
    pub fn with_token(self, token: impl Into<String>) -> Self {
        Self {
            token: Arc::new(RwLock::new(Some(token.into()))),
            ..self
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    pub async fn set_token(&self, token: Option<String>) {
        *self.token.write().await = token;
    }

    // ========================================================================
    // Auth
    // ========================================================================

    /// Register an account. Does not start a session.
    pub async fn signup(&self, req: &SignupRequest) -> ClientResult<SignupResponse> {
        self.send(Method::POST, "/api/auth/signup", Some(req)).await
    }

    /// Log in with credentials and keep the returned token
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<AuthTokenResponse> {
        let req = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let resp: AuthTokenResponse = self.send(Method::POST, "/api/auth/login", Some(&req)).await?;
        self.set_token(Some(resp.token.clone())).await;
        Ok(resp)
    }

    /// Start a demo session and keep the returned token
    pub async fn demo_login(&self) -> ClientResult<AuthTokenResponse> {
        let resp: AuthTokenResponse = self
            .send(Method::POST, "/api/auth/demo", None::<&()>)
            .await?;
        self.set_token(Some(resp.token.clone())).await;
        Ok(resp)
    }

    pub async fn me(&self) -> ClientResult<UserResponse> {
        self.send(Method::GET, "/api/auth/me", None::<&()>).await
    }

    /// Exchange the current token for a fresh one
    pub async fn refresh(&self) -> ClientResult<AuthTokenResponse> {
        let resp: AuthTokenResponse = self
            .send(Method::POST, "/api/auth/refresh", None::<&()>)
            .await?;
        self.set_token(Some(resp.token.clone())).await;
        Ok(resp)
    }

    // ========================================================================
    // Projects
    // ========================================================================

    pub async fn list_projects(&self) -> ClientResult<Vec<Project>> {
        self.send(Method::GET, "/api/projects", None::<&()>).await
    }

    pub async fn get_project(&self, id: &str) -> ClientResult<Project> {
        self.send(Method::GET, &format!("/api/projects/{}", id), None::<&()>)
            .await
    }

    pub async fn create_project(&self, req: &CreateProjectRequest) -> ClientResult<Project> {
        self.send(Method::POST, "/api/projects", Some(req)).await
    }

    pub async fn update_project(
        &self,
        id: &str,
        req: &UpdateProjectRequest,
    ) -> ClientResult<Project> {
        self.send(Method::PUT, &format!("/api/projects/{}", id), Some(req))
            .await
    }

    pub async fn delete_project(&self, id: &str) -> ClientResult<()> {
        let _: SuccessBody = self
            .send(Method::DELETE, &format!("/api/projects/{}", id), None::<&()>)
            .await?;
        Ok(())
    }

    // ========================================================================
    // Tasks
    // ========================================================================

    pub async fn list_tasks(&self, query: &TaskListQuery) -> ClientResult<Vec<Task>> {
        let req = self.request(Method::GET, "/api/tasks").await.query(query);
        Self::decode(req.send().await?).await
    }

    pub async fn get_task(&self, id: &str) -> ClientResult<Task> {
        self.send(Method::GET, &format!("/api/tasks/{}", id), None::<&()>)
            .await
    }

    pub async fn create_task(&self, req: &CreateTaskRequest) -> ClientResult<Task> {
        self.send(Method::POST, "/api/tasks", Some(req)).await
    }

    pub async fn update_task(&self, id: &str, req: &UpdateTaskRequest) -> ClientResult<Task> {
        self.send(Method::PUT, &format!("/api/tasks/{}", id), Some(req))
            .await
    }

    pub async fn delete_task(&self, id: &str) -> ClientResult<()> {
        let _: SuccessBody = self
            .send(Method::DELETE, &format!("/api/tasks/{}", id), None::<&()>)
            .await?;
        Ok(())
    }

    // ========================================================================
    // Plumbing
    // ========================================================================

    async fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let req = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        match self.token.read().await.as_deref() {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut req = self.request(method, path).await;
        if let Some(body) = body {
            req = req.json(body);
        }
        Self::decode(req.send().await?).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ErrorBody>(&body) {
                Ok(err) => err.error,
                Err(_) if body.is_empty() => status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string(),
                Err(_) => body,
            };
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn user_json() -> serde_json::Value {
        json!({
            "id": "6c1e4f0a-0a8e-4a43-9a57-7a8b3f8e0b11",
            "name": "Ada",
            "email": "ada@example.com",
            "demo": false
        })
    }

    #[tokio::test]
    async fn test_login_stores_token_for_later_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"token": "tok-1", "user": user_json()})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/auth/me"))
            .and(header("authorization", "Bearer tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri()).unwrap();
        let resp = client.login("ada@example.com", "password1").await.unwrap();
        assert_eq!(resp.user.name, "Ada");
        assert_eq!(client.token().await.as_deref(), Some("tok-1"));

        // Clones share the session
        let me = client.clone().me().await.unwrap();
        assert_eq!(me.email, "ada@example.com");
    }

    #[tokio::test]
    async fn test_error_body_becomes_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(json!({"error": "Invalid email or password"})),
            )
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri()).unwrap();
        let err = client.login("x@example.com", "nope").await.unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.to_string(), "Invalid email or password (HTTP 401)");
        assert!(client.token().await.is_none());
    }

    #[tokio::test]
    async fn test_non_json_error_keeps_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/projects"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri()).unwrap();
        match client.list_projects().await.unwrap_err() {
            ClientError::Api { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_list_tasks_sends_filters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tasks"))
            .and(query_param("status", "done"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(&format!("{}/", server.uri()))
            .unwrap()
            .with_token("t");
        let query = TaskListQuery {
            status: Some("done".to_string()),
            ..Default::default()
        };
        assert!(client.list_tasks(&query).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transport_error() {
        // Nothing listens on port 9 (discard) in the test environment
        let client = ApiClient::new("http://127.0.0.1:9").unwrap();
        let err = client.list_projects().await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
        assert_eq!(err.status(), None);
    }
}
