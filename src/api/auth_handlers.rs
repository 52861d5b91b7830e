//! Authentication route handlers: signup, password login, demo login, JWT.
//!
//! Endpoints:
//! - `POST /api/auth/signup`  - Create a password account
//! - `POST /api/auth/login`   - Email/password login
//! - `POST /api/auth/demo`    - Token for the shared demo identity
//! - `GET  /api/auth/me`      - Returns the authenticated caller (protected)
//! - `POST /api/auth/refresh` - Issues a new JWT from a still-valid token (protected)

use crate::api::handlers::{ApiJson, AppError, TaskboardState};
use crate::auth::extractor::AuthUser;
use crate::auth::jwt::{encode_demo_jwt, encode_jwt};
use crate::store::models::UserDoc;
use crate::store::StoreError;
use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Request / Response types
// ============================================================================

/// Request body for POST /api/auth/login
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Request body for POST /api/auth/signup
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Response for POST /api/auth/signup
#[derive(Debug, Serialize, Deserialize)]
pub struct SignupResponse {
    pub message: String,
    pub user: UserResponse,
}

/// Response for login, demo login and refresh
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthTokenResponse {
    pub token: String,
    pub user: UserResponse,
}

/// Public user info (safe to send to client)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub demo: bool,
}

impl From<UserDoc> for UserResponse {
    fn from(u: UserDoc) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            demo: false,
        }
    }
}

impl From<&AuthUser> for UserResponse {
    fn from(u: &AuthUser) -> Self {
        Self {
            id: u.user_id,
            name: u.name.clone(),
            email: u.email.clone(),
            demo: u.demo,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/auth/signup - Create a new password-authenticated account.
///
/// Duplicate emails are rejected with 409 and the existing account is left
/// untouched. Does not log the caller in.
pub async fn signup(
    State(state): State<TaskboardState>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), AppError> {
    let auth_config = &state.auth_config;

    // 1. Check registration is enabled
    if !auth_config.allow_registration {
        return Err(AppError::BadRequest("Registration is disabled".to_string()));
    }

    // 2. Validate input fields
    let failures = validate_signup(&req);
    if !failures.is_empty() {
        return Err(AppError::Validation(failures));
    }
    let email = normalize_email(&req.email);

    // 3. Check email uniqueness
    if state.store.get_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict(
            "User with this email already exists".to_string(),
        ));
    }

    // 4. Hash password with bcrypt
    let password_hash = bcrypt::hash(&req.password, auth_config.bcrypt_cost)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to hash password: {}", e)))?;

    // 5. Persist
    let now = Utc::now();
    let user = UserDoc {
        id: Uuid::new_v4(),
        name: req.name.trim().to_string(),
        email,
        password_hash,
        created_at: now,
        updated_at: now,
    };
    // A concurrent signup can win between the check above and this insert
    if let Err(e) = state.store.create_user(&user).await {
        return Err(match e.downcast_ref::<StoreError>() {
            Some(StoreError::DuplicateEmail(_)) => {
                AppError::Conflict("User with this email already exists".to_string())
            }
            None => AppError::Internal(e),
        });
    }

    tracing::info!(user_id = %user.id, "Registered new user");
    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "User created successfully".to_string(),
            user: UserResponse::from(user),
        }),
    ))
}

/// Emails are matched case-insensitively
fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Validate signup fields, collecting every failure.
fn validate_signup(req: &SignupRequest) -> Vec<String> {
    let mut failures = Vec::new();

    if req.name.trim().is_empty() {
        failures.push("Name is required".to_string());
    }

    // local@domain.tld
    let email = req.email.trim();
    let valid_email = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .rsplit_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if !valid_email {
        failures.push("Invalid email address".to_string());
    }

    if req.password.chars().count() < 8 {
        failures.push("Password must be at least 8 characters".to_string());
    }

    failures
}

/// POST /api/auth/login - Verify email/password and issue a JWT.
///
/// Security: error messages never reveal whether the email exists or not.
pub async fn login(
    State(state): State<TaskboardState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<AuthTokenResponse>, AppError> {
    let auth_config = &state.auth_config;

    // Generic error to prevent user enumeration
    let invalid_credentials = || AppError::Unauthorized("Invalid email or password".to_string());

    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(invalid_credentials());
    }

    let user = state
        .store
        .get_user_by_email(&normalize_email(&req.email))
        .await?
        .ok_or_else(invalid_credentials)?;

    let password_ok = bcrypt::verify(&req.password, &user.password_hash).unwrap_or(false);
    if !password_ok {
        return Err(invalid_credentials());
    }

    let token = encode_jwt(
        user.id,
        &user.email,
        &user.name,
        &auth_config.jwt_secret,
        auth_config.jwt_expiry_secs,
    )
    .map_err(AppError::Internal)?;

    tracing::debug!(user_id = %user.id, "Password login");
    Ok(Json(AuthTokenResponse {
        token,
        user: UserResponse::from(user),
    }))
}

/// POST /api/auth/demo - Issue a token for the shared demo identity.
pub async fn demo_login(
    State(state): State<TaskboardState>,
) -> Result<Json<AuthTokenResponse>, AppError> {
    let auth_config = &state.auth_config;
    if !auth_config.allow_demo {
        return Err(AppError::BadRequest("Demo access is disabled".to_string()));
    }

    let token = encode_demo_jwt(&auth_config.jwt_secret, auth_config.jwt_expiry_secs)
        .map_err(AppError::Internal)?;

    Ok(Json(AuthTokenResponse {
        token,
        user: UserResponse {
            id: crate::auth::jwt::demo_user_id(),
            name: crate::auth::jwt::DEMO_NAME.to_string(),
            email: crate::auth::jwt::DEMO_EMAIL.to_string(),
            demo: true,
        },
    }))
}

/// GET /api/auth/me - Returns the authenticated caller.
///
/// Password users are re-read from the store so a deleted account is
/// reported as 404; the demo identity is answered from its claims.
pub async fn get_me(
    State(state): State<TaskboardState>,
    user: AuthUser,
) -> Result<Json<UserResponse>, AppError> {
    if user.demo {
        return Ok(Json(UserResponse::from(&user)));
    }

    let stored = state
        .store
        .get_user(user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(UserResponse::from(stored)))
}

/// POST /api/auth/refresh - Issue a new JWT from a still-valid token.
pub async fn refresh_token(
    State(state): State<TaskboardState>,
    user: AuthUser,
) -> Result<Json<AuthTokenResponse>, AppError> {
    let auth_config = &state.auth_config;

    let token = if user.demo {
        encode_demo_jwt(&auth_config.jwt_secret, auth_config.jwt_expiry_secs)
    } else {
        encode_jwt(
            user.user_id,
            &user.email,
            &user.name,
            &auth_config.jwt_secret,
            auth_config.jwt_expiry_secs,
        )
    }
    .map_err(AppError::Internal)?;

    Ok(Json(AuthTokenResponse {
        token,
        user: UserResponse::from(&user),
    }))
}

// ============================================================================
// Tests
// ============================================================================
