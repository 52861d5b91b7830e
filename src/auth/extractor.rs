//! AuthUser extractor for Axum handlers.
//!
//! Extracts the authenticated caller from request extensions
//! (populated by the `require_auth` middleware).

use crate::api::handlers::{AppError, TaskboardState};
use crate::auth::jwt::Claims;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

/// Authenticated caller identity extracted from JWT claims.
///
/// `user_id` is the owner key for every project and task.
///
/// ```rust,ignore
/// async fn my_handler(user: AuthUser) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub demo: bool,
}

impl AuthUser {
    /// Create from JWT claims
    fn from_claims(claims: &Claims) -> Result<Self, AppError> {
        let user_id: Uuid = claims
            .sub
            .parse()
            .map_err(|_| AppError::Unauthorized("Invalid user ID in token".to_string()))?;

        Ok(Self {
            user_id,
            email: claims.email.clone(),
            name: claims.name.clone(),
            demo: claims.demo,
        })
    }
}

impl FromRequestParts<TaskboardState> for AuthUser {
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &TaskboardState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        async {
            let claims = parts
                .extensions
                .get::<Claims>()
                .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

            Self::from_claims(claims)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(sub: &str, demo: bool) -> Claims {
        Claims {
            sub: sub.to_string(),
            email: "ann@example.com".to_string(),
            name: "Ann".to_string(),
            demo,
            iat: 0,
            exp: 0,
        }
    }

    #[test]
    fn test_auth_user_from_valid_claims() {
        let user_id = Uuid::new_v4();
        let user = AuthUser::from_claims(&claims(&user_id.to_string(), false)).unwrap();
        assert_eq!(user.user_id, user_id);
        assert_eq!(user.email, "ann@example.com");
        assert_eq!(user.name, "Ann");
        assert!(!user.demo);
    }

    #[test]
    fn test_auth_user_keeps_demo_flag() {
        let id = crate::auth::jwt::demo_user_id();
        let user = AuthUser::from_claims(&claims(&id.to_string(), true)).unwrap();
        assert!(user.demo);
        assert_eq!(user.user_id, id);
    }

    #[test]
    fn test_auth_user_from_invalid_uuid() {
        assert!(AuthUser::from_claims(&claims("not-a-uuid", false)).is_err());
    }
}
