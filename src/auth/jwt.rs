//! JWT token encoding and decoding using HS256.
//!
//! The JWT carries the caller identity and is presented as
//! `Authorization: Bearer <token>` on every protected route.

use anyhow::{Context, Result};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Email of the credential-less demo identity
pub const DEMO_EMAIL: &str = "demo@example.com";
/// Display name of the demo identity
pub const DEMO_NAME: &str = "Demo User";

/// Deterministic UUID for the demo identity.
///
/// UUIDv5 of [`DEMO_EMAIL`] in the URL namespace, so it is stable across
/// restarts and deployments.
pub fn demo_user_id() -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, DEMO_EMAIL.as_bytes())
}

/// JWT claims payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - user UUID
    pub sub: String,
    /// User email
    pub email: String,
    /// User display name
    pub name: String,
    /// True for the demo identity
    #[serde(default)]
    pub demo: bool,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// Encode a JWT token for the given user.
///
/// Uses HS256 signing with the provided secret.
pub fn encode_jwt(
    user_id: Uuid,
    email: &str,
    name: &str,
    secret: &str,
    expiry_secs: u64,
) -> Result<String> {
    encode_claims(user_id, email, name, false, secret, expiry_secs)
}

/// Encode a JWT token for the demo identity.
pub fn encode_demo_jwt(secret: &str, expiry_secs: u64) -> Result<String> {
    encode_claims(demo_user_id(), DEMO_EMAIL, DEMO_NAME, true, secret, expiry_secs)
}

fn encode_claims(
    user_id: Uuid,
    email: &str,
    name: &str,
    demo: bool,
    secret: &str,
    expiry_secs: u64,
) -> Result<String> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        name: name.to_string(),
        demo,
        iat: now,
        exp: now.saturating_add(i64::try_from(expiry_secs).unwrap_or(i64::MAX)),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .context("Failed to encode JWT")
}

/// Decode and validate a JWT token.
///
/// Returns the claims if the token is valid, not expired, and
/// signed with the correct secret.
pub fn decode_jwt(token: &str, secret: &str) -> Result<Claims> {
    let token_data: TokenData<Claims> = decode(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .context("Failed to decode JWT")?;

    Ok(token_data.claims)
}

// ============================================================================
// Tests
// ============================================================================
