//! Authentication module: password credentials, demo identity, JWT sessions
//!
//! Provides:
//! - JWT token encoding/decoding (`jwt` submodule)
//! - Bearer-token middleware (`middleware`) and the `AuthUser` extractor

pub mod extractor;
pub mod jwt;
pub mod middleware;
