//! Typed store failures that callers map to something other than a 500

/// Store failures that carry meaning for the caller.
///
/// Backends return these wrapped in `anyhow::Error`; use
/// `err.downcast_ref::<StoreError>()` to recognise them.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A user with this (normalized) email already exists
    #[error("user with email {0} already exists")]
    DuplicateEmail(String),
}
