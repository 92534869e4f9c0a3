//! Shared error and result types for Refuge.
//!
//! One error enum covers the whole pipeline. Failures before a row is
//! persisted surface to the caller; failures after persistence are recovered
//! locally by the stage that hit them and only logged.

use thiserror::Error;

/// Errors produced by the Refuge pipeline
#[derive(Debug, Error)]
pub enum RefugeError {
    /// Caller-correctable input problem (bad id, missing field, depth limit)
    #[error("validation error: {0}")]
    Validation(String),

    /// The light moderation gate refused the submission outright.
    /// Nothing was persisted and nothing was broadcast.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// Caller is not the owner of the content it tried to mutate
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Content or parent content does not exist (or is soft-removed)
    #[error("not found: {0}")]
    NotFound(String),

    /// Key or cipher failure. Never partially applied - an encrypt/decrypt
    /// error aborts the whole operation.
    #[error("encryption error: {0}")]
    Encryption(String),

    /// External classifier unreachable or out of contract. Contained inside
    /// the heavy worker pool; end users never see this variant.
    #[error("classifier unavailable: {0}")]
    Upstream(String),

    /// MongoDB failure
    #[error("database error: {0}")]
    Database(String),

    /// Anything else
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, RefugeError>;
