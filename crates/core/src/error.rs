//! Error types shared by every domain crate.

use thiserror::Error;

/// Result alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

/// Deterministic business-rule failure.
///
/// Operational failures (I/O, storage, transport) live in the layer that
/// owns them; this enum only covers outcomes a caller can act on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Input that fails a field- or state-level check.
    #[error("validation error: {0}")]
    Validation(String),

    /// A rule that must always hold across fields or lifecycle states was
    /// broken.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// An identifier could not be parsed.
    #[error("invalid id: {0}")]
    InvalidId(String),

    #[error("not found")]
    NotFound,

    /// The operation raced a state change.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}
