//! Domain error model.

use thiserror::Error;

/// Domain-level error.
///
/// Raised only when parsing values that cross the store boundary as plain
/// strings. Collaborator failures have their own error types in `jobpulse-infra`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// An identifier was invalid (e.g. empty).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A status string did not name any known status.
    #[error("unknown {kind} status: {value}")]
    UnknownStatus { kind: &'static str, value: String },
}

impl DomainError {
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn unknown_status(kind: &'static str, value: impl Into<String>) -> Self {
        Self::UnknownStatus {
            kind,
            value: value.into(),
        }
    }
}
