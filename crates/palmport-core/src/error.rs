//! Error types for PalmPort domain operations.

use crate::ids::IdError;

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, CommerceError>;

/// Errors raised while building or mutating domain values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommerceError {
    /// A required field is missing or malformed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A status string does not belong to its enumerated set.
    #[error("invalid {kind} status: {value}")]
    InvalidStatus {
        /// Which status axis was being parsed ("delivery" or "payment").
        kind: &'static str,
        /// The rejected value.
        value: String,
    },

    /// A status change is not permitted by the active transition policy.
    #[error("cannot move {kind} status from {from} to {to}")]
    InvalidTransition {
        /// Which status axis was being changed.
        kind: &'static str,
        /// Current status.
        from: String,
        /// Requested status.
        to: String,
    },

    /// An unknown account role.
    #[error("invalid role: {0}")]
    InvalidRole(String),

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),
}
