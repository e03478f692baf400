//! Error taxonomy for lifecycle operations
//!
//! Every gate violation is synchronous and local: a rejected operation
//! leaves the entity unchanged, because gates run against a clone that is
//! only committed by compare-and-swap after all checks pass.

use thiserror::Error;

use crate::core::identity::EntityId;

/// Errors returned by lifecycle and workflow operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Entity not found: {id}")]
    NotFound { id: String },

    #[error("Invalid status transition: {from} → {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Precondition failed: {reason}")]
    PreconditionFailed { reason: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Not authorized: {action} requires an elevated capability")]
    Unauthorized { action: String },

    #[error("Concurrent modification of {id}; reload and retry")]
    Conflict { id: EntityId },

    #[error("Failed to load snapshot: {message}")]
    Snapshot { message: String },
}

impl CoreError {
    pub fn not_found(id: impl std::fmt::Display) -> Self {
        CoreError::NotFound { id: id.to_string() }
    }

    pub fn invalid_transition(
        from: impl std::fmt::Display,
        to: impl std::fmt::Display,
    ) -> Self {
        CoreError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub fn precondition(reason: impl Into<String>) -> Self {
        CoreError::PreconditionFailed {
            reason: reason.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::ValidationError {
            message: message.into(),
        }
    }
}
