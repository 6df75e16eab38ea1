// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Tutorlane booking core.

use thiserror::Error;
use uuid::Uuid;

/// The primary error type used across the booking engine, its storage layer
/// and the payment collaborators.
///
/// Variants split into business-rule violations (returned to the caller as
/// structured client errors) and infrastructure failures (surfaced as opaque
/// server errors). See [`TutorError::is_client_error`].
#[derive(Debug, Error)]
pub enum TutorError {
    /// The requested availability slot does not exist.
    #[error("availability slot not found: {0}")]
    SlotNotFound(Uuid),

    /// The slot has no remaining capacity.
    #[error("this time slot is no longer available")]
    SlotFull,

    /// The student's credit balance does not cover the charge.
    #[error("insufficient credit balance")]
    InsufficientCredit,

    /// The teacher's earnings balance does not cover the payout.
    #[error("insufficient earnings balance")]
    InsufficientBalance,

    /// A referenced record does not exist (or is not visible to the caller).
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A state machine refused the requested transition.
    #[error("cannot move {entity} from `{from}` to `{to}`")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    /// Malformed or out-of-range input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The authenticated principal may not perform this operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Transport or protocol failure talking to a payment provider.
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The payment provider answered but declined the request.
    #[error("provider rejected request: {0}")]
    ProviderRejected(String),

    /// Exchange-rate lookup or currency conversion failed.
    #[error("currency conversion failed: {0}")]
    Conversion(String),

    /// Notification delivery failed.
    #[error("notification error: {0}")]
    Notification(String),

    /// Configuration errors (missing credentials, invalid values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TutorError {
    /// Shorthand for [`TutorError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Shorthand for [`TutorError::InvalidTransition`].
    pub fn transition(
        entity: &'static str,
        from: impl ToString,
        to: impl ToString,
    ) -> Self {
        Self::InvalidTransition {
            entity,
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Whether the error is a business-rule violation the caller can act on.
    ///
    /// Everything else is infrastructure and must not leak details.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::SlotNotFound(_)
                | Self::SlotFull
                | Self::InsufficientCredit
                | Self::InsufficientBalance
                | Self::NotFound { .. }
                | Self::InvalidTransition { .. }
                | Self::InvalidInput(_)
                | Self::Forbidden(_)
        )
    }
}
