//! Error types for the negotiation harness

use thiserror::Error;

/// Main error type for negotiation handling
#[derive(Error, Debug)]
pub enum NegotiationError {
    // Lookup errors
    #[error("{operation}: contract negotiation not found for id: {id}")]
    NotFound { operation: &'static str, id: String },

    // Message errors
    #[error("{operation}: required property missing: {field}")]
    RequiredFieldMissing {
        operation: &'static str,
        field: String,
    },

    #[error("{operation}: invalid property {field}: {reason}")]
    InvalidProperty {
        operation: &'static str,
        field: String,
        reason: String,
    },

    // State machine errors
    #[error("{operation}: illegal transition for negotiation {id}: {from} -> {to}")]
    IllegalTransition {
        operation: &'static str,
        id: String,
        from: String,
        to: String,
    },

    #[error("Unknown negotiation state: {0}")]
    UnknownState(String),

    #[error("{operation}: listener failed on {event} for negotiation {id}: {reason}")]
    NotificationFailed {
        operation: &'static str,
        id: String,
        event: &'static str,
        reason: String,
    },

    // Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Scenario error: {0}")]
    Scenario(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl NegotiationError {
    /// Attach the operation name to errors raised below the manager
    /// (message accessor, state machine, listener fan-out).
    pub fn in_operation(self, operation: &'static str) -> Self {
        use NegotiationError::*;

        match self {
            RequiredFieldMissing { field, .. } => RequiredFieldMissing { operation, field },
            NotFound { id, .. } => NotFound { operation, id },
            InvalidProperty { field, reason, .. } => InvalidProperty {
                operation,
                field,
                reason,
            },
            IllegalTransition { id, from, to, .. } => IllegalTransition {
                operation,
                id,
                from,
                to,
            },
            NotificationFailed {
                id, event, reason, ..
            } => NotificationFailed {
                operation,
                id,
                event,
                reason,
            },
            other => other,
        }
    }
}

/// Error raised by a negotiation listener callback
#[derive(Error, Debug)]
#[error("{0}")]
pub struct ListenerError(pub String);

/// Result type alias for negotiation operations
pub type Result<T> = std::result::Result<T, NegotiationError>;
