//! Service-boundary error type.
//!
//! Everything below the service layer returns `anyhow::Result`. At the
//! boundary, failures collapse into two outcomes: [`ServiceError::Invalid`]
//! for caller input that failed validation, and [`ServiceError::Internal`]
//! for everything else (engine unreachable, timeout, rejected request,
//! malformed response). Internal errors carry only a fixed per-operation
//! message; the underlying cause is logged, never returned.

use thiserror::Error;

/// The operation that failed, used to pick the public failure message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Search,
    Upsert,
    Remove,
    RemoveAll,
}

impl Operation {
    pub fn failure_message(self) -> &'static str {
        match self {
            Operation::Search => "Search operation failed. Please try again later.",
            Operation::Upsert => "Failed to index document. Please try again later.",
            Operation::Remove => "Failed to remove document. Please try again later.",
            Operation::RemoveAll => "Failed to delete all documents. Please try again later.",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Search => "search",
            Operation::Upsert => "upsert",
            Operation::Remove => "remove",
            Operation::RemoveAll => "remove_all",
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Caller input rejected before reaching the engine.
    #[error("{0}")]
    Invalid(String),
    /// Opaque failure of an operation.
    #[error("{}", .0.failure_message())]
    Internal(Operation),
}

impl ServiceError {
    /// Log `err` with full context and return the opaque error for `op`.
    pub fn internal(op: Operation, err: anyhow::Error) -> Self {
        tracing::error!(operation = op.as_str(), error = %format!("{:#}", err), "operation failed");
        ServiceError::Internal(op)
    }

    pub fn invalid(err: anyhow::Error) -> Self {
        ServiceError::Invalid(err.to_string())
    }
}
