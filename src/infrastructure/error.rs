//! Storage-level errors reported by repository collaborators

use thiserror::Error;

use crate::domain::NodeId;

/// Errors a node repository can report.
///
/// `NotFound` is kept apart from real failures so callers can tell an
/// absent node from a broken store.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("node not found: {0}")]
    NotFound(NodeId),

    #[error("node already stored: {0}")]
    Duplicate(NodeId),

    #[error("integrity violation: {message}")]
    Integrity { message: String },

    #[error("I/O error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization failed: {message}")]
    Serialization { message: String },

    #[error("store unreachable: {descriptor}: {reason}")]
    Unreachable { descriptor: String, reason: String },

    #[error("invalid store descriptor: {0:?}")]
    InvalidDescriptor(String),

    #[error("store is closed")]
    Closed,
}

impl StorageError {
    /// Create an I/O error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn integrity(message: impl Into<String>) -> Self {
        Self::Integrity {
            message: message.into(),
        }
    }
}

/// Result type for repository operations.
pub type StorageResult<T> = Result<T, StorageError>;
