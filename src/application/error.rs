//! Application-level errors (wraps domain and storage errors)

use thiserror::Error;

use crate::domain::{DomainError, NodeId};
use crate::infrastructure::StorageError;

/// Application errors wrap domain errors and add the failing operation.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("storage failure in {operation}{}", .id.map(|id| format!(" (node {id})")).unwrap_or_default())]
    Storage {
        operation: &'static str,
        id: Option<NodeId>,
        #[source]
        source: StorageError,
    },

    #[error("hierarchy store is closed")]
    Closed,

    #[error("config error: {message}")]
    Config { message: String },
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
