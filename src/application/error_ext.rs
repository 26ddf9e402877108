//! Error conversion helpers for repository calls
//!
//! Attaches the operation name and offending id to storage failures, and
//! lifts the storage conditions that carry domain meaning into domain errors.

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{DomainError, NodeId};
use crate::infrastructure::{StorageError, StorageResult};

/// Extension trait for converting `StorageResult` to `ApplicationResult` with context.
pub trait StorageResultExt<T> {
    /// # Example
    /// ```ignore
    /// uow.insert(&node).in_operation("add_root", id)?;
    /// ```
    fn in_operation(self, operation: &'static str, id: NodeId) -> ApplicationResult<T>;

    /// Same as `in_operation` for calls not tied to one node.
    fn in_store_operation(self, operation: &'static str) -> ApplicationResult<T>;
}

impl<T> StorageResultExt<T> for StorageResult<T> {
    fn in_operation(self, operation: &'static str, id: NodeId) -> ApplicationResult<T> {
        self.map_err(|e| lift(e, operation, Some(id)))
    }

    fn in_store_operation(self, operation: &'static str) -> ApplicationResult<T> {
        self.map_err(|e| lift(e, operation, None))
    }
}

fn lift(error: StorageError, operation: &'static str, id: Option<NodeId>) -> ApplicationError {
    match error {
        StorageError::NotFound(missing) => DomainError::NotFound(missing).into(),
        StorageError::Duplicate(existing) => DomainError::AlreadyExists(existing).into(),
        StorageError::Closed => ApplicationError::Closed,
        source => ApplicationError::Storage {
            operation,
            id,
            source,
        },
    }
}
