//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::NodeId;

/// Domain errors represent hierarchy rule violations.
/// These are independent of storage concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("node not found: {0}")]
    NotFound(NodeId),

    #[error("node already exists: {0}")]
    AlreadyExists(NodeId),

    #[error("node {id} has {} children, delete them first or delete the subtree", children.len())]
    HasChildren { id: NodeId, children: Vec<NodeId> },

    #[error("multiple root candidates: {0:?}")]
    MultipleRoots(Vec<NodeId>),

    #[error("no root candidate in node set")]
    NoRoot,

    #[error("node {node} references parent {parent} which is not in the node set")]
    DanglingParent { node: NodeId, parent: NodeId },

    #[error("cycle detected in hierarchy starting at {start} (revisited {at})")]
    CycleDetected { start: NodeId, at: NodeId },

    #[error("duplicate node in node set: {0}")]
    DuplicateNode(NodeId),

    #[error("node {node} records root {recorded} but its top-most ancestor is {actual}")]
    RootMismatch {
        node: NodeId,
        recorded: NodeId,
        actual: NodeId,
    },
}
