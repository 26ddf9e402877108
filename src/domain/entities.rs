//! Domain entities: core data structures

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identity of a hierarchy member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub i64);

impl NodeId {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for NodeId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl FromStr for NodeId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(Self)
    }
}

/// Capability set the tree assembler needs from a node.
///
/// `Node` is the crate's own implementation; callers with richer node types
/// can implement this and still use [`crate::domain::assemble`].
pub trait HierarchyNode {
    fn id(&self) -> NodeId;

    /// `None` for roots.
    fn parent_id(&self) -> Option<NodeId>;

    fn root_id(&self) -> NodeId;

    fn is_root(&self) -> bool {
        self.parent_id().is_none()
    }
}

/// One member of a single-parent hierarchy.
///
/// Children are never stored here. They are derived by query or by
/// assembling a [`crate::domain::Tree`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Node {
    pub id: NodeId,
    pub parent_id: Option<NodeId>,
    pub root_id: NodeId,
}

impl Node {
    /// A root is its own root.
    pub fn root(id: NodeId) -> Self {
        Self {
            id,
            parent_id: None,
            root_id: id,
        }
    }

    /// A child inherits the root of its parent.
    pub fn child_of(id: NodeId, parent: &Node) -> Self {
        Self {
            id,
            parent_id: Some(parent.id),
            root_id: parent.root_id,
        }
    }
}

impl HierarchyNode for Node {
    fn id(&self) -> NodeId {
        self.id
    }

    fn parent_id(&self) -> Option<NodeId> {
        self.parent_id
    }

    fn root_id(&self) -> NodeId {
        self.root_id
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.parent_id {
            Some(parent) => write!(f, "{} (parent {}, root {})", self.id, parent, self.root_id),
            None => write!(f, "{} (root)", self.id),
        }
    }
}

/// Stored representation of a node.
///
/// Field-by-field mapping to [`Node`]; this is the only shape that crosses
/// the persistence boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<NodeId>,
    pub root_id: NodeId,
}

impl From<NodeRecord> for Node {
    fn from(record: NodeRecord) -> Self {
        Self {
            id: record.id,
            parent_id: record.parent_id,
            root_id: record.root_id,
        }
    }
}

impl From<&Node> for NodeRecord {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id,
            parent_id: node.parent_id,
            root_id: node.root_id,
        }
    }
}
