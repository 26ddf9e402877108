//! In-process forest state shared by the embedded repositories

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::domain::{Node, NodeId, NodeRecord};
use crate::infrastructure::error::{StorageError, StorageResult};

/// On-disk layout of a TOML forest file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestDocument {
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
}

/// Nodes keyed by id, plus a child index derived from parent references.
///
/// The child index is rebuilt from `insert`/`remove` only; it is never
/// written out.
#[derive(Debug, Clone, Default)]
pub(crate) struct ForestState {
    nodes: BTreeMap<NodeId, Node>,
    children: BTreeMap<NodeId, BTreeSet<NodeId>>,
}

impl ForestState {
    pub(crate) fn from_document(document: ForestDocument) -> StorageResult<Self> {
        let mut state = Self::default();
        for record in document.nodes {
            let id = record.id;
            state.insert(Node::from(record)).map_err(|_| {
                StorageError::integrity(format!("node {id} appears more than once"))
            })?;
        }
        Ok(state)
    }

    pub(crate) fn to_document(&self) -> ForestDocument {
        ForestDocument {
            nodes: self.nodes.values().map(NodeRecord::from).collect(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<Node> {
        self.nodes.get(&id).cloned()
    }

    pub(crate) fn all(&self) -> Vec<Node> {
        self.nodes.values().cloned().collect()
    }

    fn child_ids(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children.get(&id).into_iter().flatten().copied()
    }

    pub(crate) fn children(&self, id: NodeId) -> Vec<Node> {
        self.child_ids(id)
            .filter_map(|c| self.nodes.get(&c).cloned())
            .collect()
    }

    pub(crate) fn parent(&self, id: NodeId) -> Option<Node> {
        self.nodes
            .get(&id)
            .and_then(|n| n.parent_id)
            .and_then(|p| self.get(p))
    }

    pub(crate) fn root(&self, id: NodeId) -> StorageResult<Node> {
        let node = self.nodes.get(&id).ok_or(StorageError::NotFound(id))?;
        self.get(node.root_id)
            .ok_or(StorageError::NotFound(node.root_id))
    }

    /// Breadth-first; each id is emitted at most once.
    pub(crate) fn descendants(&self, id: NodeId) -> Vec<Node> {
        let mut seen = HashSet::from([id]);
        let mut queue: VecDeque<NodeId> = VecDeque::from([id]);
        let mut out = Vec::new();
        while let Some(current) = queue.pop_front() {
            for child in self.child_ids(current) {
                if seen.insert(child) {
                    if let Some(node) = self.get(child) {
                        out.push(node);
                    }
                    queue.push_back(child);
                }
            }
        }
        out
    }

    /// Nearest first. A corrupted cycle stops the walk right after the first
    /// repeated id, which stays in the output so callers can detect it.
    pub(crate) fn ancestors(&self, id: NodeId) -> Vec<Node> {
        let mut seen = HashSet::from([id]);
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(node) = current {
            let repeated = !seen.insert(node.id);
            current = if repeated { None } else { self.parent(node.id) };
            out.push(node);
        }
        out
    }

    pub(crate) fn insert(&mut self, node: Node) -> StorageResult<()> {
        if self.nodes.contains_key(&node.id) {
            return Err(StorageError::Duplicate(node.id));
        }
        if let Some(parent) = node.parent_id {
            self.children.entry(parent).or_default().insert(node.id);
        }
        self.nodes.insert(node.id, node);
        Ok(())
    }

    pub(crate) fn remove(&mut self, id: NodeId) -> StorageResult<Node> {
        let node = self.nodes.remove(&id).ok_or(StorageError::NotFound(id))?;
        if let Some(parent) = node.parent_id {
            if let Some(siblings) = self.children.get_mut(&parent) {
                siblings.remove(&id);
                if siblings.is_empty() {
                    self.children.remove(&parent);
                }
            }
        }
        Ok(node)
    }

    /// Compare a claimed child list against the derived one.
    pub(crate) fn check_children(&self, id: NodeId, claimed: &[NodeId]) -> StorageResult<()> {
        if !self.nodes.contains_key(&id) {
            return Err(StorageError::NotFound(id));
        }
        let derived: BTreeSet<NodeId> = self.child_ids(id).collect();
        let claimed: BTreeSet<NodeId> = claimed.iter().copied().collect();
        if derived != claimed {
            return Err(StorageError::integrity(format!(
                "children of {id} are {derived:?}, caller expected {claimed:?}"
            )));
        }
        Ok(())
    }
}
