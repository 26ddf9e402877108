//! Closure engine
//!
//! Ancestor and descendant closures over the parent relation, computed
//! through a [`NodeReader`] only. Read-only; against a live repository the
//! result is read-committed, inside a unit of work it is consistent.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, warn};

use crate::application::{ApplicationError, ApplicationResult, StorageResultExt};
use crate::domain::{DomainError, HierarchyNode, Node, NodeId};
use crate::infrastructure::traits::NodeReader;
use crate::infrastructure::StorageError;

/// How closures are computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClosureStrategy {
    /// Hop by hop through `get_parent` / `get_children`.
    #[default]
    Walk,
    /// One call to the store's native `scan_ancestors` / `scan_descendants`.
    Scan,
}

impl fmt::Display for ClosureStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClosureStrategy::Walk => write!(f, "walk"),
            ClosureStrategy::Scan => write!(f, "scan"),
        }
    }
}

impl FromStr for ClosureStrategy {
    type Err = ApplicationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "walk" => Ok(Self::Walk),
            "scan" => Ok(Self::Scan),
            other => Err(ApplicationError::Config {
                message: format!("unknown closure strategy: {other} (expected walk or scan)"),
            }),
        }
    }
}

pub struct ClosureEngine<'s, S: NodeReader + ?Sized> {
    store: &'s S,
    strategy: ClosureStrategy,
}

impl<'s, S: NodeReader + ?Sized> ClosureEngine<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self::with_strategy(store, ClosureStrategy::default())
    }

    pub fn with_strategy(store: &'s S, strategy: ClosureStrategy) -> Self {
        Self { store, strategy }
    }

    fn require(&self, operation: &'static str, id: NodeId) -> ApplicationResult<Node> {
        self.store
            .get_by_id(id)
            .in_operation(operation, id)?
            .ok_or_else(|| DomainError::NotFound(id).into())
    }

    /// Parents of `id`, nearest first, ending at its root. Excludes `id`.
    #[instrument(level = "debug", skip(self), fields(strategy = %self.strategy))]
    pub fn ancestors_of(&self, id: NodeId) -> ApplicationResult<Vec<Node>> {
        let start = self.require("ancestors_of", id)?;
        let bound = self.store.node_count().in_operation("ancestors_of", id)?;

        let chain = match self.strategy {
            ClosureStrategy::Walk => self.walk_ancestors(id, bound)?,
            ClosureStrategy::Scan => {
                let scanned = self.store.scan_ancestors(id).in_operation("scan_ancestors", id)?;
                check_chain(id, &scanned, bound)?;
                scanned
            }
        };

        // The walk only stops at a node without a reachable parent; that
        // node must actually be a root.
        let top = chain.last().unwrap_or(&start);
        if let Some(parent) = top.parent_id() {
            error!(node = %top.id, %parent, "ancestor walk ended at a dangling parent reference");
            return Err(DomainError::DanglingParent {
                node: top.id,
                parent,
            }
            .into());
        }

        debug!(count = chain.len(), "ancestors resolved");
        Ok(chain)
    }

    fn walk_ancestors(&self, id: NodeId, bound: usize) -> ApplicationResult<Vec<Node>> {
        let mut visited = HashSet::from([id]);
        let mut chain = Vec::new();
        let mut current = id;

        while let Some(parent) = self
            .store
            .get_parent(current)
            .in_operation("get_parent", current)?
        {
            if !visited.insert(parent.id) || chain.len() >= bound {
                warn!(start = %id, at = %parent.id, hops = chain.len(), "cycle in parent relation");
                return Err(DomainError::CycleDetected {
                    start: id,
                    at: parent.id,
                }
                .into());
            }
            current = parent.id;
            chain.push(parent);
        }
        Ok(chain)
    }

    /// Every node reachable below `id`. Excludes `id`.
    ///
    /// Breadth-first with a visited set, so a store corrupted into a cycle
    /// still terminates. Order follows the store's child order.
    #[instrument(level = "debug", skip(self), fields(strategy = %self.strategy))]
    pub fn descendants_of(&self, id: NodeId) -> ApplicationResult<Vec<Node>> {
        self.require("descendants_of", id)?;
        let mut visited = HashSet::from([id]);

        let found = match self.strategy {
            ClosureStrategy::Walk => {
                let mut queue = VecDeque::from([id]);
                let mut found = Vec::new();
                while let Some(current) = queue.pop_front() {
                    let children = self
                        .store
                        .get_children(current)
                        .in_operation("get_children", current)?;
                    for child in children {
                        if !visited.insert(child.id) {
                            warn!(
                                parent = %current,
                                child = %child.id,
                                "child already visited, skipping"
                            );
                            continue;
                        }
                        queue.push_back(child.id);
                        found.push(child);
                    }
                }
                found
            }
            ClosureStrategy::Scan => self
                .store
                .scan_descendants(id)
                .in_operation("scan_descendants", id)?
                .into_iter()
                .filter(|n| visited.insert(n.id))
                .collect(),
        };

        debug!(count = found.len(), "descendants resolved");
        Ok(found)
    }

    /// The top-most ancestor of `id` (`id` itself for a root).
    ///
    /// `Scan` trusts the stored root reference only if it names a parentless
    /// node; otherwise the real chain is walked and the stale reference is
    /// reported as `RootMismatch`.
    #[instrument(level = "debug", skip(self), fields(strategy = %self.strategy))]
    pub fn root_of(&self, id: NodeId) -> ApplicationResult<Node> {
        match self.strategy {
            ClosureStrategy::Walk => {
                let node = self.require("root_of", id)?;
                let mut chain = self.ancestors_of(id)?;
                Ok(chain.pop().unwrap_or(node))
            }
            ClosureStrategy::Scan => {
                let node = self.require("root_of", id)?;
                match self.store.get_root(id) {
                    Ok(root) if root.is_root() => Ok(root),
                    Ok(_) | Err(StorageError::NotFound(_)) => {
                        error!(%id, root = %node.root_id, "root reference is stale");
                        let actual = self.ancestors_of(id)?.pop().map_or(id, |root| root.id);
                        Err(DomainError::RootMismatch {
                            node: id,
                            recorded: node.root_id,
                            actual,
                        }
                        .into())
                    }
                    Err(e) => Err(e).in_operation("get_root", id),
                }
            }
        }
    }

    /// `id` followed by its descendant closure.
    pub fn subtree_of(&self, id: NodeId) -> ApplicationResult<Vec<Node>> {
        let node = self.require("subtree_of", id)?;
        let mut nodes = vec![node];
        nodes.extend(self.descendants_of(id)?);
        Ok(nodes)
    }
}

/// Validate a natively scanned ancestor chain.
fn check_chain(id: NodeId, chain: &[Node], bound: usize) -> ApplicationResult<()> {
    let mut visited = HashSet::from([id]);
    for (hops, node) in chain.iter().enumerate() {
        if !visited.insert(node.id) || hops >= bound {
            warn!(start = %id, at = %node.id, "cycle in scanned ancestor chain");
            return Err(DomainError::CycleDetected {
                start: id,
                at: node.id,
            }
            .into());
        }
    }
    Ok(())
}
