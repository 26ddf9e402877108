//! Tree assembler: rebuilds a navigable tree from a flat node set.
//!
//! Pure functions of their input. No store access, and the persisted fields
//! of the input nodes are never changed; only the derived children view is
//! built.

use std::collections::{HashMap, HashSet};

use generational_arena::{Arena, Index};
use tracing::{debug, instrument};

use crate::domain::arena::{Tree, TreeNode};
use crate::domain::error::DomainError;
use crate::domain::{HierarchyNode, NodeId};

/// Result type for tree operations.
pub type TreeResult<T> = Result<T, DomainError>;

/// Assemble a single rooted tree from an unordered node set.
///
/// Exactly one node may lack a parent reference, and every parent reference
/// must resolve inside the set.
pub fn assemble<N: HierarchyNode>(nodes: impl IntoIterator<Item = N>) -> TreeResult<Tree<N>> {
    build_tree(nodes.into_iter().collect(), None)
}

/// Assemble the subtree rooted at `root_id`.
///
/// Same as [`assemble`], except `root_id` is the only root candidate even if
/// it carries a parent reference. Used when the input is a node together
/// with its descendant closure.
pub fn assemble_rooted_at<N: HierarchyNode>(
    nodes: impl IntoIterator<Item = N>,
    root_id: NodeId,
) -> TreeResult<Tree<N>> {
    build_tree(nodes.into_iter().collect(), Some(root_id))
}

#[instrument(level = "debug", skip(nodes), fields(count = nodes.len()))]
fn build_tree<N: HierarchyNode>(
    mut nodes: Vec<N>,
    designated: Option<NodeId>,
) -> TreeResult<Tree<N>> {
    nodes.sort_by_key(|n| n.id());

    let mut arena: Arena<TreeNode<N>> = Arena::with_capacity(nodes.len());
    let mut index: HashMap<NodeId, Index> = HashMap::with_capacity(nodes.len());
    let mut links: Vec<(Index, NodeId, NodeId)> = Vec::new();
    let mut roots: Vec<(Index, NodeId)> = Vec::new();

    for node in nodes {
        let id = node.id();
        if index.contains_key(&id) {
            return Err(DomainError::DuplicateNode(id));
        }
        let parent = node.parent_id();
        let idx = arena.insert(TreeNode {
            data: node,
            parent: None,
            children: Vec::new(),
        });
        index.insert(id, idx);

        match (designated, parent) {
            (Some(root_id), _) if root_id == id => roots.push((idx, id)),
            (_, None) => roots.push((idx, id)),
            (_, Some(parent_id)) => links.push((idx, id, parent_id)),
        }
    }

    let root = match roots.as_slice() {
        [] => return Err(DomainError::NoRoot),
        [(idx, _)] => *idx,
        many => {
            return Err(DomainError::MultipleRoots(
                many.iter().map(|(_, id)| *id).collect(),
            ))
        }
    };
    if let Some(root_id) = designated {
        if !index.contains_key(&root_id) {
            return Err(DomainError::NoRoot);
        }
    }

    // Links are in ascending id order, so every children list ends up sorted.
    for (child_idx, child_id, parent_id) in links {
        let parent_idx = *index.get(&parent_id).ok_or(DomainError::DanglingParent {
            node: child_id,
            parent: parent_id,
        })?;
        arena[parent_idx].children.push(child_idx);
        arena[child_idx].parent = Some(parent_idx);
    }

    let tree = Tree::from_parts(arena, index, root);
    if tree.descendant_count(tree.root()) + 1 != tree.len() {
        // Only reachable when some nodes form a parent cycle detached from the root.
        let unreachable = tree_unreachable(&tree);
        debug!(?unreachable, "nodes not reachable from root");
        return Err(DomainError::CycleDetected {
            start: unreachable.first().copied().unwrap_or_else(|| tree.root()),
            at: unreachable.last().copied().unwrap_or_else(|| tree.root()),
        });
    }

    debug!(root = %tree.root(), size = tree.len(), "assembled tree");
    Ok(tree)
}

fn tree_unreachable<N: HierarchyNode>(tree: &Tree<N>) -> Vec<NodeId> {
    let reachable: HashSet<NodeId> = tree.iter().map(|n| n.data.id()).collect();
    let mut missing: Vec<NodeId> = tree
        .index_ids()
        .filter(|id| !reachable.contains(id))
        .collect();
    missing.sort();
    missing
}
