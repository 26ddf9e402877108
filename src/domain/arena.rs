use std::collections::HashMap;

use generational_arena::{Arena, Index};
use tracing::instrument;

use crate::domain::{HierarchyNode, NodeId};

/// Tree node in the arena-based hierarchy structure.
#[derive(Debug)]
pub struct TreeNode<N> {
    /// The assembled node, persisted fields untouched
    pub data: N,
    /// Index of parent node in the arena, None for the tree root
    pub parent: Option<Index>,
    /// Indices of child nodes in the arena, ascending by id
    pub children: Vec<Index>,
}

/// Arena-based tree reconstructed from a flat node set.
///
/// Produced by [`crate::domain::assemble`]. Children are a derived view
/// and exist only here, never on the stored nodes.
#[derive(Debug)]
pub struct Tree<N> {
    arena: Arena<TreeNode<N>>,
    index: HashMap<NodeId, Index>,
    root: Index,
}

impl<N: HierarchyNode> Tree<N> {
    pub(crate) fn from_parts(
        arena: Arena<TreeNode<N>>,
        index: HashMap<NodeId, Index>,
        root: Index,
    ) -> Self {
        Self { arena, index, root }
    }

    fn node_at(&self, idx: Index) -> Option<&TreeNode<N>> {
        self.arena.get(idx)
    }

    fn id_at(&self, idx: Index) -> Option<NodeId> {
        self.node_at(idx).map(|n| n.data.id())
    }

    pub fn root(&self) -> NodeId {
        self.arena[self.root].data.id()
    }

    pub fn root_node(&self) -> &N {
        &self.arena[self.root].data
    }

    pub fn get(&self, id: NodeId) -> Option<&N> {
        self.node(id).map(|n| &n.data)
    }

    pub fn node(&self, id: NodeId) -> Option<&TreeNode<N>> {
        self.index.get(&id).and_then(|&idx| self.node_at(idx))
    }

    pub(crate) fn index_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.index.keys().copied()
    }

    /// Direct children of `id`, ascending. Empty for unknown ids.
    pub fn children_of(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id)
            .map(|n| n.children.iter().filter_map(|&c| self.id_at(c)).collect())
            .unwrap_or_default()
    }

    /// Parent of `id` inside this tree; `None` for the tree root.
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)
            .and_then(|n| n.parent)
            .and_then(|p| self.id_at(p))
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn iter(&self) -> TreeIterator<'_, N> {
        TreeIterator::new(self)
    }

    pub fn iter_postorder(&self) -> PostOrderIterator<'_, N> {
        PostOrderIterator::new(self)
    }

    /// Number of levels, counting the root as one.
    #[instrument(level = "trace", skip(self))]
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self.root, 1)];
        while let Some((idx, level)) = stack.pop() {
            if let Some(node) = self.node_at(idx) {
                deepest = deepest.max(level);
                stack.extend(node.children.iter().map(|&child| (child, level + 1)));
            }
        }
        deepest
    }

    /// Number of transitive children below `id`.
    pub fn descendant_count(&self, id: NodeId) -> usize {
        let Some(&start) = self.index.get(&id) else {
            return 0;
        };
        let mut count = 0;
        let mut stack = vec![start];
        while let Some(idx) = stack.pop() {
            if let Some(node) = self.node_at(idx) {
                count += node.children.len();
                stack.extend(node.children.iter().copied());
            }
        }
        count
    }

    /// Collects all leaf ids (nodes with no children), in pre-order.
    pub fn leaf_ids(&self) -> Vec<NodeId> {
        self.iter()
            .filter(|n| n.children.is_empty())
            .map(|n| n.data.id())
            .collect()
    }

    /// Indented text tree of ids.
    ///
    /// Built bottom-up from the post-order walk: every child is finished
    /// before its parent claims it. Dropping the result recurses once per
    /// level; [`Tree::render`] does not.
    pub fn to_termtree(&self) -> termtree::Tree<String> {
        let mut finished: HashMap<NodeId, termtree::Tree<String>> = HashMap::new();
        for node in self.iter_postorder() {
            let leaves: Vec<_> = node
                .children
                .iter()
                .filter_map(|&child| self.id_at(child))
                .filter_map(|child| finished.remove(&child))
                .collect();
            let id = node.data.id();
            finished.insert(id, termtree::Tree::new(id.to_string()).with_leaves(leaves));
        }
        let root = self.root();
        finished
            .remove(&root)
            .unwrap_or_else(|| termtree::Tree::new(root.to_string()))
    }

    /// The text tree as a string, for display.
    pub fn render(&self) -> String {
        let text = self.to_termtree();
        let rendered = text.to_string();
        dismantle(text);
        rendered
    }
}

/// Drop a text tree level by level; the derived drop recurses once per level.
fn dismantle(tree: termtree::Tree<String>) {
    let mut pending = vec![tree];
    while let Some(mut tree) = pending.pop() {
        pending.append(&mut tree.leaves);
    }
}

/// Pre-order, children left to right.
pub struct TreeIterator<'a, N> {
    tree: &'a Tree<N>,
    stack: Vec<Index>,
}

impl<'a, N: HierarchyNode> TreeIterator<'a, N> {
    fn new(tree: &'a Tree<N>) -> Self {
        Self {
            tree,
            stack: vec![tree.root],
        }
    }
}

impl<'a, N: HierarchyNode> Iterator for TreeIterator<'a, N> {
    type Item = &'a TreeNode<N>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current_idx) = self.stack.pop() {
            if let Some(node) = self.tree.node_at(current_idx) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some(node);
            }
        }
        None
    }
}

/// Post-order: every child is yielded before its parent.
pub struct PostOrderIterator<'a, N> {
    tree: &'a Tree<N>,
    stack: Vec<(Index, bool)>,
}

impl<'a, N: HierarchyNode> PostOrderIterator<'a, N> {
    fn new(tree: &'a Tree<N>) -> Self {
        Self {
            tree,
            stack: vec![(tree.root, false)],
        }
    }
}

impl<'a, N: HierarchyNode> Iterator for PostOrderIterator<'a, N> {
    type Item = &'a TreeNode<N>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current_idx, visited)) = self.stack.pop() {
            if let Some(node) = self.tree.node_at(current_idx) {
                if !visited {
                    self.stack.push((current_idx, true));
                    for &child in node.children.iter().rev() {
                        self.stack.push((child, false));
                    }
                } else {
                    return Some(node);
                }
            }
        }
        None
    }
}
