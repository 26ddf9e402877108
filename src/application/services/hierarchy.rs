//! Hierarchy service
//!
//! Facade over a node repository: structural queries through the closure
//! engine, tree assembly, and the four mutations. Every mutation runs as one
//! unit of work; any early return drops the unit of work and rolls it back.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::application::services::closure::{ClosureEngine, ClosureStrategy};
use crate::application::{ApplicationError, ApplicationResult, StorageResultExt};
use crate::domain::{assemble_rooted_at, DomainError, HierarchyNode, Node, NodeId, Tree};
use crate::infrastructure::traits::{NodeRepository, UnitOfWork};

/// Outcome of a full-store integrity check.
#[derive(Debug, Default)]
pub struct IntegrityReport {
    /// Number of trees that assembled cleanly
    pub trees: usize,
    /// Number of stored nodes
    pub nodes: usize,
    pub violations: Vec<DomainError>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    fn record(&mut self, violation: DomainError) {
        if !self.violations.contains(&violation) {
            self.violations.push(violation);
        }
    }
}

/// Service for querying and mutating a single-parent forest.
pub struct HierarchyService {
    repo: Arc<dyn NodeRepository>,
    strategy: ClosureStrategy,
    closed: AtomicBool,
}

impl HierarchyService {
    /// Wrap an opened repository collaborator.
    pub fn with_repository(repo: Arc<dyn NodeRepository>, strategy: ClosureStrategy) -> Self {
        debug!(descriptor = repo.descriptor(), %strategy, "hierarchy service ready");
        Self {
            repo,
            strategy,
            closed: AtomicBool::new(false),
        }
    }

    pub fn descriptor(&self) -> &str {
        self.repo.descriptor()
    }

    pub fn strategy(&self) -> ClosureStrategy {
        self.strategy
    }

    fn ensure_open(&self) -> ApplicationResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ApplicationError::Closed);
        }
        Ok(())
    }

    fn engine(&self) -> ClosureEngine<'_, dyn NodeRepository> {
        ClosureEngine::with_strategy(self.repo.as_ref(), self.strategy)
    }

    fn begin(&self, operation: &'static str) -> ApplicationResult<Box<dyn UnitOfWork + '_>> {
        self.ensure_open()?;
        self.repo.begin_unit_of_work().in_store_operation(operation)
    }

    // ============================================================
    // QUERIES
    // ============================================================

    /// Point lookup; absence is `Ok(None)`.
    pub fn get(&self, id: NodeId) -> ApplicationResult<Option<Node>> {
        self.ensure_open()?;
        self.repo.get_by_id(id).in_operation("get", id)
    }

    pub fn exists(&self, id: NodeId) -> ApplicationResult<bool> {
        Ok(self.get(id)?.is_some())
    }

    /// Direct children, ascending by id. Fails with `NotFound` for unknown ids.
    #[instrument(level = "debug", skip(self))]
    pub fn children(&self, id: NodeId) -> ApplicationResult<Vec<Node>> {
        self.require(id)?;
        self.repo.get_children(id).in_operation("children", id)
    }

    /// Direct parent; `None` for a root. Fails with `NotFound` for unknown ids.
    #[instrument(level = "debug", skip(self))]
    pub fn parent(&self, id: NodeId) -> ApplicationResult<Option<Node>> {
        let node = self.require(id)?;
        let parent = self.repo.get_parent(id).in_operation("parent", id)?;
        match (node.parent_id, &parent) {
            (Some(missing), None) => Err(DomainError::DanglingParent {
                node: id,
                parent: missing,
            }
            .into()),
            _ => Ok(parent),
        }
    }

    pub fn root(&self, id: NodeId) -> ApplicationResult<Node> {
        self.ensure_open()?;
        self.engine().root_of(id)
    }

    pub fn ancestors(&self, id: NodeId) -> ApplicationResult<Vec<Node>> {
        self.ensure_open()?;
        self.engine().ancestors_of(id)
    }

    pub fn descendants(&self, id: NodeId) -> ApplicationResult<Vec<Node>> {
        self.ensure_open()?;
        self.engine().descendants_of(id)
    }

    /// The subtree rooted at `id`, assembled into a navigable tree.
    #[instrument(level = "debug", skip(self))]
    pub fn descendants_tree(&self, id: NodeId) -> ApplicationResult<Tree<Node>> {
        self.ensure_open()?;
        let nodes = self.engine().subtree_of(id)?;
        Ok(assemble_rooted_at(nodes, id)?)
    }

    /// One tree per root, read from a consistent snapshot.
    #[instrument(level = "debug", skip(self))]
    pub fn forest(&self) -> ApplicationResult<Vec<Tree<Node>>> {
        let uow = self.begin("forest")?;
        let engine = ClosureEngine::with_strategy(&*uow, self.strategy);
        let roots: Vec<Node> = uow
            .scan_all()
            .in_store_operation("forest")?
            .into_iter()
            .filter(|n| n.is_root())
            .collect();

        let trees = roots
            .into_iter()
            .map(|root| -> ApplicationResult<Tree<Node>> {
                Ok(assemble_rooted_at(engine.subtree_of(root.id)?, root.id)?)
            })
            .collect::<ApplicationResult<Vec<_>>>()?;
        debug!(trees = trees.len(), "forest assembled");
        Ok(trees)
    }

    /// Re-check every structural invariant across the whole store.
    ///
    /// Runs inside a unit of work that is never committed, so the check sees
    /// one consistent state.
    #[instrument(level = "info", skip(self))]
    pub fn check_integrity(&self) -> ApplicationResult<IntegrityReport> {
        let uow = self.begin("check_integrity")?;
        let engine = ClosureEngine::with_strategy(&*uow, self.strategy);
        let all = uow.scan_all().in_store_operation("check_integrity")?;
        let mut report = IntegrityReport {
            nodes: all.len(),
            ..IntegrityReport::default()
        };
        let mut covered: HashSet<NodeId> = HashSet::with_capacity(all.len());

        for root in all.iter().filter(|n| n.is_root()) {
            let tree = match engine
                .subtree_of(root.id)
                .and_then(|nodes| Ok(assemble_rooted_at(nodes, root.id)?))
            {
                Ok(tree) => tree,
                Err(ApplicationError::Domain(violation)) => {
                    report.record(violation);
                    continue;
                }
                Err(e) => return Err(e),
            };
            for member in tree.iter() {
                covered.insert(member.data.id);
                if member.data.root_id != root.id {
                    report.record(DomainError::RootMismatch {
                        node: member.data.id,
                        recorded: member.data.root_id,
                        actual: root.id,
                    });
                }
            }
            report.trees += 1;
        }

        // Anything not under a root is either dangling or part of a cycle;
        // the ancestor walk tells which.
        for orphan in all.iter().filter(|n| !covered.contains(&n.id)) {
            match engine.ancestors_of(orphan.id) {
                Err(ApplicationError::Domain(violation)) => report.record(violation),
                Err(e) => return Err(e),
                Ok(_) => {
                    debug!(node = %orphan.id, "reaches a root whose tree was already reported")
                }
            }
        }

        if !report.is_clean() {
            warn!(violations = report.violations.len(), "integrity check failed");
        }
        Ok(report)
    }

    fn require(&self, id: NodeId) -> ApplicationResult<Node> {
        self.get(id)?.ok_or_else(|| DomainError::NotFound(id).into())
    }

    // ============================================================
    // MUTATIONS
    // ============================================================

    /// Create a root. Fails with `AlreadyExists` if `id` is taken.
    #[instrument(level = "debug", skip(self))]
    pub fn add_root(&self, id: NodeId) -> ApplicationResult<Node> {
        let mut uow = self.begin("add_root")?;
        if uow.get_by_id(id).in_operation("add_root", id)?.is_some() {
            return Err(DomainError::AlreadyExists(id).into());
        }

        let node = Node::root(id);
        uow.insert(&node).in_operation("add_root", id)?;
        uow.commit().in_operation("add_root", id)?;
        info!(%id, "added root");
        Ok(node)
    }

    /// Create `id` under `parent_id`, inheriting the parent's root.
    #[instrument(level = "debug", skip(self))]
    pub fn add_child(&self, id: NodeId, parent_id: NodeId) -> ApplicationResult<Node> {
        let mut uow = self.begin("add_child")?;
        if uow.get_by_id(id).in_operation("add_child", id)?.is_some() {
            return Err(DomainError::AlreadyExists(id).into());
        }
        let parent = uow
            .get_by_id(parent_id)
            .in_operation("add_child", parent_id)?
            .ok_or(DomainError::NotFound(parent_id))?;

        let node = Node::child_of(id, &parent);
        uow.insert(&node).in_operation("add_child", id)?;
        uow.commit().in_operation("add_child", id)?;
        info!(%id, parent = %parent_id, root = %node.root_id, "added child");
        Ok(node)
    }

    /// Delete a childless node.
    #[instrument(level = "debug", skip(self))]
    pub fn delete_leaf(&self, id: NodeId) -> ApplicationResult<Node> {
        let mut uow = self.begin("delete_leaf")?;
        let node = uow
            .get_by_id(id)
            .in_operation("delete_leaf", id)?
            .ok_or(DomainError::NotFound(id))?;
        let children = uow.get_children(id).in_operation("delete_leaf", id)?;
        if !children.is_empty() {
            return Err(DomainError::HasChildren {
                id,
                children: children.iter().map(|c| c.id).collect(),
            }
            .into());
        }

        uow.delete(id).in_operation("delete_leaf", id)?;
        if let Some(parent_id) = node.parent_id {
            sync_children(uow.as_mut(), parent_id, "delete_leaf")?;
        }
        uow.commit().in_operation("delete_leaf", id)?;
        info!(%id, "deleted leaf");
        Ok(node)
    }

    /// Delete `id` and everything below it, all or nothing.
    ///
    /// Returns the removed ids, children before parents.
    #[instrument(level = "debug", skip(self))]
    pub fn delete_subtree(&self, id: NodeId) -> ApplicationResult<Vec<NodeId>> {
        let mut uow = self.begin("delete_subtree")?;
        let (order, parent_id) = {
            let engine = ClosureEngine::with_strategy(&*uow, self.strategy);
            let tree = assemble_rooted_at(engine.subtree_of(id)?, id)?;
            let order: Vec<NodeId> = tree.iter_postorder().map(|n| n.data.id).collect();
            (order, tree.root_node().parent_id)
        };

        for victim in &order {
            uow.delete(*victim).in_operation("delete_subtree", *victim)?;
        }
        if let Some(parent_id) = parent_id {
            sync_children(uow.as_mut(), parent_id, "delete_subtree")?;
        }
        uow.commit().in_operation("delete_subtree", id)?;
        info!(%id, removed = order.len(), "deleted subtree");
        Ok(order)
    }

    /// Close the repository. Every later call, including another shutdown,
    /// fails with `Closed`.
    pub fn shutdown(&self) -> ApplicationResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(ApplicationError::Closed);
        }
        self.repo.close().in_store_operation("shutdown")?;
        info!(descriptor = self.repo.descriptor(), "hierarchy service shut down");
        Ok(())
    }
}

/// Report the parent's remaining children to the store after a removal.
fn sync_children(
    uow: &mut (dyn UnitOfWork + '_),
    parent_id: NodeId,
    operation: &'static str,
) -> ApplicationResult<()> {
    if uow.get_by_id(parent_id).in_operation(operation, parent_id)?.is_none() {
        warn!(parent = %parent_id, "parent already missing, skipping child sync");
        return Ok(());
    }
    let remaining: Vec<NodeId> = uow
        .get_children(parent_id)
        .in_operation(operation, parent_id)?
        .iter()
        .map(|c| c.id)
        .collect();
    uow.update_children(parent_id, &remaining)
        .in_operation(operation, parent_id)
}
