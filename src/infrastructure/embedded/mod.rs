//! Embedded repositories: volatile memory store and TOML file store
//!
//! Both keep the whole forest in one `ForestState` behind a mutex. A unit of
//! work holds that lock for its whole lifetime and keeps a snapshot taken at
//! begin, so readers never see a half-applied mutation and an uncommitted
//! drop restores the snapshot before the lock is released.

mod descriptor;
mod state;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, instrument, warn};

pub use descriptor::StoreDescriptor;
pub use state::ForestDocument;
use state::ForestState;

use crate::domain::{Node, NodeId};
use crate::infrastructure::error::{StorageError, StorageResult};
use crate::infrastructure::traits::{FileSystem, NodeReader, NodeRepository, NodeWriter, UnitOfWork};
use crate::util::path::parent_dir;

enum Backing {
    Volatile,
    TomlFile {
        path: PathBuf,
        fs: Arc<dyn FileSystem>,
    },
}

/// Repository over an in-process forest, optionally mirrored to a TOML file.
pub struct EmbeddedRepository {
    descriptor: String,
    backing: Backing,
    state: Mutex<ForestState>,
    closed: AtomicBool,
}

impl EmbeddedRepository {
    /// Empty volatile store.
    pub fn in_memory() -> Self {
        Self::with_state("memory:".to_string(), Backing::Volatile, ForestState::default())
    }

    /// Open the store named by `descriptor`.
    ///
    /// A missing TOML file is an empty forest as long as its directory
    /// exists; a missing directory makes the store unreachable.
    #[instrument(level = "debug", skip(fs))]
    pub fn open_with_fs(descriptor: &str, fs: Arc<dyn FileSystem>) -> StorageResult<Self> {
        match descriptor.parse::<StoreDescriptor>()? {
            StoreDescriptor::Memory => {
                let mut repo = Self::in_memory();
                repo.descriptor = descriptor.trim().to_string();
                Ok(repo)
            }
            StoreDescriptor::TomlFile(path) => {
                let state = load_forest(descriptor, &path, fs.as_ref())?;
                info!(path = %path.display(), nodes = state.len(), "opened forest file");
                Ok(Self::with_state(
                    descriptor.trim().to_string(),
                    Backing::TomlFile { path, fs },
                    state,
                ))
            }
        }
    }

    fn with_state(descriptor: String, backing: Backing, state: ForestState) -> Self {
        Self {
            descriptor,
            backing,
            state: Mutex::new(state),
            closed: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, ForestState>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StorageError::Closed);
        }
        // A panicking unit of work restores its snapshot before the guard is
        // dropped, so a poisoned lock still protects consistent state.
        Ok(self.state.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn persist(&self, state: &ForestState) -> StorageResult<()> {
        let Backing::TomlFile { path, fs } = &self.backing else {
            return Ok(());
        };
        let content = toml::to_string_pretty(&state.to_document()).map_err(|e| {
            StorageError::Serialization {
                message: format!("serialize {}: {}", path.display(), e),
            }
        })?;
        fs.write_atomic(path, &content)
            .map_err(|e| StorageError::io(format!("write {}", path.display()), e))?;
        debug!(path = %path.display(), nodes = state.len(), "persisted forest");
        Ok(())
    }
}

fn load_forest(descriptor: &str, path: &Path, fs: &dyn FileSystem) -> StorageResult<ForestState> {
    let dir = parent_dir(path);
    if !fs.is_dir(&dir) {
        return Err(StorageError::Unreachable {
            descriptor: descriptor.to_string(),
            reason: format!("directory does not exist: {}", dir.display()),
        });
    }
    if !fs.exists(path) {
        return Ok(ForestState::default());
    }

    let content = fs
        .read_to_string(path)
        .map_err(|e| StorageError::io(format!("read {}", path.display()), e))?;
    let document: ForestDocument =
        toml::from_str(&content).map_err(|e| StorageError::Serialization {
            message: format!("parse {}: {}", path.display(), e),
        })?;
    ForestState::from_document(document)
}

impl NodeReader for EmbeddedRepository {
    fn get_by_id(&self, id: NodeId) -> StorageResult<Option<Node>> {
        Ok(self.lock()?.get(id))
    }

    fn get_children(&self, id: NodeId) -> StorageResult<Vec<Node>> {
        Ok(self.lock()?.children(id))
    }

    fn get_parent(&self, id: NodeId) -> StorageResult<Option<Node>> {
        Ok(self.lock()?.parent(id))
    }

    fn get_root(&self, id: NodeId) -> StorageResult<Node> {
        self.lock()?.root(id)
    }

    fn scan_descendants(&self, id: NodeId) -> StorageResult<Vec<Node>> {
        Ok(self.lock()?.descendants(id))
    }

    fn scan_ancestors(&self, id: NodeId) -> StorageResult<Vec<Node>> {
        Ok(self.lock()?.ancestors(id))
    }

    fn scan_all(&self) -> StorageResult<Vec<Node>> {
        Ok(self.lock()?.all())
    }

    fn node_count(&self) -> StorageResult<usize> {
        Ok(self.lock()?.len())
    }
}

impl NodeRepository for EmbeddedRepository {
    fn begin_unit_of_work(&self) -> StorageResult<Box<dyn UnitOfWork + '_>> {
        let guard = self.lock()?;
        let snapshot = guard.clone();
        Ok(Box::new(EmbeddedUnitOfWork {
            repo: self,
            guard,
            snapshot: Some(snapshot),
            dirty: false,
        }))
    }

    fn close(&self) -> StorageResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(StorageError::Closed);
        }
        info!(descriptor = %self.descriptor, "store closed");
        Ok(())
    }

    fn descriptor(&self) -> &str {
        &self.descriptor
    }
}

/// Unit of work over an [`EmbeddedRepository`].
pub struct EmbeddedUnitOfWork<'a> {
    repo: &'a EmbeddedRepository,
    guard: MutexGuard<'a, ForestState>,
    /// `None` once committed.
    snapshot: Option<ForestState>,
    dirty: bool,
}

impl EmbeddedUnitOfWork<'_> {
    fn restore(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            if self.dirty {
                *self.guard = snapshot;
                debug!("unit of work rolled back");
            }
        }
    }
}

impl NodeReader for EmbeddedUnitOfWork<'_> {
    fn get_by_id(&self, id: NodeId) -> StorageResult<Option<Node>> {
        Ok(self.guard.get(id))
    }

    fn get_children(&self, id: NodeId) -> StorageResult<Vec<Node>> {
        Ok(self.guard.children(id))
    }

    fn get_parent(&self, id: NodeId) -> StorageResult<Option<Node>> {
        Ok(self.guard.parent(id))
    }

    fn get_root(&self, id: NodeId) -> StorageResult<Node> {
        self.guard.root(id)
    }

    fn scan_descendants(&self, id: NodeId) -> StorageResult<Vec<Node>> {
        Ok(self.guard.descendants(id))
    }

    fn scan_ancestors(&self, id: NodeId) -> StorageResult<Vec<Node>> {
        Ok(self.guard.ancestors(id))
    }

    fn scan_all(&self) -> StorageResult<Vec<Node>> {
        Ok(self.guard.all())
    }

    fn node_count(&self) -> StorageResult<usize> {
        Ok(self.guard.len())
    }
}

impl NodeWriter for EmbeddedUnitOfWork<'_> {
    fn insert(&mut self, node: &Node) -> StorageResult<()> {
        self.dirty = true;
        self.guard.insert(node.clone())
    }

    fn delete(&mut self, id: NodeId) -> StorageResult<()> {
        self.dirty = true;
        self.guard.remove(id).map(|_| ())
    }

    fn update_children(&mut self, id: NodeId, children: &[NodeId]) -> StorageResult<()> {
        self.guard.check_children(id, children)
    }
}

impl UnitOfWork for EmbeddedUnitOfWork<'_> {
    fn commit(mut self: Box<Self>) -> StorageResult<()> {
        if self.dirty {
            // On failure `self` drops with the snapshot still present and rolls back.
            self.repo.persist(&self.guard)?;
        }
        self.snapshot = None;
        Ok(())
    }

    fn rollback(mut self: Box<Self>) -> StorageResult<()> {
        self.restore();
        Ok(())
    }
}

impl Drop for EmbeddedUnitOfWork<'_> {
    fn drop(&mut self) {
        if self.snapshot.is_some() && self.dirty {
            warn!("unit of work dropped without commit");
        }
        self.restore();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::traits::RealFileSystem;

    #[test]
    fn given_uncommitted_unit_of_work_when_dropped_then_changes_vanish() {
        let repo = EmbeddedRepository::in_memory();
        {
            let mut uow = repo.begin_unit_of_work().unwrap();
            uow.insert(&Node::root(NodeId(1))).unwrap();
            assert!(uow.get_by_id(NodeId(1)).unwrap().is_some());
        }
        assert!(repo.get_by_id(NodeId(1)).unwrap().is_none());
    }

    #[test]
    fn given_committed_unit_of_work_when_reading_then_changes_visible() {
        let repo = EmbeddedRepository::in_memory();
        let mut uow = repo.begin_unit_of_work().unwrap();
        uow.insert(&Node::root(NodeId(1))).unwrap();
        uow.commit().unwrap();
        assert_eq!(repo.node_count().unwrap(), 1);
    }

    #[test]
    fn given_explicit_rollback_when_reading_then_store_unchanged() {
        let repo = EmbeddedRepository::in_memory();
        let mut uow = repo.begin_unit_of_work().unwrap();
        uow.insert(&Node::root(NodeId(1))).unwrap();
        uow.rollback().unwrap();
        assert_eq!(repo.node_count().unwrap(), 0);
    }

    #[test]
    fn given_panic_inside_unit_of_work_when_recovering_then_store_unchanged() {
        let repo = EmbeddedRepository::in_memory();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut uow = repo.begin_unit_of_work().unwrap();
            uow.insert(&Node::root(NodeId(1))).unwrap();
            panic!("fault mid-transaction");
        }));
        assert!(result.is_err());
        assert!(repo.get_by_id(NodeId(1)).unwrap().is_none());
    }

    #[test]
    fn given_closed_store_when_reading_then_closed() {
        let repo = EmbeddedRepository::in_memory();
        repo.close().unwrap();
        assert!(matches!(repo.get_by_id(NodeId(1)), Err(StorageError::Closed)));
        assert!(matches!(repo.close(), Err(StorageError::Closed)));
    }

    #[test]
    fn given_missing_directory_when_opening_file_store_then_unreachable() {
        let result = EmbeddedRepository::open_with_fs(
            "file:/definitely/not/here/forest.toml",
            Arc::new(RealFileSystem),
        );
        assert!(matches!(result, Err(StorageError::Unreachable { .. })));
    }
}
