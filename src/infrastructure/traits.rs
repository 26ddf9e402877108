//! Repository and I/O boundary traits
//!
//! The hierarchy core only talks to storage through these traits, so it can
//! run against the embedded stores, a test double, or any other backend.

use std::io;
use std::io::Write;
use std::path::Path;

use crate::domain::{Node, NodeId};
use crate::infrastructure::error::StorageResult;
use crate::util::path::parent_dir;

/// Read side of a node repository.
pub trait NodeReader {
    /// Point lookup. Absence is `Ok(None)`, not an error.
    fn get_by_id(&self, id: NodeId) -> StorageResult<Option<Node>>;

    /// All nodes whose parent is `id`, ascending by id.
    fn get_children(&self, id: NodeId) -> StorageResult<Vec<Node>>;

    /// The parent of `id`; `None` for roots and for unknown ids.
    fn get_parent(&self, id: NodeId) -> StorageResult<Option<Node>>;

    /// The node named by `id`'s root reference.
    ///
    /// Fails with `StorageError::NotFound` if `id` or its root is missing.
    fn get_root(&self, id: NodeId) -> StorageResult<Node>;

    /// Native descendant closure, excluding `id`. Order is unspecified.
    fn scan_descendants(&self, id: NodeId) -> StorageResult<Vec<Node>>;

    /// Native ancestor closure, excluding `id`, nearest first.
    fn scan_ancestors(&self, id: NodeId) -> StorageResult<Vec<Node>>;

    /// Every stored node, ascending by id.
    fn scan_all(&self) -> StorageResult<Vec<Node>>;

    fn node_count(&self) -> StorageResult<usize>;
}

/// Mutating primitives. Each call is atomic on its own.
pub trait NodeWriter: NodeReader {
    fn insert(&mut self, node: &Node) -> StorageResult<()>;

    fn delete(&mut self, id: NodeId) -> StorageResult<()>;

    /// Record the child list of `id` after a mutation.
    ///
    /// Stores that derive children from parent references use this to
    /// re-check that the derived set still matches.
    fn update_children(&mut self, id: NodeId, children: &[NodeId]) -> StorageResult<()>;
}

/// Scoped transaction over a repository.
///
/// Nothing written through a unit of work is visible to other readers
/// until `commit`. Dropping it without committing rolls back.
pub trait UnitOfWork: NodeWriter {
    fn commit(self: Box<Self>) -> StorageResult<()>;

    fn rollback(self: Box<Self>) -> StorageResult<()>;
}

/// A node repository: shared reads plus a unit-of-work factory.
pub trait NodeRepository: NodeReader + Send + Sync {
    fn begin_unit_of_work(&self) -> StorageResult<Box<dyn UnitOfWork + '_>>;

    /// Release the backing store. Later calls fail with `StorageError::Closed`.
    fn close(&self) -> StorageResult<()>;

    /// The descriptor this repository was opened from.
    fn descriptor(&self) -> &str;
}

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Replace file content in one step (write to a sibling temp file, then rename).
    fn write_atomic(&self, path: &Path, content: &str) -> io::Result<()>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Check if path is a directory.
    fn is_dir(&self, path: &Path) -> bool;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write_atomic(&self, path: &Path, content: &str) -> io::Result<()> {
        let mut tmp = tempfile::NamedTempFile::new_in(parent_dir(path))?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }
}
