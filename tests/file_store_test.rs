//! Tests for the TOML file store: persistence, reopen, corrupted files

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use lineage::application::services::{ClosureStrategy, HierarchyService};
use lineage::application::{ApplicationError, ApplicationResult};
use lineage::config::Settings;
use lineage::domain::{DomainError, NodeId};
use lineage::infrastructure::di::ServiceContainer;
use lineage::infrastructure::traits::RealFileSystem;
use lineage::infrastructure::{ForestDocument, StorageError};
use lineage::util::testing;

fn descriptor(path: &Path) -> String {
    format!("file:{}", path.display())
}

fn try_open(path: &Path, strategy: ClosureStrategy) -> ApplicationResult<HierarchyService> {
    testing::init_test_setup();
    let settings = Settings {
        store: descriptor(path),
        closure_strategy: strategy,
    };
    ServiceContainer::with_deps(&settings, Arc::new(RealFileSystem)).map(|c| c.hierarchy)
}

fn open(path: &Path) -> HierarchyService {
    try_open(path, ClosureStrategy::Walk).expect("open file store")
}

fn write_forest(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("forest.toml");
    fs::write(&path, content).expect("write forest file");
    path
}

#[test]
fn given_missing_file_in_existing_dir_when_opening_then_empty_forest() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("forest.toml");

    let service = open(&path);

    assert!(service.forest().unwrap().is_empty());
    assert!(!path.exists(), "opening must not create the file");
}

#[test]
fn given_missing_directory_when_opening_then_unreachable() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nope").join("forest.toml");

    let result = try_open(&path, ClosureStrategy::Walk);

    assert!(matches!(
        result,
        Err(ApplicationError::Storage {
            source: StorageError::Unreachable { .. },
            ..
        })
    ));
}

#[test]
fn given_committed_mutations_when_reopening_then_forest_restored() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("forest.toml");
    {
        let service = open(&path);
        service.add_root(NodeId(1)).unwrap();
        service.add_child(NodeId(2), NodeId(1)).unwrap();
        service.add_child(NodeId(3), NodeId(2)).unwrap();
        service.shutdown().unwrap();
    }

    // Act
    let reopened = open(&path);

    // Assert
    let ancestors: Vec<NodeId> = reopened
        .ancestors(NodeId(3))
        .unwrap()
        .into_iter()
        .map(|n| n.id)
        .collect();
    assert_eq!(ancestors, vec![NodeId(2), NodeId(1)]);
    assert_eq!(reopened.root(NodeId(3)).unwrap().id, NodeId(1));
}

#[test]
fn given_mutation_when_committed_then_file_holds_flat_records_without_children() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("forest.toml");
    let service = open(&path);
    service.add_root(NodeId(1)).unwrap();
    service.add_child(NodeId(2), NodeId(1)).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    let document: ForestDocument = toml::from_str(&content).unwrap();

    assert_eq!(document.nodes.len(), 2);
    assert_eq!(document.nodes[0].parent_id, None);
    assert_eq!(document.nodes[1].parent_id, Some(NodeId(1)));
    assert_eq!(document.nodes[1].root_id, NodeId(1));
    assert!(!content.contains("children"));
}

#[test]
fn given_failed_delete_when_reopening_then_file_unchanged() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("forest.toml");
    let service = open(&path);
    service.add_root(NodeId(1)).unwrap();
    service.add_child(NodeId(2), NodeId(1)).unwrap();
    let before = fs::read_to_string(&path).unwrap();

    assert!(service.delete_leaf(NodeId(1)).is_err());

    assert_eq!(fs::read_to_string(&path).unwrap(), before);
}

#[test]
fn given_subtree_delete_when_reopening_then_removal_persisted() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("forest.toml");
    {
        let service = open(&path);
        service.add_root(NodeId(1)).unwrap();
        service.add_child(NodeId(2), NodeId(1)).unwrap();
        service.add_child(NodeId(3), NodeId(2)).unwrap();
        service.add_child(NodeId(4), NodeId(1)).unwrap();
        service.delete_subtree(NodeId(2)).unwrap();
    }

    let reopened = open(&path);

    assert!(reopened.get(NodeId(2)).unwrap().is_none());
    assert!(reopened.get(NodeId(3)).unwrap().is_none());
    assert!(reopened.exists(NodeId(4)).unwrap());
}

// ============================================================
// Corrupted forests
// ============================================================

const CYCLIC: &str = r#"
[[nodes]]
id = 1
root_id = 1

[[nodes]]
id = 2
parent_id = 1
root_id = 1

[[nodes]]
id = 10
parent_id = 11
root_id = 10

[[nodes]]
id = 11
parent_id = 10
root_id = 10
"#;

#[test]
fn given_parent_cycle_when_walking_ancestors_then_cycle_detected_with_either_strategy() {
    let temp = TempDir::new().unwrap();
    let path = write_forest(&temp, CYCLIC);

    for strategy in [ClosureStrategy::Walk, ClosureStrategy::Scan] {
        let service = try_open(&path, strategy).unwrap();

        let result = service.ancestors(NodeId(10));

        assert!(
            matches!(
                result,
                Err(ApplicationError::Domain(DomainError::CycleDetected { start, .. }))
                    if start == NodeId(10)
            ),
            "{strategy}: {result:?}"
        );
    }
}

#[test]
fn given_parent_cycle_when_walking_descendants_then_terminates() {
    let temp = TempDir::new().unwrap();
    let path = write_forest(&temp, CYCLIC);
    let service = open(&path);

    let descendants = service.descendants(NodeId(10)).unwrap();

    assert_eq!(descendants.len(), 1);
    assert_eq!(descendants[0].id, NodeId(11));
}

#[test]
fn given_self_parent_when_walking_ancestors_then_cycle_detected() {
    let temp = TempDir::new().unwrap();
    let path = write_forest(
        &temp,
        r#"
[[nodes]]
id = 7
parent_id = 7
root_id = 7
"#,
    );
    let service = open(&path);

    assert!(matches!(
        service.ancestors(NodeId(7)),
        Err(ApplicationError::Domain(DomainError::CycleDetected { .. }))
    ));
}

#[test]
fn given_corrupted_forest_when_checking_integrity_then_violations_reported() {
    let temp = TempDir::new().unwrap();
    let path = write_forest(
        &temp,
        &format!(
            "{CYCLIC}{}",
            r#"
[[nodes]]
id = 20
parent_id = 99
root_id = 99

[[nodes]]
id = 3
parent_id = 2
root_id = 30
"#
        ),
    );
    let service = open(&path);

    let report = service.check_integrity().unwrap();

    assert!(!report.is_clean());
    assert_eq!(report.trees, 1);
    assert!(report
        .violations
        .iter()
        .any(|v| matches!(v, DomainError::CycleDetected { .. })));
    assert!(report.violations.contains(&DomainError::DanglingParent {
        node: NodeId(20),
        parent: NodeId(99)
    }));
    assert!(report.violations.contains(&DomainError::RootMismatch {
        node: NodeId(3),
        recorded: NodeId(30),
        actual: NodeId(1)
    }));
}

const STALE_ROOTS: &str = r#"
[[nodes]]
id = 1
root_id = 1

[[nodes]]
id = 2
parent_id = 1
root_id = 2

[[nodes]]
id = 3
parent_id = 2
root_id = 40
"#;

#[test]
fn given_stale_root_reference_when_scanning_root_then_mismatch_names_actual_root() {
    let temp = TempDir::new().unwrap();
    let path = write_forest(&temp, STALE_ROOTS);
    let service = try_open(&path, ClosureStrategy::Scan).unwrap();

    // Recorded root 2 exists but has a parent
    assert_eq!(
        service.root(NodeId(2)).unwrap_err().to_string(),
        DomainError::RootMismatch {
            node: NodeId(2),
            recorded: NodeId(2),
            actual: NodeId(1)
        }
        .to_string()
    );
    // Recorded root 40 does not exist
    assert!(matches!(
        service.root(NodeId(3)),
        Err(ApplicationError::Domain(DomainError::RootMismatch {
            recorded,
            actual,
            ..
        })) if recorded == NodeId(40) && actual == NodeId(1)
    ));
    assert_eq!(service.root(NodeId(1)).unwrap().id, NodeId(1));
}

#[test]
fn given_stale_root_reference_when_walking_root_then_parent_chain_wins() {
    let temp = TempDir::new().unwrap();
    let path = write_forest(&temp, STALE_ROOTS);
    let service = open(&path);

    assert_eq!(service.root(NodeId(2)).unwrap().id, NodeId(1));
    assert_eq!(service.root(NodeId(3)).unwrap().id, NodeId(1));
}

#[test]
fn given_dangling_parent_when_querying_parent_then_dangling_parent() {
    let temp = TempDir::new().unwrap();
    let path = write_forest(
        &temp,
        r#"
[[nodes]]
id = 20
parent_id = 99
root_id = 99
"#,
    );
    let service = open(&path);

    assert!(matches!(
        service.parent(NodeId(20)),
        Err(ApplicationError::Domain(DomainError::DanglingParent { .. }))
    ));
    assert!(matches!(
        service.ancestors(NodeId(20)),
        Err(ApplicationError::Domain(DomainError::DanglingParent { .. }))
    ));
}

#[test]
fn given_malformed_file_when_opening_then_serialization_error() {
    let temp = TempDir::new().unwrap();
    let path = write_forest(&temp, "[[nodes]]\nid = \"one\"\n");

    let result = try_open(&path, ClosureStrategy::Walk);

    assert!(matches!(
        result,
        Err(ApplicationError::Storage {
            source: StorageError::Serialization { .. },
            ..
        })
    ));
}

#[test]
fn given_duplicate_ids_in_file_when_opening_then_integrity_error() {
    let temp = TempDir::new().unwrap();
    let path = write_forest(
        &temp,
        "[[nodes]]\nid = 1\nroot_id = 1\n\n[[nodes]]\nid = 1\nroot_id = 1\n",
    );

    let result = try_open(&path, ClosureStrategy::Walk);

    assert!(matches!(
        result,
        Err(ApplicationError::Storage {
            source: StorageError::Integrity { .. },
            ..
        })
    ));
}
