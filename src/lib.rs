//! lineage: a single-parent hierarchy store
//!
//! Nodes carry a parent and the id of their tree's root. On top of a
//! pluggable node repository the crate computes ancestor and descendant
//! closures, assembles subtrees into arena-backed trees and runs the
//! mutating operations (add, delete leaf, cascading subtree delete) as
//! single units of work.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
