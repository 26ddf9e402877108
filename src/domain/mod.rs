//! Domain layer: entities and business logic
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod assembler;
pub mod entities;
pub mod error;

pub use arena::{PostOrderIterator, Tree, TreeIterator, TreeNode};
pub use assembler::{assemble, assemble_rooted_at, TreeResult};
pub use entities::*;
pub use error::DomainError;
