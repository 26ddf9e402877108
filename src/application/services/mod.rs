//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on repository traits (NodeReader, NodeRepository, ...)
//! but are themselves concrete structs, not traits.

mod closure;
mod hierarchy;

pub use closure::{ClosureEngine, ClosureStrategy};
pub use hierarchy::{HierarchyService, IntegrityReport};
