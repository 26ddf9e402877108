//! Infrastructure layer: repository collaborators and DI container
//!
//! This layer implements the repository boundary traits and wires up services.

pub mod di;
pub mod embedded;
pub mod error;
pub mod traits;

pub use embedded::{EmbeddedRepository, ForestDocument, StoreDescriptor};
pub use error::{StorageError, StorageResult};
