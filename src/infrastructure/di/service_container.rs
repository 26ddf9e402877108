//! Service container for dependency injection
//!
//! Opens the store named in the settings and wires the hierarchy service to it.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::application::services::HierarchyService;
use crate::application::{ApplicationResult, StorageResultExt};
use crate::config::Settings;
use crate::infrastructure::embedded::EmbeddedRepository;
use crate::infrastructure::traits::{FileSystem, RealFileSystem};

/// Container holding all application services.
pub struct ServiceContainer {
    pub hierarchy: HierarchyService,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    ///
    /// Opens the store eagerly; an empty descriptor or an unreachable store
    /// fails here.
    pub fn new(settings: &Settings) -> ApplicationResult<Self> {
        Self::with_deps(settings, Arc::new(RealFileSystem))
    }

    /// Open `descriptor` with the default closure strategy.
    pub fn open(descriptor: &str) -> ApplicationResult<Self> {
        Self::new(&Settings {
            store: descriptor.to_string(),
            ..Settings::default()
        })
    }

    /// Create a service container with custom dependencies (for testing).
    #[instrument(level = "debug", skip(fs))]
    pub fn with_deps(settings: &Settings, fs: Arc<dyn FileSystem>) -> ApplicationResult<Self> {
        let repo =
            EmbeddedRepository::open_with_fs(&settings.store, fs).in_store_operation("open")?;
        debug!(store = %settings.store, "store opened");
        Ok(Self {
            hierarchy: HierarchyService::with_repository(
                Arc::new(repo),
                settings.closure_strategy,
            ),
        })
    }
}
