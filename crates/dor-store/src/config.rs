use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::file::FileStorage;
use crate::memory::InMemoryStorage;
use crate::traits::StorageBackend;

/// Which storage backend a deployment runs on.
///
/// Resolved once at startup with [`BackendConfig::build`]; the result is
/// injected into the repository engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    /// Filesystem storage under the configured storage paths.
    #[default]
    File,
    /// Volatile in-process storage.
    Memory,
}

impl BackendConfig {
    /// Construct the configured backend.
    pub fn build(&self) -> Arc<dyn StorageBackend> {
        match self {
            Self::File => Arc::new(FileStorage::new()),
            Self::Memory => Arc::new(InMemoryStorage::new()),
        }
    }
}
