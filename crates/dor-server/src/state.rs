use std::path::PathBuf;
use std::sync::Arc;

use dor_repository::{Repository, RepositoryConfig};

use crate::error::ServerResult;

/// Shared handler state: one engine plus the namespaces every request
/// stores into.
#[derive(Clone, Debug)]
pub struct AppState {
    pub repository: Arc<Repository>,
    pub storage_path: Arc<PathBuf>,
    pub metadata_path: Arc<PathBuf>,
}

impl AppState {
    pub fn new(repository: Arc<Repository>, config: &RepositoryConfig) -> Self {
        Self {
            repository,
            storage_path: Arc::new(config.storage_path.clone()),
            metadata_path: Arc::new(config.metadata_path.clone()),
        }
    }

    /// Open the repository described by `config`.
    pub fn open(config: &RepositoryConfig) -> ServerResult<Self> {
        let repository = Arc::new(config.open()?);
        Ok(Self::new(repository, config))
    }
}
