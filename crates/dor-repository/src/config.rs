use std::path::{Path, PathBuf};
use std::sync::Arc;

use dor_store::BackendConfig;
use serde::{Deserialize, Serialize};

use crate::engine::Repository;
use crate::error::ConfigError;
use crate::log_sink::{FileLogSink, LogSink, TracingLogSink};

/// Where and how a repository keeps its objects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Namespace payloads are written under.
    pub storage_path: PathBuf,
    /// Namespace content-type sidecars are written under.
    pub metadata_path: PathBuf,
    pub backend: BackendConfig,
    /// Append log messages here instead of to the `tracing` output.
    pub log_file: Option<PathBuf>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from("objectstorage/objects"),
            metadata_path: PathBuf::from("objectstorage/metadata"),
            backend: BackendConfig::default(),
            log_file: None,
        }
    }
}

impl RepositoryConfig {
    /// Load a configuration from a TOML file. Missing keys take their
    /// defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Build the log sink this configuration names.
    pub fn log_sink(&self) -> Result<Arc<dyn LogSink>, ConfigError> {
        match &self.log_file {
            Some(path) => {
                let sink = FileLogSink::open(path).map_err(|source| ConfigError::LogFile {
                    path: path.clone(),
                    source,
                })?;
                Ok(Arc::new(sink))
            }
            None => Ok(Arc::new(TracingLogSink)),
        }
    }

    /// Resolve the backend and log sink and construct the engine.
    pub fn open(&self) -> Result<Repository, ConfigError> {
        Ok(Repository::with_log_sink(self.backend.build(), self.log_sink()?))
    }
}
