use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use dor_types::Identifier;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{StoreError, StoreResult};
use crate::naming::NameGenerator;
use crate::traits::StorageBackend;

const SCHEME: &str = "file";

/// Filesystem-backed storage.
///
/// Each object is one file at `<storage_path>/<name>`, addressed by a
/// `file://` locator. Storage paths are resolved to absolute paths and
/// created on first use; directories already known to exist are cached per
/// path so repeated saves skip the filesystem probe.
///
/// Writes go to a temporary file in the target directory and are renamed
/// into place, so a failed write never leaves a truncated object behind.
pub struct FileStorage {
    names: &'static NameGenerator,
    known_paths: Mutex<HashSet<PathBuf>>,
    closed: AtomicBool,
}

impl FileStorage {
    pub fn new() -> Self {
        Self {
            names: NameGenerator::global(),
            known_paths: Mutex::new(HashSet::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Storage paths verified (or created) so far, sorted.
    pub fn known_storage_paths(&self) -> Vec<PathBuf> {
        let known = self.known_paths.lock().unwrap_or_else(PoisonError::into_inner);
        let mut paths: Vec<PathBuf> = known.iter().cloned().collect();
        paths.sort();
        paths
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    /// Absolute, lexically normalized form of `storage_path`. `.` and `..`
    /// are collapsed the same way URL parsing collapses them, so a locator
    /// built here is equal to itself after a string round trip.
    fn absolute(storage_path: &Path) -> StoreResult<PathBuf> {
        let absolute = std::path::absolute(storage_path)
            .map_err(|e| StoreError::location(storage_path.display(), e.to_string()))?;
        let mut normalized = PathBuf::new();
        for component in absolute.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    normalized.pop();
                }
                other => normalized.push(other),
            }
        }
        Ok(normalized)
    }

    /// Resolve `storage_path` and make sure the directory exists.
    fn ensure_storage_path(&self, storage_path: &Path) -> StoreResult<PathBuf> {
        let dir = Self::absolute(storage_path)?;
        let mut known = self.known_paths.lock().unwrap_or_else(PoisonError::into_inner);
        if !known.contains(&dir) {
            if !dir.is_dir() {
                info!(path = %dir.display(), "storage path does not exist, creating it");
                fs::create_dir_all(&dir).map_err(|source| StoreError::Unavailable {
                    path: dir.clone(),
                    source,
                })?;
            }
            info!(path = %dir.display(), "storing files");
            known.insert(dir.clone());
        }
        Ok(dir)
    }

    fn file_path(identifier: &Identifier) -> StoreResult<PathBuf> {
        if identifier.scheme() != SCHEME {
            return Err(StoreError::location(
                identifier,
                format!("scheme '{}' is not served by file storage", identifier.scheme()),
            ));
        }
        identifier
            .locator()
            .to_file_path()
            .map_err(|()| StoreError::location(identifier, "not a local file path"))
    }

    fn write_atomic(dir: &Path, target: &Path, data: &[u8], overwrite: bool) -> io::Result<()> {
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(data)?;
        tmp.as_file().sync_all()?;
        if overwrite {
            tmp.persist(target).map_err(|e| e.error)?;
        } else {
            tmp.persist_noclobber(target).map_err(|e| e.error)?;
        }
        Ok(())
    }
}

impl Default for FileStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageBackend for FileStorage {
    fn scheme(&self) -> &'static str {
        SCHEME
    }

    fn locate(&self, storage_path: &Path, name: &str) -> StoreResult<Identifier> {
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(StoreError::location(name, "not a valid object name"));
        }
        let path = Self::absolute(storage_path)?.join(name);
        let locator = Url::from_file_path(&path)
            .map_err(|()| StoreError::location(path.display(), "cannot express as file URL"))?;
        let identifier = Identifier::from_locator(locator)?;
        if identifier.name() != name {
            return Err(StoreError::location(
                &identifier,
                format!("object name '{name}' does not survive locator encoding"),
            ));
        }
        Ok(identifier)
    }

    fn save(&self, data: &[u8], storage_path: &Path) -> StoreResult<Identifier> {
        self.ensure_open()?;
        let dir = self.ensure_storage_path(storage_path)?;
        loop {
            let name = self.names.generate(data);
            let identifier = self.locate(&dir, &name)?;
            match Self::write_atomic(&dir, &dir.join(&name), data, false) {
                Ok(()) => {
                    info!(id = %identifier, bytes = data.len(), "stored object");
                    return Ok(identifier);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    warn!(id = %identifier, "generated name already taken, regenerating");
                }
                Err(source) => {
                    return Err(StoreError::Io {
                        operation: "write",
                        locator: identifier.to_string(),
                        source,
                    })
                }
            }
        }
    }

    fn save_at(
        &self,
        data: &[u8],
        identifier: &Identifier,
        storage_path: &Path,
    ) -> StoreResult<()> {
        self.ensure_open()?;
        let dir = self.ensure_storage_path(storage_path)?;
        let expected = self.locate(&dir, identifier.name())?;
        if expected != *identifier {
            return Err(StoreError::location(
                identifier,
                format!("storage path {} addresses this name as {expected}", dir.display()),
            ));
        }
        let path = Self::file_path(identifier)?;
        Self::write_atomic(&dir, &path, data, true).map_err(|source| StoreError::Io {
            operation: "write",
            locator: identifier.to_string(),
            source,
        })?;
        info!(id = %identifier, bytes = data.len(), "stored object at given location");
        Ok(())
    }

    fn get(&self, identifier: &Identifier) -> StoreResult<Vec<u8>> {
        self.ensure_open()?;
        let path = Self::file_path(identifier)?;
        if !path.is_file() {
            return Err(StoreError::NotFound(identifier.to_string()));
        }
        let data = fs::read(&path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => StoreError::NotFound(identifier.to_string()),
            _ => StoreError::Io {
                operation: "read",
                locator: identifier.to_string(),
                source,
            },
        })?;
        debug!(id = %identifier, bytes = data.len(), "read object");
        Ok(data)
    }

    fn exists(&self, identifier: &Identifier) -> StoreResult<bool> {
        self.ensure_open()?;
        Ok(Self::file_path(identifier)?.is_file())
    }

    fn delete(&self, identifier: &Identifier) -> StoreResult<()> {
        self.ensure_open()?;
        let path = Self::file_path(identifier)?;
        if !path.is_file() {
            return Err(StoreError::NotFound(identifier.to_string()));
        }
        fs::remove_file(&path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => StoreError::NotFound(identifier.to_string()),
            _ => StoreError::Io {
                operation: "delete",
                locator: identifier.to_string(),
                source,
            },
        })?;
        info!(id = %identifier, "deleted object");
        Ok(())
    }

    fn close(&self) -> StoreResult<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.known_paths
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clear();
            info!("file storage closed");
        }
        Ok(())
    }
}

impl std::fmt::Debug for FileStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStorage")
            .field("known_paths", &self.known_storage_paths().len())
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}
