use std::path::Path;

use dor_types::Identifier;

use crate::error::StoreResult;

/// Raw byte persistence addressed by [`Identifier`] and a storage-path
/// namespace.
///
/// All implementations must satisfy these invariants:
/// - Payload bytes are opaque. The backend never interprets, transcodes, or
///   inspects them.
/// - `locate(path, name).name() == name`: the object name is derived from the
///   locator by the same rule the backend uses to address the object.
/// - Missing namespaces are created before writing. Failure to create one is
///   [`StoreError::Unavailable`](crate::StoreError::Unavailable).
/// - Reading or deleting an absent object is
///   [`StoreError::NotFound`](crate::StoreError::NotFound), never an empty
///   payload or a silent success.
/// - A failed write leaves nothing behind at the target locator.
pub trait StorageBackend: Send + Sync {
    /// Locator scheme served by this backend (e.g. `"file"`).
    fn scheme(&self) -> &'static str;

    /// Build the identifier that addresses `name` inside `storage_path`.
    ///
    /// Does not touch storage.
    fn locate(&self, storage_path: &Path, name: &str) -> StoreResult<Identifier>;

    /// Generate a fresh identifier for `data` inside `storage_path` and write
    /// the bytes there.
    ///
    /// Never overwrites an existing object.
    fn save(&self, data: &[u8], storage_path: &Path) -> StoreResult<Identifier>;

    /// Write `data` at exactly `identifier`, replacing any existing object.
    ///
    /// Fails with `LocationConstruction` if `identifier` is not the locator
    /// this backend would use for its name inside `storage_path`.
    fn save_at(&self, data: &[u8], identifier: &Identifier, storage_path: &Path)
        -> StoreResult<()>;

    /// Read the bytes stored at `identifier`.
    fn get(&self, identifier: &Identifier) -> StoreResult<Vec<u8>>;

    /// Check whether an object exists at `identifier`.
    fn exists(&self, identifier: &Identifier) -> StoreResult<bool>;

    /// Remove the object stored at `identifier`.
    fn delete(&self, identifier: &Identifier) -> StoreResult<()>;

    /// Shut the backend down. Subsequent operations fail with
    /// [`StoreError::Closed`](crate::StoreError::Closed).
    fn close(&self) -> StoreResult<()>;
}
