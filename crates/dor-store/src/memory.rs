use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use dor_types::Identifier;
use tracing::debug;
use url::Url;

use crate::error::{StoreError, StoreResult};
use crate::naming::NameGenerator;
use crate::traits::StorageBackend;

const SCHEME: &str = "mem";

/// In-memory, map-based storage backend.
///
/// Intended for tests and embedding. Storage paths become logical namespaces
/// and objects are addressed as `mem:///<namespace>/<name>`. Everything is
/// held behind `RwLock`s for safe concurrent access; bytes are cloned on
/// read and write.
pub struct InMemoryStorage {
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
    namespaces: RwLock<BTreeSet<String>>,
    names: &'static NameGenerator,
    closed: AtomicBool,
}

impl InMemoryStorage {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            namespaces: RwLock::new(BTreeSet::new()),
            names: NameGenerator::global(),
            closed: AtomicBool::new(false),
        }
    }

    /// Number of objects currently stored (payloads and sidecars alike).
    pub fn len(&self) -> usize {
        self.objects.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Namespaces created so far, sorted.
    pub fn namespaces(&self) -> Vec<String> {
        self.namespaces
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    fn namespace(storage_path: &Path) -> StoreResult<String> {
        let ns = storage_path
            .to_string_lossy()
            .replace('\\', "/")
            .trim_matches('/')
            .to_string();
        if ns.is_empty() {
            return Err(StoreError::location(
                storage_path.display(),
                "empty storage path",
            ));
        }
        Ok(ns)
    }

    fn ensure_namespace(&self, storage_path: &Path) -> StoreResult<()> {
        let ns = Self::namespace(storage_path)?;
        let mut namespaces = self.namespaces.write().unwrap_or_else(PoisonError::into_inner);
        if namespaces.insert(ns.clone()) {
            debug!(namespace = %ns, "created namespace");
        }
        Ok(())
    }

    fn key(identifier: &Identifier) -> StoreResult<&str> {
        if identifier.scheme() != SCHEME {
            return Err(StoreError::location(
                identifier,
                format!("scheme '{}' is not served by in-memory storage", identifier.scheme()),
            ));
        }
        Ok(identifier.as_str())
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageBackend for InMemoryStorage {
    fn scheme(&self) -> &'static str {
        SCHEME
    }

    fn locate(&self, storage_path: &Path, name: &str) -> StoreResult<Identifier> {
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(StoreError::location(name, "not a valid object name"));
        }
        let raw = format!("{SCHEME}:///{}/{name}", Self::namespace(storage_path)?);
        let locator = Url::parse(&raw).map_err(|e| StoreError::location(&raw, e.to_string()))?;
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
        self.ensure_namespace(storage_path)?;
        let mut objects = self.objects.write().unwrap_or_else(PoisonError::into_inner);
        loop {
            let identifier = self.locate(storage_path, &self.names.generate(data))?;
            if !objects.contains_key(identifier.as_str()) {
                objects.insert(identifier.to_string(), data.to_vec());
                debug!(id = %identifier, bytes = data.len(), "stored object");
                return Ok(identifier);
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
        let key = Self::key(identifier)?;
        let expected = self.locate(storage_path, identifier.name())?;
        if expected != *identifier {
            return Err(StoreError::location(
                identifier,
                format!("storage path addresses this name as {expected}"),
            ));
        }
        self.ensure_namespace(storage_path)?;
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), data.to_vec());
        debug!(id = %identifier, bytes = data.len(), "stored object at given location");
        Ok(())
    }

    fn get(&self, identifier: &Identifier) -> StoreResult<Vec<u8>> {
        self.ensure_open()?;
        let key = Self::key(identifier)?;
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(identifier.to_string()))
    }

    fn exists(&self, identifier: &Identifier) -> StoreResult<bool> {
        self.ensure_open()?;
        let key = Self::key(identifier)?;
        Ok(self
            .objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key))
    }

    fn delete(&self, identifier: &Identifier) -> StoreResult<()> {
        self.ensure_open()?;
        let key = Self::key(identifier)?;
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(identifier.to_string()))
    }

    fn close(&self) -> StoreResult<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStorage")
            .field("object_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn objects() -> &'static Path {
        Path::new("objects")
    }

    // -----------------------------------------------------------------------
    // Core CRUD
    // -----------------------------------------------------------------------

    #[test]
    fn save_and_get() {
        let store = InMemoryStorage::new();
        let id = store.save(b"hello world", objects()).unwrap();
        assert_eq!(id.scheme(), "mem");
        assert!(id.as_str().starts_with("mem:///objects/"));
        assert_eq!(store.get(&id).unwrap(), b"hello world");
    }

    #[test]
    fn locate_normalizes_namespace() {
        let store = InMemoryStorage::new();
        let a = store.locate(Path::new("/objects/"), "n").unwrap();
        let b = store.locate(Path::new("objects"), "n").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "mem:///objects/n");
    }

    #[test]
    fn empty_namespace_is_rejected() {
        let store = InMemoryStorage::new();
        let err = store.save(b"x", Path::new("/")).unwrap_err();
        assert!(matches!(err, StoreError::LocationConstruction { .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn namespaces_are_recorded_once() {
        let store = InMemoryStorage::new();
        store.save(b"a", objects()).unwrap();
        store.save(b"b", objects()).unwrap();
        store.save(b"c", Path::new("metadata")).unwrap();
        assert_eq!(store.namespaces(), vec!["metadata", "objects"]);
    }

    #[test]
    fn identical_content_gets_distinct_identifiers() {
        let store = InMemoryStorage::new();
        let id1 = store.save(b"identical content", objects()).unwrap();
        let id2 = store.save(b"identical content", objects()).unwrap();
        assert_ne!(id1, id2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn save_at_and_overwrite() {
        let store = InMemoryStorage::new();
        let id = store.locate(objects(), "abc").unwrap();
        store.save_at(b"hello", &id, objects()).unwrap();
        store.save_at(b"world", &id, objects()).unwrap();
        assert_eq!(store.get(&id).unwrap(), b"world");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn save_at_foreign_scheme_fails() {
        let store = InMemoryStorage::new();
        let id = Identifier::parse("loc://store/abc").unwrap();
        let err = store.save_at(b"x", &id, Path::new("store")).unwrap_err();
        assert!(matches!(err, StoreError::LocationConstruction { .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn save_at_other_namespace_fails() {
        let store = InMemoryStorage::new();
        let id = store.locate(Path::new("metadata"), "abc").unwrap();
        let err = store.save_at(b"x", &id, objects()).unwrap_err();
        assert!(matches!(err, StoreError::LocationConstruction { .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn get_missing_is_not_found() {
        let store = InMemoryStorage::new();
        let id = store.locate(objects(), "missing").unwrap();
        assert!(store.get(&id).unwrap_err().is_not_found());
    }

    #[test]
    fn delete_present_then_missing() {
        let store = InMemoryStorage::new();
        let id = store.save(b"to-delete", objects()).unwrap();
        store.delete(&id).unwrap();
        assert!(!store.exists(&id).unwrap());
        assert!(store.delete(&id).unwrap_err().is_not_found());
    }

    // -----------------------------------------------------------------------
    // Utility methods
    // -----------------------------------------------------------------------

    #[test]
    fn len_counts_objects() {
        let store = InMemoryStorage::new();
        assert!(store.is_empty());
        store.save(b"12345", objects()).unwrap();
        store.save(b"123456789", objects()).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn closed_store_rejects_operations() {
        let store = InMemoryStorage::new();
        let id = store.save(b"x", objects()).unwrap();
        store.close().unwrap();
        assert!(matches!(store.get(&id), Err(StoreError::Closed)));
        assert!(matches!(store.delete(&id), Err(StoreError::Closed)));
    }

    #[test]
    fn concurrent_saves_never_collide() {
        let store = Arc::new(InMemoryStorage::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..100 {
                        store.save(b"same bytes", Path::new("objects")).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread should not panic");
        }
        assert_eq!(store.len(), 800);
    }

    #[test]
    fn debug_format() {
        let store = InMemoryStorage::new();
        store.save(b"x", objects()).unwrap();
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryStorage"));
        assert!(debug.contains("object_count"));
    }
}
