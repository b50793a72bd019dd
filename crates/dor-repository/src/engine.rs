use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dor_store::{StorageBackend, StoreError};
use dor_types::{ContentType, DigitalObject, Identifier, RepositoryAction};
use tracing::{debug, error, info, warn};

use crate::error::{Operation, RepositoryError, RepositoryResult};
use crate::log_sink::{LogSink, TracingLogSink};
use crate::observer::{ObserverRegistry, RepositoryEvent, RepositoryObserver};

const COMPONENT: &str = "repository";

/// The object lifecycle engine.
///
/// Combines one injected [`StorageBackend`], an [`ObserverRegistry`], and a
/// [`LogSink`]. Every object is persisted as two records with the same
/// name: the payload under the storage path and its content-type sidecar
/// under the metadata path.
///
/// # Ordering
///
/// - store: resolve identifier → write payload → write sidecar → notify `ADD`
/// - retrieve: read payload → read sidecar → notify `REQUEST`
/// - modify: check existence → write payload → write sidecar → notify `MODIFY`
/// - delete: check existence → read sidecar → delete payload → delete
///   sidecar → notify `DELETE`
///
/// Any failing step ends the operation without a notification. Mutating
/// operations run under a single engine-wide lock, notification included;
/// retrieval does not take it.
pub struct Repository {
    backend: Arc<dyn StorageBackend>,
    observers: ObserverRegistry,
    log_sink: Arc<dyn LogSink>,
    write_lock: Mutex<()>,
}

impl Repository {
    /// Create an engine over `backend`, logging messages through `tracing`.
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self::with_log_sink(backend, Arc::new(TracingLogSink))
    }

    pub fn with_log_sink(backend: Arc<dyn StorageBackend>, log_sink: Arc<dyn LogSink>) -> Self {
        info!(scheme = backend.scheme(), "repository engine constructed");
        Self {
            backend,
            observers: ObserverRegistry::new(),
            log_sink,
            write_lock: Mutex::new(()),
        }
    }

    /// The injected storage backend.
    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    pub fn observers(&self) -> &ObserverRegistry {
        &self.observers
    }

    pub fn register_observer(&self, observer: Arc<dyn RepositoryObserver>) {
        self.observers.register(observer);
    }

    /// Remove one registration of `observer`; a no-op if it is not registered.
    pub fn unregister_observer(&self, observer: &Arc<dyn RepositoryObserver>) -> bool {
        self.observers.unregister(observer)
    }

    /// Persist `object` and return its identifier.
    ///
    /// Without `identifier`, a fresh one is generated inside `storage_path`.
    /// With one, the object is written at exactly that locator, replacing
    /// whatever was stored there; if the backend cannot address it exactly
    /// the call fails with `LocationConstruction` and nothing is written.
    ///
    /// A sidecar failure after a successful payload write is reported as
    /// `PartialWriteInconsistency`; the payload is left in place.
    pub fn store(
        &self,
        object: &DigitalObject,
        storage_path: &Path,
        metadata_path: &Path,
        identifier: Option<&Identifier>,
        message: &str,
    ) -> RepositoryResult<Identifier> {
        let op = Operation::Store;
        let _guard = self.write_guard();

        let identifier = match identifier {
            Some(requested) => {
                self.backend
                    .save_at(object.bytes(), requested, storage_path)
                    .map_err(|e| RepositoryError::from_store(op, requested, e))?;
                requested.clone()
            }
            None => self
                .backend
                .save(object.bytes(), storage_path)
                .map_err(|e| RepositoryError::from_store(op, storage_path.display(), e))?,
        };
        debug!(id = %identifier, bytes = object.len(), "payload persisted");

        self.write_sidecar(op, &identifier, object.content_type(), metadata_path)?;
        self.commit_log(op, message);
        self.notify(&identifier, Some(object), RepositoryAction::Add, object.content_type());
        info!(id = %identifier, content_type = %object.content_type(), "stored object");
        Ok(identifier)
    }

    /// Fetch the object at `identifier` together with its content type.
    pub fn retrieve(
        &self,
        identifier: &Identifier,
        metadata_path: &Path,
    ) -> RepositoryResult<DigitalObject> {
        let op = Operation::Retrieve;
        let data = self
            .backend
            .get(identifier)
            .map_err(|e| RepositoryError::from_store(op, identifier, e))?;
        let content_type = self.read_sidecar(op, identifier, metadata_path)?;
        let object = DigitalObject::new(data, content_type);
        self.notify(identifier, Some(&object), RepositoryAction::Request, content_type);
        debug!(id = %identifier, bytes = object.len(), "retrieved object");
        Ok(object)
    }

    /// Rewrite an existing object's payload and content type in place.
    ///
    /// Fails with `NotFound` if nothing is stored at `identifier`.
    pub fn modify(
        &self,
        object: &DigitalObject,
        identifier: &Identifier,
        storage_path: &Path,
        metadata_path: &Path,
        message: &str,
    ) -> RepositoryResult<()> {
        let op = Operation::Modify;
        let _guard = self.write_guard();
        self.require_present(op, identifier)?;

        self.backend
            .save_at(object.bytes(), identifier, storage_path)
            .map_err(|e| RepositoryError::from_store(op, identifier, e))?;
        self.write_sidecar(op, identifier, object.content_type(), metadata_path)?;
        self.commit_log(op, message);
        self.notify(identifier, Some(object), RepositoryAction::Modify, object.content_type());
        info!(id = %identifier, content_type = %object.content_type(), "modified object");
        Ok(())
    }

    /// Remove the object at `identifier` and its sidecar.
    ///
    /// The content type is resolved first so the `DELETE` event can carry
    /// it; an unresolvable content type aborts the delete before anything is
    /// removed.
    pub fn delete(
        &self,
        identifier: &Identifier,
        metadata_path: &Path,
        message: &str,
    ) -> RepositoryResult<()> {
        let op = Operation::Delete;
        let _guard = self.write_guard();
        self.require_present(op, identifier)?;
        let content_type = self.read_sidecar(op, identifier, metadata_path)?;
        self.commit_log(op, message);

        self.backend
            .delete(identifier)
            .map_err(|e| RepositoryError::from_store(op, identifier, e))?;
        let sidecar = self.sidecar_identifier(op, identifier, metadata_path)?;
        self.backend.delete(&sidecar).map_err(|e| {
            error!(
                id = %identifier,
                sidecar = %sidecar,
                error = %e,
                "payload deleted but sidecar remains"
            );
            RepositoryError::from_store(op, &sidecar, e)
        })?;

        self.notify(identifier, None, RepositoryAction::Delete, content_type);
        info!(id = %identifier, "deleted object");
        Ok(())
    }

    /// Close the storage backend. Later operations fail with
    /// `StorageUnavailable`.
    pub fn close(&self) -> RepositoryResult<()> {
        let _guard = self.write_guard();
        self.backend
            .close()
            .map_err(|e| RepositoryError::from_store(Operation::Close, self.backend.scheme(), e))?;
        info!("repository closed");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn write_guard(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn require_present(&self, op: Operation, identifier: &Identifier) -> RepositoryResult<()> {
        let present = self
            .backend
            .exists(identifier)
            .map_err(|e| RepositoryError::from_store(op, identifier, e))?;
        if !present {
            return Err(RepositoryError::NotFound {
                operation: op,
                identifier: identifier.to_string(),
            });
        }
        Ok(())
    }

    fn sidecar_identifier(
        &self,
        op: Operation,
        identifier: &Identifier,
        metadata_path: &Path,
    ) -> RepositoryResult<Identifier> {
        self.backend
            .locate(metadata_path, identifier.name())
            .map_err(|e| RepositoryError::from_store(op, metadata_path.display(), e))
    }

    fn write_sidecar(
        &self,
        op: Operation,
        identifier: &Identifier,
        content_type: ContentType,
        metadata_path: &Path,
    ) -> RepositoryResult<()> {
        let partial = |source: StoreError| {
            error!(
                id = %identifier,
                error = %source,
                "payload persisted without content-type sidecar"
            );
            RepositoryError::PartialWriteInconsistency {
                operation: op,
                identifier: identifier.clone(),
                source,
            }
        };
        let sidecar = self
            .backend
            .locate(metadata_path, identifier.name())
            .map_err(partial)?;
        self.backend
            .save_at(&content_type.to_bytes(), &sidecar, metadata_path)
            .map_err(partial)?;
        debug!(id = %identifier, sidecar = %sidecar, "sidecar persisted");
        Ok(())
    }

    fn read_sidecar(
        &self,
        op: Operation,
        identifier: &Identifier,
        metadata_path: &Path,
    ) -> RepositoryResult<ContentType> {
        let sidecar = self
            .backend
            .locate(metadata_path, identifier.name())
            .map_err(|e| RepositoryError::unresolved(op, identifier, e))?;
        let bytes = self.backend.get(&sidecar).map_err(|e| {
            if e.is_not_found() {
                RepositoryError::unresolved(op, identifier, e)
            } else {
                RepositoryError::from_store(op, &sidecar, e)
            }
        })?;
        ContentType::from_bytes(&bytes).map_err(|e| RepositoryError::unresolved(op, identifier, e))
    }

    fn commit_log(&self, op: Operation, message: &str) {
        if message.is_empty() {
            return;
        }
        if let Err(e) = self.log_sink.commit(COMPONENT, &op.to_string(), message) {
            warn!(operation = %op, error = %e, "failed to commit log message");
        }
    }

    fn notify(
        &self,
        identifier: &Identifier,
        object: Option<&DigitalObject>,
        action: RepositoryAction,
        content_type: ContentType,
    ) {
        let outcome = self.observers.notify(&RepositoryEvent {
            identifier,
            object,
            action,
            content_type,
        });
        if outcome.failed > 0 {
            warn!(id = %identifier, %action, failed = outcome.failed, "some observers failed");
        }
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("scheme", &self.backend.scheme())
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::observer::RecordingObserver;
    use dor_store::InMemoryStorage;
    use std::io;

    const OBJECTS: &str = "objects";
    const METADATA: &str = "metadata";

    #[derive(Default)]
    struct RecordingSink {
        lines: Mutex<Vec<(String, String, String)>>,
    }

    impl LogSink for RecordingSink {
        fn commit(&self, component: &str, operation: &str, message: &str) -> io::Result<()> {
            self.lines.lock().unwrap().push((
                component.to_owned(),
                operation.to_owned(),
                message.to_owned(),
            ));
            Ok(())
        }
    }

    struct BrokenSink;

    impl LogSink for BrokenSink {
        fn commit(&self, _: &str, _: &str, _: &str) -> io::Result<()> {
            Err(io::Error::other("disk full"))
        }
    }

    fn repo() -> (Repository, Arc<InMemoryStorage>) {
        let backend = Arc::new(InMemoryStorage::new());
        (Repository::new(backend.clone()), backend)
    }

    fn paths() -> (&'static Path, &'static Path) {
        (Path::new(OBJECTS), Path::new(METADATA))
    }

    #[test]
    fn store_writes_payload_and_sidecar() {
        let (repo, backend) = repo();
        let (objects, metadata) = paths();
        let object = DigitalObject::new("<dc/>", ContentType::DublinCoreMetadata);
        let id = repo.store(&object, objects, metadata, None, "").unwrap();

        assert_eq!(backend.get(&id).unwrap(), b"<dc/>");
        let sidecar = backend.locate(metadata, id.name()).unwrap();
        assert_eq!(backend.get(&sidecar).unwrap(), b"DUBLIN_CORE_METADATA");
        assert_eq!(backend.len(), 2);
    }

    #[test]
    fn modify_rewrites_existing_object() {
        let (repo, _) = repo();
        let (objects, metadata) = paths();
        let recorder = Arc::new(RecordingObserver::new());
        repo.register_observer(recorder.clone());

        let id = repo
            .store(&DigitalObject::binary("v1"), objects, metadata, None, "")
            .unwrap();
        let updated = DigitalObject::new("<dc>v2</dc>", ContentType::DublinCoreMetadata);
        repo.modify(&updated, &id, objects, metadata, "edit").unwrap();

        assert_eq!(repo.retrieve(&id, metadata).unwrap(), updated);
        assert_eq!(
            recorder.actions(),
            vec![RepositoryAction::Add, RepositoryAction::Modify, RepositoryAction::Request]
        );
    }

    #[test]
    fn modify_missing_is_not_found() {
        let (repo, backend) = repo();
        let (objects, metadata) = paths();
        let id = backend.locate(objects, "ghost").unwrap();
        let err = repo
            .modify(&DigitalObject::binary("x"), &id, objects, metadata, "")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.operation(), Operation::Modify);
        assert!(backend.is_empty());
    }

    #[test]
    fn delete_commits_log_message() {
        let backend = Arc::new(InMemoryStorage::new());
        let sink = Arc::new(RecordingSink::default());
        let repo = Repository::with_log_sink(backend, sink.clone());
        let (objects, metadata) = paths();

        let id = repo
            .store(&DigitalObject::binary("x"), objects, metadata, None, "")
            .unwrap();
        repo.delete(&id, metadata, "retired").unwrap();

        let lines = sink.lines.lock().unwrap().clone();
        assert_eq!(
            lines,
            vec![("repository".to_owned(), "delete".to_owned(), "retired".to_owned())]
        );
    }

    #[test]
    fn failed_store_commits_no_log_message() {
        let backend = Arc::new(InMemoryStorage::new());
        let sink = Arc::new(RecordingSink::default());
        let repo = Repository::with_log_sink(backend, sink.clone());
        let (objects, metadata) = paths();

        let foreign = Identifier::parse("loc://objects/abc").unwrap();
        let err = repo
            .store(&DigitalObject::binary("x"), objects, metadata, Some(&foreign), "import")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LocationConstruction);
        assert!(sink.lines.lock().unwrap().is_empty());

        repo.store(&DigitalObject::binary("x"), objects, metadata, None, "import").unwrap();
        let lines = sink.lines.lock().unwrap().clone();
        assert_eq!(
            lines,
            vec![("repository".to_owned(), "store".to_owned(), "import".to_owned())]
        );
    }

    #[test]
    fn failing_log_sink_does_not_fail_delete() {
        let backend = Arc::new(InMemoryStorage::new());
        let repo = Repository::with_log_sink(backend.clone(), Arc::new(BrokenSink));
        let (objects, metadata) = paths();

        let id = repo
            .store(&DigitalObject::binary("x"), objects, metadata, None, "kept")
            .unwrap();
        repo.delete(&id, metadata, "gone").unwrap();
        assert!(backend.is_empty());
    }

    #[test]
    fn delete_with_unresolvable_content_type_keeps_payload() {
        let (repo, backend) = repo();
        let (objects, metadata) = paths();
        let recorder = Arc::new(RecordingObserver::new());

        let id = repo
            .store(&DigitalObject::binary("x"), objects, metadata, None, "")
            .unwrap();
        let sidecar = backend.locate(metadata, id.name()).unwrap();
        backend.save_at(b"SPREADSHEET", &sidecar, metadata).unwrap();
        repo.register_observer(recorder.clone());

        let err = repo.delete(&id, metadata, "").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ContentTypeUnresolved);
        assert!(backend.exists(&id).unwrap());
        assert!(recorder.events().is_empty());
    }

    #[test]
    fn delete_event_carries_content_type_without_object() {
        let (repo, _) = repo();
        let (objects, metadata) = paths();
        let recorder = Arc::new(RecordingObserver::new());
        repo.register_observer(recorder.clone());

        let object = DigitalObject::new("<dc/>", ContentType::DublinCoreMetadata);
        let id = repo.store(&object, objects, metadata, None, "").unwrap();
        repo.delete(&id, metadata, "").unwrap();

        let events = recorder.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].action, RepositoryAction::Delete);
        assert_eq!(events[1].identifier, id);
        assert_eq!(events[1].content_type, ContentType::DublinCoreMetadata);
        assert!(events[1].object.is_none());
        assert_eq!(events[0].object.as_ref(), Some(&object));
    }

    #[test]
    fn operations_after_close_are_unavailable() {
        let (repo, _) = repo();
        let (objects, metadata) = paths();
        let id = repo
            .store(&DigitalObject::binary("x"), objects, metadata, None, "")
            .unwrap();
        repo.close().unwrap();

        let err = repo.retrieve(&id, metadata).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StorageUnavailable);
        let err = repo
            .store(&DigitalObject::binary("y"), objects, metadata, None, "")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StorageUnavailable);
    }

    #[test]
    fn unregister_through_engine() {
        let (repo, _) = repo();
        let handle: Arc<dyn RepositoryObserver> = Arc::new(RecordingObserver::new());
        repo.register_observer(handle.clone());
        assert_eq!(repo.observers().len(), 1);
        assert!(repo.unregister_observer(&handle));
        assert!(!repo.unregister_observer(&handle));
        assert!(repo.observers().is_empty());
        assert!(format!("{repo:?}").contains("mem"));
    }
}
