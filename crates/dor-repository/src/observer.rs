use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};

use dor_types::{ContentType, DigitalObject, Identifier, RepositoryAction};
use tracing::{debug, info, warn};

/// Error type observers may return. Logged by the registry, never propagated.
pub type ObserverError = Box<dyn std::error::Error + Send + Sync>;

/// One lifecycle notification.
#[derive(Clone, Copy, Debug)]
pub struct RepositoryEvent<'a> {
    /// The object the action was performed on.
    pub identifier: &'a Identifier,
    /// The object itself, when the action has one to show (not on delete).
    pub object: Option<&'a DigitalObject>,
    pub action: RepositoryAction,
    pub content_type: ContentType,
}

/// Listener notified of repository actions.
///
/// Observers receive the identifier for reference only. They must not use it
/// to reach around the repository into the storage backend.
pub trait RepositoryObserver: Send + Sync {
    fn receive(&self, event: &RepositoryEvent<'_>) -> Result<(), ObserverError>;
}

/// Outcome of one fan-out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: usize,
    pub failed: usize,
}

/// Ordered list of registered observers with synchronous fan-out.
///
/// - Registration appends without deduplication; an observer registered
///   twice is notified twice.
/// - `notify` delivers to the registrations present when it is called, in
///   registration order. Observers registered during delivery see the next
///   event, not the current one.
/// - Fan-outs are serialized: one event reaches every observer before the
///   next event starts.
/// - An observer that errors or panics is logged and skipped; delivery to
///   the rest continues.
pub struct ObserverRegistry {
    observers: Mutex<Vec<Arc<dyn RepositoryObserver>>>,
    delivery: Mutex<()>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self {
            observers: Mutex::new(Vec::new()),
            delivery: Mutex::new(()),
        }
    }

    pub fn register(&self, observer: Arc<dyn RepositoryObserver>) {
        let mut observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
        observers.push(observer);
        debug!(registrations = observers.len(), "observer registered");
    }

    /// Remove one registration of `observer`. Returns `false` (and does
    /// nothing) if it was not registered.
    pub fn unregister(&self, observer: &Arc<dyn RepositoryObserver>) -> bool {
        let mut observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
        let position = observers
            .iter()
            .position(|o| std::ptr::addr_eq(Arc::as_ptr(o), Arc::as_ptr(observer)));
        match position {
            Some(index) => {
                observers.remove(index);
                debug!(registrations = observers.len(), "observer unregistered");
                true
            }
            None => false,
        }
    }

    /// Number of active registrations.
    pub fn len(&self) -> usize {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `event` to every current registration.
    pub fn notify(&self, event: &RepositoryEvent<'_>) -> Delivery {
        let snapshot: Vec<Arc<dyn RepositoryObserver>> = self
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let _serial = self.delivery.lock().unwrap_or_else(PoisonError::into_inner);
        let mut outcome = Delivery::default();
        for (index, observer) in snapshot.iter().enumerate() {
            match panic::catch_unwind(AssertUnwindSafe(|| observer.receive(event))) {
                Ok(Ok(())) => outcome.delivered += 1,
                Ok(Err(e)) => {
                    outcome.failed += 1;
                    warn!(
                        observer = index,
                        action = %event.action,
                        id = %event.identifier,
                        error = %e,
                        "observer failed"
                    );
                }
                Err(payload) => {
                    outcome.failed += 1;
                    warn!(
                        observer = index,
                        action = %event.action,
                        id = %event.identifier,
                        panic = panic_message(payload.as_ref()),
                        "observer panicked"
                    );
                }
            }
        }
        outcome
    }
}

impl Default for ObserverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("registrations", &self.len())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Observer that writes every event to the `tracing` log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingObserver;

impl RepositoryObserver for LoggingObserver {
    fn receive(&self, event: &RepositoryEvent<'_>) -> Result<(), ObserverError> {
        info!(
            action = %event.action,
            id = %event.identifier,
            content_type = %event.content_type,
            bytes = event.object.map(DigitalObject::len),
            "repository event"
        );
        Ok(())
    }
}

/// Observer that keeps every event it receives. Useful in tests and for
/// adapters that want to inspect recent activity.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<RecordedEvent>>,
}

/// Owned copy of a [`RepositoryEvent`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedEvent {
    pub identifier: Identifier,
    pub action: RepositoryAction,
    pub content_type: ContentType,
    pub object: Option<DigitalObject>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far, oldest first.
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Actions received so far, oldest first.
    pub fn actions(&self) -> Vec<RepositoryAction> {
        self.events().into_iter().map(|e| e.action).collect()
    }
}

impl RepositoryObserver for RecordingObserver {
    fn receive(&self, event: &RepositoryEvent<'_>) -> Result<(), ObserverError> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedEvent {
                identifier: event.identifier.clone(),
                action: event.action,
                content_type: event.content_type,
                object: event.object.cloned(),
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identifier() -> Identifier {
        Identifier::parse("mem:///objects/1").unwrap()
    }

    fn event(id: &Identifier, action: RepositoryAction) -> RepositoryEvent<'_> {
        RepositoryEvent {
            identifier: id,
            object: None,
            action,
            content_type: ContentType::Binary,
        }
    }

    struct FailingObserver;

    impl RepositoryObserver for FailingObserver {
        fn receive(&self, _event: &RepositoryEvent<'_>) -> Result<(), ObserverError> {
            Err("index unavailable".into())
        }
    }

    struct PanickingObserver;

    impl RepositoryObserver for PanickingObserver {
        fn receive(&self, _event: &RepositoryEvent<'_>) -> Result<(), ObserverError> {
            panic!("observer bug");
        }
    }

    /// Registers `late` on the registry the first time it is notified.
    struct RegisteringObserver {
        registry: Arc<ObserverRegistry>,
        late: Arc<dyn RepositoryObserver>,
    }

    impl RepositoryObserver for RegisteringObserver {
        fn receive(&self, _event: &RepositoryEvent<'_>) -> Result<(), ObserverError> {
            self.registry.register(Arc::clone(&self.late));
            Ok(())
        }
    }

    #[test]
    fn notifies_in_registration_order() {
        let registry = ObserverRegistry::new();
        let first = Arc::new(RecordingObserver::new());
        let second = Arc::new(RecordingObserver::new());
        registry.register(first.clone());
        registry.register(second.clone());

        let id = identifier();
        let outcome = registry.notify(&event(&id, RepositoryAction::Add));
        assert_eq!(outcome, Delivery { delivered: 2, failed: 0 });
        assert_eq!(first.actions(), vec![RepositoryAction::Add]);
        assert_eq!(second.actions(), vec![RepositoryAction::Add]);
    }

    #[test]
    fn double_registration_means_double_delivery() {
        let registry = ObserverRegistry::new();
        let recorder = Arc::new(RecordingObserver::new());
        let handle: Arc<dyn RepositoryObserver> = recorder.clone();
        registry.register(handle.clone());
        registry.register(handle.clone());

        let id = identifier();
        registry.notify(&event(&id, RepositoryAction::Add));
        assert_eq!(recorder.events().len(), 2);

        assert!(registry.unregister(&handle));
        assert_eq!(registry.len(), 1);
        registry.notify(&event(&id, RepositoryAction::Delete));
        assert_eq!(recorder.events().len(), 3);
    }

    #[test]
    fn unregister_unknown_is_noop() {
        let registry = ObserverRegistry::new();
        let registered: Arc<dyn RepositoryObserver> = Arc::new(RecordingObserver::new());
        let stranger: Arc<dyn RepositoryObserver> = Arc::new(RecordingObserver::new());
        registry.register(registered);
        assert!(!registry.unregister(&stranger));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn failing_observer_does_not_stop_delivery() {
        let registry = ObserverRegistry::new();
        let recorder = Arc::new(RecordingObserver::new());
        registry.register(Arc::new(FailingObserver));
        registry.register(Arc::new(PanickingObserver));
        registry.register(recorder.clone());

        let id = identifier();
        let outcome = registry.notify(&event(&id, RepositoryAction::Request));
        assert_eq!(outcome, Delivery { delivered: 1, failed: 2 });
        assert_eq!(recorder.actions(), vec![RepositoryAction::Request]);

        // The registry stays usable after a panic.
        let outcome = registry.notify(&event(&id, RepositoryAction::Request));
        assert_eq!(outcome.delivered, 1);
    }

    #[test]
    fn observers_registered_during_delivery_wait_for_next_event() {
        let registry = Arc::new(ObserverRegistry::new());
        let late = Arc::new(RecordingObserver::new());
        registry.register(Arc::new(RegisteringObserver {
            registry: Arc::clone(&registry),
            late: late.clone(),
        }));

        let id = identifier();
        registry.notify(&event(&id, RepositoryAction::Add));
        assert!(late.events().is_empty());
        assert_eq!(registry.len(), 2);

        registry.notify(&event(&id, RepositoryAction::Modify));
        assert_eq!(late.actions(), vec![RepositoryAction::Modify]);
    }

    #[test]
    fn empty_registry_delivers_nothing() {
        let registry = ObserverRegistry::default();
        assert!(registry.is_empty());
        let id = identifier();
        assert_eq!(registry.notify(&event(&id, RepositoryAction::Add)), Delivery::default());
    }

    #[test]
    fn logging_observer_accepts_events() {
        let id = identifier();
        assert!(LoggingObserver.receive(&event(&id, RepositoryAction::Add)).is_ok());
    }
}
