//! Object lifecycle engine for the digital object repository.
//!
//! [`Repository`] stores opaque payloads through an injected
//! [`StorageBackend`](dor_store::StorageBackend), keeps each object's
//! content type in a sidecar record that shares the payload's name, and
//! fans lifecycle events out to registered [`RepositoryObserver`]s.
//!
//! ```text
//! adapter ─► Repository ─► backend (payload, then sidecar) ─► observers
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod log_sink;
pub mod observer;

pub use config::RepositoryConfig;
pub use engine::Repository;
pub use error::{ConfigError, ErrorKind, Operation, RepositoryError, RepositoryResult};
pub use log_sink::{FileLogSink, LogSink, TracingLogSink};
pub use observer::{
    Delivery, LoggingObserver, ObserverError, ObserverRegistry, RecordedEvent, RecordingObserver,
    RepositoryEvent, RepositoryObserver,
};
