//! Byte storage backends for the digital object repository.
//!
//! A backend persists opaque payloads under a storage-path namespace and
//! hands back a location-bearing [`Identifier`](dor_types::Identifier). The
//! lifecycle engine writes each object twice through the same backend: the
//! payload under the storage path, and its content-type sidecar under the
//! metadata path, both with the same object name.
//!
//! # Storage Backends
//!
//! All backends implement the [`StorageBackend`] trait:
//!
//! - [`FileStorage`] -- one file per object, `file://` locators
//! - [`InMemoryStorage`] -- map-based store for tests and embedding
//!
//! [`BackendConfig`] selects one at startup.
//!
//! # Design Rules
//!
//! 1. Generated names are `<timestamp><digest>`; identical payloads never
//!    share a name.
//! 2. Writing at a caller-supplied identifier either lands at exactly that
//!    locator or fails without writing.
//! 3. The store never interprets object contents.
//! 4. Absent objects are `NotFound` on read and on delete.
//! 5. All I/O errors are propagated, never silently ignored.

pub mod config;
pub mod error;
pub mod file;
pub mod memory;
pub mod naming;
pub mod traits;

pub use config::BackendConfig;
pub use error::{StoreError, StoreResult};
pub use file::FileStorage;
pub use memory::InMemoryStorage;
pub use naming::{payload_digest, NameGenerator};
pub use traits::StorageBackend;
