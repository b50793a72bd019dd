use std::path::PathBuf;

use dor_types::TypeError;

/// Errors from storage backend operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A locator could not be built, or the backend cannot address it.
    #[error("cannot construct storage location for {location}: {reason}")]
    LocationConstruction { location: String, reason: String },

    /// A storage-path namespace could not be created or opened.
    #[error("storage path {} unavailable: {source}", path.display())]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The requested object was not found.
    #[error("object not found: {0}")]
    NotFound(String),

    /// I/O error while reading, writing, or removing an object.
    #[error("{operation} failed for {locator}: {source}")]
    Io {
        operation: &'static str,
        locator: String,
        #[source]
        source: std::io::Error,
    },

    /// A locator string did not form a valid identifier.
    #[error("invalid identifier: {0}")]
    Type(#[from] TypeError),

    /// The backend has been closed.
    #[error("storage backend is closed")]
    Closed,
}

impl StoreError {
    pub(crate) fn location(location: impl ToString, reason: impl Into<String>) -> Self {
        Self::LocationConstruction {
            location: location.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if the error means the target does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
