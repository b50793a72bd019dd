use std::fmt;
use std::path::PathBuf;

use dor_store::StoreError;
use dor_types::Identifier;
use serde::Serialize;

/// The engine operation an error arose in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Store,
    Retrieve,
    Modify,
    Delete,
    Close,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Store => "store",
            Self::Retrieve => "retrieve",
            Self::Modify => "modify",
            Self::Delete => "delete",
            Self::Close => "close",
        };
        f.write_str(s)
    }
}

/// Coarse error classification adapters translate into their own failure
/// representation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    LocationConstruction,
    StorageUnavailable,
    NotFound,
    ContentTypeUnresolved,
    PartialWriteInconsistency,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::LocationConstruction => "location_construction",
            Self::StorageUnavailable => "storage_unavailable",
            Self::NotFound => "not_found",
            Self::ContentTypeUnresolved => "content_type_unresolved",
            Self::PartialWriteInconsistency => "partial_write_inconsistency",
        };
        f.write_str(s)
    }
}

/// Errors from lifecycle engine operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// The identifier or locator could not be built, or the backend cannot
    /// honor a caller-supplied identifier exactly. Nothing was persisted.
    #[error("{operation}: cannot construct location for {target}: {source}")]
    LocationConstruction {
        operation: Operation,
        target: String,
        #[source]
        source: StoreError,
    },

    /// The backend could not be reached, initialized, or written.
    #[error("{operation}: storage unavailable for {target}: {source}")]
    StorageUnavailable {
        operation: Operation,
        target: String,
        #[source]
        source: StoreError,
    },

    /// The target object does not exist.
    #[error("{operation}: object not found: {identifier}")]
    NotFound {
        operation: Operation,
        identifier: String,
    },

    /// The content-type sidecar is missing or does not decode to exactly one
    /// registered content type.
    #[error("{operation}: content type unresolved for {identifier}: {reason}")]
    ContentTypeUnresolved {
        operation: Operation,
        identifier: Identifier,
        reason: String,
    },

    /// The payload was persisted but its content-type sidecar was not. The
    /// payload stays in place; callers may retry the sidecar or remove the
    /// orphan.
    #[error("{operation}: payload stored at {identifier} but content-type sidecar failed: {source}")]
    PartialWriteInconsistency {
        operation: Operation,
        identifier: Identifier,
        #[source]
        source: StoreError,
    },
}

impl RepositoryError {
    /// Classify a backend error raised while working on `target`.
    pub(crate) fn from_store(operation: Operation, target: impl ToString, err: StoreError) -> Self {
        let target = target.to_string();
        match err {
            StoreError::NotFound(identifier) => Self::NotFound {
                operation,
                identifier,
            },
            StoreError::LocationConstruction { .. } | StoreError::Type(_) => {
                Self::LocationConstruction {
                    operation,
                    target,
                    source: err,
                }
            }
            StoreError::Unavailable { .. } | StoreError::Io { .. } | StoreError::Closed => {
                Self::StorageUnavailable {
                    operation,
                    target,
                    source: err,
                }
            }
        }
    }

    pub(crate) fn unresolved(
        operation: Operation,
        identifier: &Identifier,
        reason: impl fmt::Display,
    ) -> Self {
        Self::ContentTypeUnresolved {
            operation,
            identifier: identifier.clone(),
            reason: reason.to_string(),
        }
    }

    /// The classification adapters map to their own status codes.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::LocationConstruction { .. } => ErrorKind::LocationConstruction,
            Self::StorageUnavailable { .. } => ErrorKind::StorageUnavailable,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::ContentTypeUnresolved { .. } => ErrorKind::ContentTypeUnresolved,
            Self::PartialWriteInconsistency { .. } => ErrorKind::PartialWriteInconsistency,
        }
    }

    /// The operation that failed.
    pub fn operation(&self) -> Operation {
        match self {
            Self::LocationConstruction { operation, .. }
            | Self::StorageUnavailable { operation, .. }
            | Self::NotFound { operation, .. }
            | Self::ContentTypeUnresolved { operation, .. }
            | Self::PartialWriteInconsistency { operation, .. } => *operation,
        }
    }
}

/// Result alias for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Errors loading a [`RepositoryConfig`](crate::RepositoryConfig) or opening
/// the repository it describes.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("cannot open log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_are_classified() {
        let not_found = RepositoryError::from_store(
            Operation::Retrieve,
            "mem:///objects/1",
            StoreError::NotFound("mem:///objects/1".into()),
        );
        assert_eq!(not_found.kind(), ErrorKind::NotFound);

        let unavailable = RepositoryError::from_store(
            Operation::Store,
            "/nope",
            StoreError::Unavailable {
                path: PathBuf::from("/nope"),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            },
        );
        assert_eq!(unavailable.kind(), ErrorKind::StorageUnavailable);
        assert_eq!(unavailable.operation(), Operation::Store);

        let closed = RepositoryError::from_store(Operation::Delete, "x", StoreError::Closed);
        assert_eq!(closed.kind(), ErrorKind::StorageUnavailable);

        let location = RepositoryError::from_store(
            Operation::Store,
            "loc://store/abc",
            StoreError::LocationConstruction {
                location: "loc://store/abc".into(),
                reason: "wrong scheme".into(),
            },
        );
        assert_eq!(location.kind(), ErrorKind::LocationConstruction);
    }

    #[test]
    fn display_names_operation_and_target() {
        let err = RepositoryError::NotFound {
            operation: Operation::Delete,
            identifier: "mem:///objects/42".into(),
        };
        assert_eq!(err.to_string(), "delete: object not found: mem:///objects/42");
    }

    #[test]
    fn kind_display() {
        assert_eq!(
            ErrorKind::PartialWriteInconsistency.to_string(),
            "partial_write_inconsistency"
        );
        assert_eq!(ErrorKind::NotFound.to_string(), "not_found");
    }
}
