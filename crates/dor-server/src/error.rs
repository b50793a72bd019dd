use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use dor_repository::{ConfigError, ErrorKind, RepositoryError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<dor_types::TypeError> for ServerError {
    fn from(e: dor_types::TypeError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl From<ConfigError> for ServerError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

impl ServerError {
    /// HTTP status and the `error` field of the response body.
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Repository(e) => match e.kind() {
                ErrorKind::NotFound => (StatusCode::NOT_FOUND, "not_found"),
                ErrorKind::LocationConstruction => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "location_construction")
                }
                ErrorKind::ContentTypeUnresolved => {
                    (StatusCode::CONFLICT, "content_type_unresolved")
                }
                ErrorKind::PartialWriteInconsistency => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "partial_write_inconsistency")
                }
                ErrorKind::StorageUnavailable => {
                    (StatusCode::SERVICE_UNAVAILABLE, "storage_unavailable")
                }
            },
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, kind, "request failed");
        } else {
            tracing::debug!(error = %self, kind, "request rejected");
        }
        (status, Json(json!({ "error": kind, "message": self.to_string() }))).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
