use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, HeaderName, StatusCode};
use axum::response::{IntoResponse, Json};
use dor_types::{ContentType, DigitalObject, Identifier};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::task;

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// Response header carrying the content-type token of a retrieved object.
pub const CONTENT_TYPE_TOKEN: HeaderName = HeaderName::from_static("x-dor-content-type");

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// Query parameters accepted by `/v1/objects`.
#[derive(Debug, Default, Deserialize)]
pub struct ObjectQuery {
    pub id: Option<String>,
    /// Content-type token; `BINARY` when absent.
    pub content_type: Option<String>,
    /// Log message attached to the action.
    #[serde(default)]
    pub message: String,
}

impl ObjectQuery {
    fn identifier(&self) -> ServerResult<Identifier> {
        let id = self
            .id
            .as_deref()
            .ok_or_else(|| ServerError::BadRequest("missing 'id' query parameter".into()))?;
        Ok(Identifier::parse(id)?)
    }

    fn content_type(&self) -> ServerResult<ContentType> {
        match &self.content_type {
            Some(token) => Ok(ContentType::from_token(token)?),
            None => Ok(ContentType::Binary),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StoredResponse {
    pub id: String,
    pub name: String,
    pub content_type: ContentType,
    pub bytes: usize,
}

/// Run blocking repository work off the async executor.
async fn blocking<T, F>(work: F) -> ServerResult<T>
where
    F: FnOnce() -> ServerResult<T> + Send + 'static,
    T: Send + 'static,
{
    task::spawn_blocking(work)
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?
}

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

pub async fn info_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "name": "dor-server",
        "version": env!("CARGO_PKG_VERSION"),
        "backend": state.repository.backend().scheme(),
        "observers": state.repository.observers().len(),
        "content_types": ContentType::ALL.iter().map(|c| c.token()).collect::<Vec<_>>(),
    }))
}

/// `POST /v1/objects`: store the body under a generated identifier.
pub async fn store_handler(
    State(state): State<AppState>,
    Query(query): Query<ObjectQuery>,
    body: Bytes,
) -> ServerResult<(StatusCode, Json<StoredResponse>)> {
    let object = DigitalObject::new(body.to_vec(), query.content_type()?);
    store(state, object, None, query.message).await
}

/// `PUT /v1/objects?id=`: store the body at the given identifier, replacing
/// any object already there.
pub async fn store_at_handler(
    State(state): State<AppState>,
    Query(query): Query<ObjectQuery>,
    body: Bytes,
) -> ServerResult<(StatusCode, Json<StoredResponse>)> {
    let identifier = query.identifier()?;
    let object = DigitalObject::new(body.to_vec(), query.content_type()?);
    store(state, object, Some(identifier), query.message).await
}

async fn store(
    state: AppState,
    object: DigitalObject,
    identifier: Option<Identifier>,
    message: String,
) -> ServerResult<(StatusCode, Json<StoredResponse>)> {
    let (content_type, bytes) = (object.content_type(), object.len());
    let id = blocking(move || {
        Ok(state.repository.store(
            &object,
            &state.storage_path,
            &state.metadata_path,
            identifier.as_ref(),
            &message,
        )?)
    })
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(StoredResponse {
            name: id.name().to_owned(),
            id: id.to_string(),
            content_type,
            bytes,
        }),
    ))
}

/// `GET /v1/objects?id=`: the stored payload with its content type.
pub async fn retrieve_handler(
    State(state): State<AppState>,
    Query(query): Query<ObjectQuery>,
) -> ServerResult<impl IntoResponse> {
    let identifier = query.identifier()?;
    let object = blocking(move || {
        Ok(state
            .repository
            .retrieve(&identifier, &state.metadata_path)?)
    })
    .await?;
    let (data, content_type) = object.into_parts();
    Ok((
        [
            (header::CONTENT_TYPE, content_type.mime_type()),
            (CONTENT_TYPE_TOKEN, content_type.token()),
        ],
        data,
    ))
}

/// `DELETE /v1/objects?id=`.
pub async fn delete_handler(
    State(state): State<AppState>,
    Query(query): Query<ObjectQuery>,
) -> ServerResult<StatusCode> {
    let identifier = query.identifier()?;
    let message = query.message;
    blocking(move || {
        Ok(state
            .repository
            .delete(&identifier, &state.metadata_path, &message)?)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
