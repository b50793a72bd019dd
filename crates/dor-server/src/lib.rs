//! HTTP resource adapter for the digital object repository.
//!
//! Exposes one [`Repository`](dor_repository::Repository) over a small REST
//! surface:
//!
//! | Method | Path | Action |
//! |--------|------|--------|
//! | `POST` | `/v1/objects?content_type=&message=` | store under a generated identifier |
//! | `PUT` | `/v1/objects?id=&content_type=&message=` | store at `id` |
//! | `GET` | `/v1/objects?id=` | retrieve |
//! | `DELETE` | `/v1/objects?id=&message=` | delete |
//! | `GET` | `/v1/health`, `/v1/info` | status |
//!
//! Repository error kinds are mapped to status codes, never masked.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::DorServer;
pub use state::AppState;
