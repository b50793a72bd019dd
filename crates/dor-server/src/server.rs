use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// HTTP front end for one repository.
pub struct DorServer {
    config: ServerConfig,
    state: AppState,
}

impl DorServer {
    /// Open the configured repository.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let state = AppState::open(&config.repository)?;
        Ok(Self { config, state })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone(), self.config.max_body_bytes)
    }

    /// Serve requests until the listener fails, then close the repository.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!(
            addr = %self.config.bind_addr,
            storage_path = %self.config.repository.storage_path.display(),
            "DOR server listening"
        );
        let served = axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()));
        self.state.repository.close()?;
        served
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dor_store::BackendConfig;

    fn memory_config() -> ServerConfig {
        let mut config = ServerConfig::default();
        config.repository.backend = BackendConfig::Memory;
        config
    }

    #[test]
    fn server_construction() {
        let server = DorServer::new(memory_config()).unwrap();
        assert_eq!(server.config().bind_addr, "127.0.0.1:8085".parse().unwrap());
        assert_eq!(server.state().repository.backend().scheme(), "mem");
    }

    #[test]
    fn router_builds() {
        let server = DorServer::new(memory_config()).unwrap();
        let _router = server.router();
    }

    #[test]
    fn unwritable_log_file_fails_construction() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, b"").unwrap();
        let mut config = memory_config();
        config.repository.log_file = Some(blocker.join("dor.log"));
        assert!(matches!(DorServer::new(config), Err(ServerError::Config(_))));
    }
}
