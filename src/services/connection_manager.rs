use std::sync::Arc;

use tokio::sync::RwLock;

use crate::backend::{Backend, BackendFactory, RedisBackendFactory};
use crate::config::{BackendConfig, BackendTarget};
use crate::error::AppResult;
use crate::utils::parse_endpoint;

#[derive(Default)]
struct State {
    config: Option<BackendConfig>,
    active: Option<Arc<dyn Backend>>,
}

/// Owns backend selection and the active connection.
///
/// Share it as `Arc<ConnectionManager>`. Reconfiguring swaps the connection for
/// every holder, so callers should do it before steady-state traffic starts.
pub struct ConnectionManager {
    default_config: BackendConfig,
    factory: Arc<dyn BackendFactory>,
    state: RwLock<State>,
}

impl ConnectionManager {
    /// Create a manager backed by real Redis clients.
    ///
    /// `default_config` is used only if nothing was configured before the first command.
    pub fn new(default_config: BackendConfig) -> Self {
        Self::with_factory(default_config, Arc::new(RedisBackendFactory))
    }

    pub fn with_factory(default_config: BackendConfig, factory: Arc<dyn BackendFactory>) -> Self {
        Self {
            default_config,
            factory,
            state: RwLock::new(State::default()),
        }
    }

    /// Record `config` and build a fresh connection from it.
    pub async fn set_backend(&self, config: BackendConfig) -> AppResult<Arc<dyn Backend>> {
        let backend = self.build(&config)?;

        let mut state = self.state.write().await;
        state.config = Some(config);
        state.active = Some(backend.clone());

        Ok(backend)
    }

    /// Rebuild the connection from the last recorded configuration.
    ///
    /// Returns `Ok(None)` when nothing was ever configured.
    pub async fn reset_backend(&self) -> AppResult<Option<Arc<dyn Backend>>> {
        let mut state = self.state.write().await;
        let Some(config) = state.config.clone() else {
            return Ok(None);
        };

        let backend = self.build(&config)?;
        state.active = Some(backend.clone());

        Ok(Some(backend))
    }

    /// The current connection, built on demand.
    pub async fn active_connection(&self) -> AppResult<Arc<dyn Backend>> {
        if let Some(backend) = self.state.read().await.active.clone() {
            return Ok(backend);
        }

        if let Some(backend) = self.reset_backend().await? {
            return Ok(backend);
        }

        tracing::debug!("No backend configured, falling back to default");
        self.set_backend(self.default_config.clone()).await
    }

    /// The last configuration recorded by [`set_backend`](Self::set_backend).
    pub async fn config(&self) -> Option<BackendConfig> {
        self.state.read().await.config.clone()
    }

    fn build(&self, config: &BackendConfig) -> AppResult<Arc<dyn Backend>> {
        config.validate()?;

        match &config.server {
            BackendTarget::Cluster(endpoints) => {
                tracing::info!(
                    "Connecting to Redis cluster {:?} (mode: {})",
                    endpoints,
                    config.mode
                );
                self.factory.cluster(endpoints, config)
            }
            BackendTarget::Single(server) => {
                let (host, port) = parse_endpoint(server)?;
                tracing::info!(
                    "Connecting to Redis {}:{} db {} (mode: {})",
                    host,
                    port,
                    config.database,
                    config.mode
                );
                self.factory.single(&host, port, config)
            }
        }
    }
}
