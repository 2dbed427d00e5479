//! Server node composition.
//!
//! Wires together the store, matcher, auth, and HTTP surface via
//! dependency injection.

use crate::auth::AdminAuth;
use crate::config::ServerConfig;
use crate::health::HealthChecker;
use crate::http::{AppState, HttpServer, HttpServerError};
use crate::metrics::PrometheusMeter;
use muse_match::LinearMatcher;
use muse_store::{DescriptorStore, FsCatalog};
use std::net::SocketAddr;
use std::sync::Arc;

/// Server node - main composition root.
///
/// Holds all components and manages their lifecycle.
pub struct Node {
    config: ServerConfig,
    store: Arc<DescriptorStore>,
    meter: Arc<PrometheusMeter>,
    http_server: Option<HttpServer>,
}

impl Node {
    /// Create a new node from configuration.
    ///
    /// The store is constructed but not yet loaded; [`start`] performs the
    /// initial catalog load before the HTTP listener accepts traffic.
    ///
    /// [`start`]: Node::start
    pub async fn new(config: ServerConfig) -> Result<Self, NodeError> {
        tracing::info!("Initializing node");

        let meter = Arc::new(PrometheusMeter::new());

        let store = match &config.data_dir {
            Some(dir) => {
                tracing::info!("Data directory: {}", dir.display());
                Arc::new(DescriptorStore::new_with_meter(
                    Box::new(FsCatalog::new(dir)),
                    meter.clone(),
                ))
            }
            None => {
                tracing::warn!("No data_dir configured, catalog is in-memory only");
                Arc::new(DescriptorStore::in_memory_with_meter(meter.clone()))
            }
        };

        Ok(Self {
            config,
            store,
            meter,
            http_server: None,
        })
    }

    /// Load the catalog cache and start serving.
    pub async fn start(&mut self) -> Result<(), NodeError> {
        // Populate the cache before the listener opens; match requests
        // never see a NotReady store in normal operation.
        self.store
            .load()
            .map_err(|e| NodeError::Initialization(format!("Catalog load failed: {}", e)))?;

        let addr: SocketAddr = self
            .config
            .listen_addr
            .parse()
            .map_err(|e| NodeError::Initialization(format!("Invalid listen_addr: {}", e)))?;

        let state = AppState {
            store: Arc::clone(&self.store),
            matcher: Arc::new(LinearMatcher),
            auth: AdminAuth::new(self.config.admin_token.clone()),
            matching: self.config.matching.clone(),
            meter: Arc::clone(&self.meter),
            health_checker: Arc::new(HealthChecker::new(Arc::clone(&self.store))),
            serve_metrics: self.config.telemetry.prometheus.enabled,
        };

        let mut http_server = HttpServer::new(addr, state);
        http_server.start().await?;
        self.http_server = Some(http_server);

        Ok(())
    }

    /// Graceful shutdown.
    pub async fn shutdown(self) -> Result<(), NodeError> {
        if let Some(http_server) = self.http_server {
            http_server.shutdown().await?;
        }
        Ok(())
    }

    /// The underlying store (exposed for tests).
    pub fn store(&self) -> Arc<DescriptorStore> {
        Arc::clone(&self.store)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("Initialization error: {0}")]
    Initialization(String),

    #[error(transparent)]
    Http(#[from] HttpServerError),
}
