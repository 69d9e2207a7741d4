//! Main integration module for the model serving runtime
//!
//! Wires configuration, the model repository, the worker pool, the
//! dataplane, and the protocol router into one server with an explicit
//! start/stop lifecycle. The repository is constructed here and passed by
//! reference everywhere; there is no module-level global.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use common::error::Error;
use dataplane::{Dataplane, WorkerPool};

// Re-exports for embedding applications
pub use common::{
    InferRequest, InferResponse, InferTensor, ModelMetadata, ProtocolVersion, TensorDataType,
};
pub use config::ServerConfig;
pub use model_repository::{Model, ModelCapabilities, ModelRepository, ModelState};
pub use storage_adapter::{ModelStorage, StorageResolver};

/// The model inference server
pub struct ModelServer {
    /// Server configuration
    config: ServerConfig,

    /// Model repository
    repository: Arc<ModelRepository>,

    /// Worker pool for blocking model calls
    pool: Arc<WorkerPool>,

    /// Protocol-agnostic request orchestrator
    dataplane: Arc<Dataplane>,

    /// Graceful-shutdown trigger for the HTTP listener; present while the
    /// server is running
    shutdown_tx: Mutex<Option<oneshot::Sender<()>>>,

    /// Handle of the spawned HTTP listener task
    server_task: Mutex<Option<JoinHandle<()>>>,

    /// Bound listener address, once started
    local_addr: Mutex<Option<SocketAddr>>,
}

impl ModelServer {
    /// Creates a new server from the given configuration
    pub fn new(config: ServerConfig) -> Result<Self> {
        config.validate()?;

        let repository = Arc::new(ModelRepository::new());
        let pool = Arc::new(WorkerPool::new(
            config.worker_pool_size,
            config.worker_queue_depth,
        )?);
        let dataplane = Arc::new(Dataplane::new(repository.clone(), pool.clone(), &config));

        Ok(Self {
            config,
            repository,
            pool,
            dataplane,
            shutdown_tx: Mutex::new(None),
            server_task: Mutex::new(None),
            local_addr: Mutex::new(None),
        })
    }

    /// Registers a model implementation. Models registered before `start`
    /// and named in the configured model set are loaded during startup.
    pub fn register_model(&self, model: Arc<dyn Model>) {
        self.repository.register(model);
    }

    /// Starts the server: loads the configured model set and binds the
    /// HTTP protocol surface
    pub async fn start(&self) -> Result<()> {
        if self.shutdown_tx.lock().is_some() {
            return Ok(());
        }

        info!("Starting model server");

        self.load_startup_models().await?;

        let app = api_gateway::build_router(self.dataplane.clone());
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.http_port));

        let server = axum::Server::try_bind(&addr)
            .map_err(|e| Error::Config(format!("Failed to bind {}: {}", addr, e)))?
            .serve(app.into_make_service());
        let local_addr = server.local_addr();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let graceful = server.with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });

        let handle = tokio::spawn(async move {
            if let Err(e) = graceful.await {
                error!("HTTP server error: {}", e);
            }
        });

        *self.shutdown_tx.lock() = Some(shutdown_tx);
        *self.server_task.lock() = Some(handle);
        *self.local_addr.lock() = Some(local_addr);

        info!("Model server listening on {}", local_addr);

        Ok(())
    }

    /// Loads every configured model that has a registered implementation
    async fn load_startup_models(&self) -> Result<()> {
        for name in &self.config.registered_models {
            if self.repository.get(name).is_none() {
                warn!(
                    "Model {} is configured but has no registered implementation, skipping",
                    name
                );
                continue;
            }
            self.repository.load(name).await?;
        }

        Ok(())
    }

    /// Stops the server: shuts the HTTP listener down gracefully and joins
    /// the worker pool
    pub async fn stop(&self) -> Result<()> {
        let shutdown_tx = match self.shutdown_tx.lock().take() {
            Some(tx) => tx,
            None => return Ok(()),
        };

        info!("Stopping model server");

        let _ = shutdown_tx.send(());

        let handle = self.server_task.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }

        self.pool.shutdown();
        *self.local_addr.lock() = None;

        info!("Model server stopped");

        Ok(())
    }

    /// The address the HTTP listener is bound to, while running
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock()
    }

    /// Gets the dataplane
    pub fn dataplane(&self) -> Arc<Dataplane> {
        self.dataplane.clone()
    }

    /// Gets the model repository
    pub fn repository(&self) -> Arc<ModelRepository> {
        self.repository.clone()
    }

    /// Gets the configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}
