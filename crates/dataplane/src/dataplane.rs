//! Dataplane implementation
//!
//! The dataplane is the protocol-agnostic orchestrator: every adapter routes
//! its decoded requests through here. For each request it resolves the
//! model, enforces the readiness gate, runs preprocess → predict →
//! postprocess in order under the request deadline, and keeps blocking
//! model calls on the worker pool so the async scheduler stays responsive.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use common::context::RequestContext;
use common::error::{Error, InferenceStage, Result};
use common::infer::{InferRequest, InferResponse, ModelMetadata};
use config::ServerConfig;
use model_repository::{Model, ModelRepository};

use crate::executor::WorkerPool;

/// Server name reported by the metadata endpoint
pub const SERVER_NAME: &str = "model-server";

/// Request header carrying a caller-assigned request id
const REQUEST_ID_HEADER: &str = "x-request-id";

/// Liveness probe response
#[derive(Debug, Clone, Serialize)]
pub struct ServerLive {
    /// Always `"alive"` on a successful invocation
    pub status: String,
}

/// Server metadata response
#[derive(Debug, Clone, Serialize)]
pub struct ServerMetadata {
    /// Server name
    pub name: String,

    /// Server version
    pub version: String,

    /// Protocol extensions supported by this server
    pub extensions: Vec<String>,
}

/// Which model capability a request exercises
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verb {
    Predict,
    Explain,
}

/// Protocol-agnostic request orchestrator
pub struct Dataplane {
    /// Model repository shared with the server lifecycle
    repository: Arc<ModelRepository>,

    /// Bounded pool executing blocking model calls
    pool: Arc<WorkerPool>,

    /// Default per-request timeout
    request_timeout: std::time::Duration,
}

impl Dataplane {
    /// Creates a dataplane over the given repository and worker pool
    pub fn new(
        repository: Arc<ModelRepository>,
        pool: Arc<WorkerPool>,
        config: &ServerConfig,
    ) -> Self {
        Self {
            repository,
            pool,
            request_timeout: config.request_timeout(),
        }
    }

    /// Server liveness, used by the Kubernetes-style liveness probe
    pub fn live(&self) -> ServerLive {
        ServerLive {
            status: "alive".to_string(),
        }
    }

    /// Server readiness, used by the Kubernetes-style readiness probe
    pub fn ready(&self) -> bool {
        true
    }

    /// Server metadata
    pub fn metadata(&self) -> ServerMetadata {
        ServerMetadata {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            extensions: vec!["model_repository_extension".to_string()],
        }
    }

    /// Metadata for a specific model
    pub fn model_metadata(&self, name: &str) -> Result<ModelMetadata> {
        let model = self
            .repository
            .get(name)
            .ok_or_else(|| Error::ModelNotFound(name.to_string()))?;

        Ok(model.metadata())
    }

    /// Whether the named model is ready to serve. Fails with
    /// `ModelNotFound` when the name is not registered at all.
    pub fn model_ready(&self, name: &str) -> Result<bool> {
        if self.repository.get(name).is_none() {
            return Err(Error::ModelNotFound(name.to_string()));
        }

        Ok(self.repository.is_ready(name))
    }

    /// Names of all ready models
    pub fn list_models(&self) -> Vec<String> {
        self.repository.list()
    }

    /// Loads a model through the repository. Exposed here so protocol
    /// adapters never hold a repository reference.
    pub async fn load_model(&self, name: &str) -> Result<bool> {
        self.repository.load(name).await
    }

    /// Unloads a model through the repository
    pub async fn unload_model(&self, name: &str) -> Result<()> {
        self.repository.unload(name).await
    }

    /// Runs the predict pipeline for the named model
    pub async fn infer(
        &self,
        name: &str,
        request: InferRequest,
        headers: &HashMap<String, String>,
    ) -> Result<InferResponse> {
        self.execute(name, request, headers, Verb::Predict).await
    }

    /// Runs the explain pipeline for the named model
    pub async fn explain(
        &self,
        name: &str,
        request: InferRequest,
        headers: &HashMap<String, String>,
    ) -> Result<InferResponse> {
        self.execute(name, request, headers, Verb::Explain).await
    }

    /// Common request path: resolve → readiness gate → pipeline under
    /// deadline
    async fn execute(
        &self,
        name: &str,
        request: InferRequest,
        headers: &HashMap<String, String>,
        verb: Verb,
    ) -> Result<InferResponse> {
        let model = self
            .repository
            .get(name)
            .ok_or_else(|| Error::ModelNotFound(name.to_string()))?;

        // Fail fast on anything that is not READY. Load-on-demand is an
        // explicit repository call, never an implicit wait inside infer.
        if !self.repository.is_ready(name) {
            return Err(Error::ModelNotReady(name.to_string()));
        }

        if verb == Verb::Explain && !model.capabilities().explain {
            return Err(Error::NotSupported(format!(
                "Model {} does not support explanation",
                name
            )));
        }

        let timeout = request.parameters.timeout.unwrap_or(self.request_timeout);
        let ctx = RequestContext::new(Some(timeout))
            .with_request_id(headers.get(REQUEST_ID_HEADER).cloned());

        let outcome =
            tokio::time::timeout(timeout, self.run_pipeline(model, request, verb)).await;

        match outcome {
            Ok(result) => {
                debug!(
                    "Request for model {} finished in {:?} (request_id: {:?})",
                    name,
                    ctx.elapsed(),
                    ctx.request_id()
                );
                result
            }
            Err(_) => {
                // Cooperative cancellation only: the worker thread is not
                // preempted, its eventual result is discarded.
                ctx.cancel();
                warn!(
                    "Request for model {} exceeded its {:?} deadline (request_id: {:?})",
                    name,
                    timeout,
                    ctx.request_id()
                );
                Err(Error::Timeout(format!(
                    "Request for model {} exceeded {:?}",
                    name, timeout
                )))
            }
        }
    }

    /// Executes preprocess → predict/explain → postprocess strictly in
    /// order. Stage failures are tagged with the failing stage unless the
    /// model raised a structured application error, which passes through
    /// unchanged.
    async fn run_pipeline(
        &self,
        model: Arc<dyn Model>,
        request: InferRequest,
        verb: Verb,
    ) -> Result<InferResponse> {
        let preprocessed = model
            .preprocess(request)
            .map_err(|e| e.into_stage_error(InferenceStage::Preprocess))?;

        let raw = match verb {
            Verb::Predict if model.capabilities().async_predict => model
                .predict_async(preprocessed)
                .await
                .map_err(|e| e.into_stage_error(InferenceStage::Predict))?,
            Verb::Predict => {
                let worker_model = model.clone();
                self.pool
                    .submit(move || worker_model.predict(preprocessed))
                    .await?
                    .map_err(|e| e.into_stage_error(InferenceStage::Predict))?
            }
            Verb::Explain => {
                let worker_model = model.clone();
                self.pool
                    .submit(move || worker_model.explain(preprocessed))
                    .await?
                    .map_err(|e| e.into_stage_error(InferenceStage::Explain))?
            }
        };

        model
            .postprocess(raw)
            .map_err(|e| e.into_stage_error(InferenceStage::Postprocess))
    }
}
