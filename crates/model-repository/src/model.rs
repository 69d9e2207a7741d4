//! Model capability interface and lifecycle states
//!
//! Concrete models are external collaborators; the runtime depends only on
//! the capability contract defined here. Implementations must be safe for
//! concurrent read-only invocation: the runtime does not serialize predict
//! calls against one another.

use std::fmt;

use async_trait::async_trait;

use common::error::{Error, Result};
use common::infer::{InferRequest, InferResponse, ModelMetadata};

/// Capability set advertised by a model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelCapabilities {
    /// Whether the model serves predict requests
    pub predict: bool,

    /// Whether the model serves explain requests
    pub explain: bool,

    /// Whether predict is natively asynchronous. When set, the dataplane
    /// invokes `predict_async` in place instead of offloading the blocking
    /// `predict` to the worker pool.
    pub async_predict: bool,
}

impl Default for ModelCapabilities {
    fn default() -> Self {
        Self {
            predict: true,
            explain: false,
            async_predict: false,
        }
    }
}

/// Lifecycle state of a repository entry
///
/// Transitions: `Uninitialized → Loading → Ready`,
/// `Loading → LoadFailed` (retryable), `Ready → Unloading → removed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelState {
    /// Registered but never loaded
    Uninitialized,
    /// Load in progress
    Loading,
    /// Serving requests
    Ready,
    /// Last load attempt failed; a subsequent load retries from scratch
    LoadFailed(String),
    /// Unload in progress; the entry is about to be removed
    Unloading,
}

impl ModelState {
    /// Whether the entry may serve predict/explain requests
    pub fn is_ready(&self) -> bool {
        matches!(self, ModelState::Ready)
    }
}

impl fmt::Display for ModelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelState::Uninitialized => write!(f, "Uninitialized"),
            ModelState::Loading => write!(f, "Loading"),
            ModelState::Ready => write!(f, "Ready"),
            ModelState::LoadFailed(reason) => write!(f, "LoadFailed: {}", reason),
            ModelState::Unloading => write!(f, "Unloading"),
        }
    }
}

/// The capability interface every served model implements
///
/// `preprocess`, `predict`, `explain`, and `postprocess` form the request
/// pipeline and execute strictly in that order for a single request.
/// `predict` and `explain` may block; the dataplane runs them on the worker
/// pool. A model that performs its own async I/O advertises
/// `async_predict` and implements `predict_async` instead.
#[async_trait]
pub trait Model: Send + Sync {
    /// Unique model name
    fn name(&self) -> &str;

    /// Capability set for this model
    fn capabilities(&self) -> ModelCapabilities {
        ModelCapabilities::default()
    }

    /// Loads the model (artifact download, weight initialization). Readiness
    /// is owned by the repository entry, not by the model: returning `Ok`
    /// transitions the entry to `Ready`.
    async fn load(&self) -> Result<bool> {
        Ok(true)
    }

    /// Input transformation ahead of predict
    fn preprocess(&self, request: InferRequest) -> Result<InferRequest> {
        Ok(request)
    }

    /// Blocking prediction, executed on the worker pool
    fn predict(&self, request: InferRequest) -> Result<InferResponse>;

    /// Natively asynchronous prediction, invoked in place when the model
    /// advertises `async_predict`
    async fn predict_async(&self, _request: InferRequest) -> Result<InferResponse> {
        Err(Error::NotSupported(format!(
            "Model {} does not implement async predict",
            self.name()
        )))
    }

    /// Blocking explanation, executed on the worker pool
    fn explain(&self, _request: InferRequest) -> Result<InferResponse> {
        Err(Error::NotSupported(format!(
            "Model {} does not support explanation",
            self.name()
        )))
    }

    /// Output transformation after predict/explain
    fn postprocess(&self, response: InferResponse) -> Result<InferResponse> {
        Ok(response)
    }

    /// Metadata served by the model-metadata endpoints
    fn metadata(&self) -> ModelMetadata {
        ModelMetadata::named(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Minimal;

    #[async_trait]
    impl Model for Minimal {
        fn name(&self) -> &str {
            "minimal"
        }

        fn predict(&self, request: InferRequest) -> Result<InferResponse> {
            Ok(InferResponse::new(self.name(), request.inputs))
        }
    }

    #[tokio::test]
    async fn test_default_capabilities() {
        let model = Minimal;
        let caps = model.capabilities();
        assert!(caps.predict);
        assert!(!caps.explain);
        assert!(!caps.async_predict);
    }

    #[tokio::test]
    async fn test_default_explain_is_unsupported() {
        let model = Minimal;
        let request = InferRequest::new("minimal", Vec::new(), common::ProtocolVersion::V1);
        let err = model.explain(request).unwrap_err();
        assert!(matches!(err, Error::NotSupported(_)));
    }

    #[test]
    fn test_state_readiness() {
        assert!(ModelState::Ready.is_ready());
        assert!(!ModelState::Loading.is_ready());
        assert!(!ModelState::LoadFailed("io".to_string()).is_ready());
    }
}
