//! Common types for the model serving runtime
//!
//! This crate defines the error taxonomy, the canonical protocol-neutral
//! inference request/response representation, and per-request context shared
//! by the dataplane, repository, and protocol adapters.

pub mod context;
pub mod error;
pub mod infer;

// Re-export commonly used types
pub use context::RequestContext;
pub use error::{Error, InferenceStage, Result};
pub use infer::{
    InferRequest, InferResponse, InferTensor, ModelMetadata, ProtocolVersion, RequestParameters,
    TensorDataType, TensorSpec,
};
