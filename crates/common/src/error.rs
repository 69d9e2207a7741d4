//! Error types for the common crate
//!
//! This module defines the error taxonomy used throughout the model serving
//! runtime. Protocol adapters translate every member to a wire-appropriate
//! status and body; the dataplane never swallows a failure.

use std::fmt;
use thiserror::Error;

/// Result type for model serving operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline stage in which an inference failure occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceStage {
    /// Input transformation before prediction
    Preprocess,
    /// The model's predict call
    Predict,
    /// The model's explain call
    Explain,
    /// Output transformation after prediction
    Postprocess,
}

impl fmt::Display for InferenceStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferenceStage::Preprocess => write!(f, "preprocess"),
            InferenceStage::Predict => write!(f, "predict"),
            InferenceStage::Explain => write!(f, "explain"),
            InferenceStage::Postprocess => write!(f, "postprocess"),
        }
    }
}

/// Common error type for model serving operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Model error (load/unload failure)
    #[error("Model error: {0}")]
    Model(String),

    /// Model not found error
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Model exists but is not ready to serve
    #[error("Model not ready: {0}")]
    ModelNotReady(String),

    /// Malformed or missing required wire fields
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Requested capability is absent on the model
    #[error("Unsupported operation: {0}")]
    NotSupported(String),

    /// Unexpected failure inside the inference pipeline
    #[error("Inference error in {stage} stage: {message}")]
    Inference {
        /// Pipeline stage that failed
        stage: InferenceStage,
        /// Underlying failure description
        message: String,
    },

    /// Request deadline exceeded
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Worker pool queue saturated
    #[error("Server busy: {0}")]
    ServerBusy(String),

    /// Structured application-level error raised by a model, passed through
    /// to the caller unchanged
    #[error("Application error ({status}): {message}")]
    Application {
        /// HTTP-style status code chosen by the model
        status: u16,
        /// Application-provided message
        message: String,
    },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns true if the error is a model not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::ModelNotFound(_))
    }

    /// Returns true if the error is a model not ready error
    pub fn is_not_ready(&self) -> bool {
        matches!(self, Error::ModelNotReady(_))
    }

    /// Returns true if the error is an invalid input error
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Error::InvalidInput(_))
    }

    /// Returns true if the error is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }

    /// Returns true if the caller may retry the request later
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::ModelNotReady(_) | Error::ServerBusy(_))
    }

    /// Wraps any non-application error as an inference failure tagged with
    /// the offending pipeline stage. Application errors pass through.
    pub fn into_stage_error(self, stage: InferenceStage) -> Error {
        match self {
            Error::Application { status, message } => Error::Application { status, message },
            other => Error::Inference {
                stage,
                message: other.to_string(),
            },
        }
    }
}
