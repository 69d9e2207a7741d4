//! Model lifecycle management for the model serving runtime
//!
//! This crate defines the model capability interface and the
//! concurrency-safe repository that owns every loaded model and its
//! readiness state.

pub mod model;
pub mod repository;

// Re-export commonly used types
pub use model::{Model, ModelCapabilities, ModelState};
pub use repository::ModelRepository;
