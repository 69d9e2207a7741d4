//! Protocol-agnostic request orchestration
//!
//! This crate contains the dataplane, the single choke point every protocol
//! adapter routes requests through, and the bounded worker pool that keeps
//! blocking model calls off the async scheduler.

pub mod dataplane;
pub mod executor;

// Re-export commonly used types
pub use dataplane::{Dataplane, ServerLive, ServerMetadata, SERVER_NAME};
pub use executor::WorkerPool;
