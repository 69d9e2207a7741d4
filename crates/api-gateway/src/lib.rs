//! Wire protocol adapters for the model serving runtime
//!
//! Each adapter is a stateless decode/encode pair translating between a
//! wire format and the canonical inference request/response shape. Adapters
//! only ever call dataplane operations; they never touch the model
//! repository directly. All adapters are merged into one router sharing a
//! single dataplane instance, each owning its own route namespace.

pub mod error;
pub mod openai;
pub mod repository_api;
pub mod router;
pub mod v1;
pub mod v2;

// Re-export commonly used types
pub use error::ApiError;
pub use router::build_router;
