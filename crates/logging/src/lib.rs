//! Logging initialization for the model serving runtime
//!
//! Structured logging via `tracing` with an environment-driven filter. The
//! binary calls [`init`] once at startup; tests may call it repeatedly.

use anyhow::Result;
use tracing_subscriber::{fmt, EnvFilter};

/// Initializes the global tracing subscriber with an `info` default filter
pub fn init() -> Result<()> {
    init_with_default("info")
}

/// Initializes the global tracing subscriber with the given default filter,
/// overridable through `RUST_LOG`. Safe to call more than once; subsequent
/// calls are no-ops.
pub fn init_with_default(default_filter: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = fmt().with_env_filter(filter).with_target(true).try_init();

    Ok(())
}
