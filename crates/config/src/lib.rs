//! Configuration management for the model serving runtime
//!
//! Process-wide configuration consumed by the server: listening port, worker
//! pool sizing, per-request timeout, and the model set expected at startup.
//! Sources are layered: built-in defaults, then an optional JSON file, then
//! `MODEL_SERVER_*` environment overrides.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use common::error::Error;

/// Environment variable prefix for configuration overrides
const ENV_PREFIX: &str = "MODEL_SERVER_";

/// Default per-request timeout in seconds. Generous on purpose: request
/// deadlines are expected to be enforced closer to the caller.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 600;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listening port for the HTTP protocol surface
    pub http_port: u16,

    /// Number of worker threads executing blocking model calls
    pub worker_pool_size: usize,

    /// Maximum number of queued worker submissions before requests are
    /// rejected as busy
    pub worker_queue_depth: usize,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Model names expected to be registered and loaded at startup
    pub registered_models: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 8080,
            worker_pool_size: num_cpus::get(),
            worker_queue_depth: 64,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            registered_models: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from defaults, an optional JSON file, and
    /// environment overrides, in that order
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        config.apply_env_overrides()?;
        config.validate()?;

        info!(
            "Configuration loaded: port={}, workers={}, queue_depth={}, timeout={}s",
            config.http_port,
            config.worker_pool_size,
            config.worker_queue_depth,
            config.request_timeout_secs
        );

        Ok(config)
    }

    /// Loads configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config: ServerConfig = serde_json::from_str(&contents).map_err(|e| {
            Error::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        debug!("Loaded configuration from {:?}", path);

        Ok(config)
    }

    /// Applies `MODEL_SERVER_*` environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(port) = env_parse::<u16>("HTTP_PORT")? {
            self.http_port = port;
        }
        if let Some(size) = env_parse::<usize>("WORKER_POOL_SIZE")? {
            self.worker_pool_size = size;
        }
        if let Some(depth) = env_parse::<usize>("WORKER_QUEUE_DEPTH")? {
            self.worker_queue_depth = depth;
        }
        if let Some(timeout) = env_parse::<u64>("REQUEST_TIMEOUT_SECS")? {
            self.request_timeout_secs = timeout;
        }

        Ok(())
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.worker_pool_size == 0 {
            return Err(Error::Config("worker_pool_size must be at least 1".to_string()).into());
        }
        if self.worker_queue_depth == 0 {
            return Err(Error::Config("worker_queue_depth must be at least 1".to_string()).into());
        }
        if self.request_timeout_secs == 0 {
            return Err(
                Error::Config("request_timeout_secs must be at least 1".to_string()).into(),
            );
        }

        Ok(())
    }

    /// Per-request timeout as a duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Reads and parses an environment override, if present
fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    let full_key = format!("{}{}", ENV_PREFIX, key);

    match std::env::var(&full_key) {
        Ok(raw) => {
            let parsed = raw.parse::<T>().map_err(|_| {
                Error::Config(format!("Invalid value for {}: {}", full_key, raw))
            })?;
            Ok(Some(parsed))
        }
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.http_port, 8080);
        assert!(config.worker_pool_size >= 1);
        assert_eq!(config.request_timeout(), Duration::from_secs(600));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"http_port": 9000, "worker_pool_size": 2, "registered_models": ["echo"]}}"#
        )
        .unwrap();

        let config = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.http_port, 9000);
        assert_eq!(config.worker_pool_size, 2);
        assert_eq!(config.registered_models, vec!["echo".to_string()]);
        // Unspecified fields keep their defaults
        assert_eq!(config.worker_queue_depth, 64);
    }

    #[test]
    fn test_missing_file() {
        assert!(ServerConfig::from_file(Path::new("/nonexistent/config.json")).is_err());
    }

    #[test]
    fn test_validation_rejects_zero_pool() {
        let config = ServerConfig {
            worker_pool_size: 0,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_timeout() {
        let config = ServerConfig {
            request_timeout_secs: 0,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
