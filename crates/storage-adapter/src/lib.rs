//! Model artifact download backends
//!
//! This crate provides the storage interface consumed by model
//! implementations while they load: given an artifact URI, fetch it and
//! return a local path. Storage is only ever invoked during a repository
//! load, never on the inference path.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info};

use common::error::Error;

/// A storage backend that can materialize model artifacts locally
#[async_trait]
pub trait ModelStorage: Send + Sync {
    /// URI schemes handled by this backend (e.g. `["http", "https"]`)
    fn schemes(&self) -> &[&str];

    /// Downloads the artifact at `uri` into `target_dir` and returns the
    /// local path of the materialized artifact
    async fn download(&self, uri: &str, target_dir: &Path) -> Result<PathBuf>;
}

/// Splits a URI into scheme and remainder. A URI without a scheme is
/// treated as a local filesystem path.
fn split_scheme(uri: &str) -> (&str, &str) {
    match uri.split_once("://") {
        Some((scheme, rest)) => (scheme, rest),
        None => ("file", uri),
    }
}

/// Storage backend for artifacts already present on the local filesystem
pub struct LocalStorage;

#[async_trait]
impl ModelStorage for LocalStorage {
    fn schemes(&self) -> &[&str] {
        &["file"]
    }

    async fn download(&self, uri: &str, _target_dir: &Path) -> Result<PathBuf> {
        let (_, path) = split_scheme(uri);
        let path = PathBuf::from(path);

        if !path.exists() {
            return Err(Error::Storage(format!("Local path does not exist: {:?}", path)).into());
        }

        debug!("Resolved local artifact at {:?}", path);

        Ok(path)
    }
}

/// Storage backend downloading artifacts over HTTP(S)
pub struct HttpStorage {
    /// Shared HTTP client
    client: reqwest::Client,
}

impl HttpStorage {
    /// Creates a new HTTP storage backend
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelStorage for HttpStorage {
    fn schemes(&self) -> &[&str] {
        &["http", "https"]
    }

    async fn download(&self, uri: &str, target_dir: &Path) -> Result<PathBuf> {
        let file_name = uri
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| Error::Storage(format!("Cannot derive file name from URI: {}", uri)))?;

        let target_path = target_dir.join(file_name);

        info!("Downloading {} to {:?}", uri, target_path);

        let response = self
            .client
            .get(uri)
            .send()
            .await
            .map_err(|e| Error::Storage(format!("Request to {} failed: {}", uri, e)))?;

        if !response.status().is_success() {
            return Err(Error::Storage(format!(
                "Download of {} failed with status {}",
                uri,
                response.status()
            ))
            .into());
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Storage(format!("Download of {} failed: {}", uri, e)))?;

        tokio::fs::create_dir_all(target_dir).await?;
        tokio::fs::write(&target_path, &bytes).await?;

        info!("Downloaded {} ({} bytes)", uri, bytes.len());

        Ok(target_path)
    }
}

/// Resolves URIs to the storage backend that handles their scheme
pub struct StorageResolver {
    /// Registered backends
    backends: Vec<Arc<dyn ModelStorage>>,
}

impl StorageResolver {
    /// Creates a resolver with the built-in local and HTTP backends
    pub fn new() -> Self {
        Self {
            backends: vec![Arc::new(LocalStorage), Arc::new(HttpStorage::new())],
        }
    }

    /// Registers an additional backend (e.g. an object-store fetcher)
    pub fn register(&mut self, backend: Arc<dyn ModelStorage>) {
        self.backends.push(backend);
    }

    /// Returns the backend handling the URI's scheme
    pub fn resolve(&self, uri: &str) -> Result<Arc<dyn ModelStorage>> {
        let (scheme, _) = split_scheme(uri);

        self.backends
            .iter()
            .find(|backend| backend.schemes().contains(&scheme))
            .cloned()
            .ok_or_else(|| Error::Storage(format!("Unrecognized URI scheme: {}", scheme)).into())
    }

    /// Downloads the artifact at `uri` into `target_dir`
    pub async fn download(&self, uri: &str, target_dir: &Path) -> Result<PathBuf> {
        self.resolve(uri)?.download(uri, target_dir).await
    }
}

impl Default for StorageResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_scheme() {
        assert_eq!(split_scheme("s3://bucket/key"), ("s3", "bucket/key"));
        assert_eq!(split_scheme("/models/a"), ("file", "/models/a"));
        assert_eq!(split_scheme("file:///models/a"), ("file", "/models/a"));
    }

    #[tokio::test]
    async fn test_local_storage_existing_path() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("model.bin");
        std::fs::write(&artifact, b"weights").unwrap();

        let resolver = StorageResolver::new();
        let uri = format!("file://{}", artifact.display());
        let path = resolver.download(&uri, dir.path()).await.unwrap();
        assert_eq!(path, artifact);
    }

    #[tokio::test]
    async fn test_local_storage_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = StorageResolver::new();
        let result = resolver.download("/nonexistent/model.bin", dir.path()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_unrecognized_scheme() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = StorageResolver::new();
        let result = resolver.download("gopher://models/a", dir.path()).await;
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Unrecognized URI scheme"));
    }
}
