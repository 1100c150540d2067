//! Key/value blob storage used for the response cache and run artifacts.
//!
//! Keys are `/`-separated relative paths such as `cache/<hex>.json` or
//! `runs/<id>.json`. Every backend must behave identically for the same
//! sequence of calls; callers never know which one they hold.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::StorageConfig;
use crate::errors::StorageError;

pub mod fs;
pub mod http;
pub mod memory;

pub use fs::FsBlobStore;
pub use http::HttpBlobStore;
pub use memory::MemoryBlobStore;

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn save(&self, key: &str, value: &serde_json::Value) -> Result<(), StorageError>;

    /// `Ok(None)` when the key does not exist.
    async fn load(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError>;

    /// Keys starting with `prefix`, sorted.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    fn backend_name(&self) -> &'static str;
}

/// Build the backend named by configuration.
///
/// `token` is the bearer credential for the HTTP backend, already resolved by
/// the caller; the other backends ignore it.
pub fn open_blob_store(cfg: &StorageConfig, token: Option<String>) -> Arc<dyn BlobStore> {
    match cfg {
        StorageConfig::Local { root } => Arc::new(FsBlobStore::new(root.clone())),
        StorageConfig::Http { base_url, .. } => Arc::new(HttpBlobStore::new(base_url, token)),
        StorageConfig::Memory => Arc::new(MemoryBlobStore::new()),
    }
}

pub(crate) fn validate_key(key: &str) -> Result<(), StorageError> {
    let invalid = |reason| {
        Err(StorageError::InvalidKey {
            key: key.to_string(),
            reason,
        })
    };
    if key.is_empty() {
        return invalid("empty");
    }
    if key.starts_with('/') {
        return invalid("absolute");
    }
    if key.contains('\\') {
        return invalid("backslash");
    }
    if key
        .split('/')
        .any(|seg| seg.is_empty() || seg == "." || seg == "..")
    {
        return invalid("empty or relative segment");
    }
    Ok(())
}

/// Listing prefixes follow the key rules, except that the empty prefix and a
/// trailing `/` are allowed.
pub(crate) fn validate_prefix(prefix: &str) -> Result<(), StorageError> {
    let invalid = |reason| {
        Err(StorageError::InvalidKey {
            key: prefix.to_string(),
            reason,
        })
    };
    if prefix.is_empty() {
        return Ok(());
    }
    if prefix.starts_with('/') {
        return invalid("absolute");
    }
    if prefix.contains('\\') {
        return invalid("backslash");
    }
    let body = prefix.strip_suffix('/').unwrap_or(prefix);
    if body
        .split('/')
        .any(|seg| seg.is_empty() || seg == "." || seg == "..")
    {
        return invalid("empty or relative segment");
    }
    Ok(())
}
