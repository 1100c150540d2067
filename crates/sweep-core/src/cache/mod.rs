//! Response cache keyed on `(model, resolved system prompt, user message)`.
//!
//! The cache is an optimization: reads fail open and writes are best-effort.
//! A broken backend costs extra provider calls, never a failed run.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::StorageError;
use crate::model::CacheEntry;
use crate::storage::BlobStore;
use crate::template;

pub mod key;

pub use key::{compute_key, CacheKey, CACHE_PREFIX};

/// One externally supplied answer used to pre-populate the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedTriple {
    pub question: String,
    /// System prompt template the answer was produced with.
    pub prompt: String,
    pub answer: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub written: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct CacheStore {
    blobs: Arc<dyn BlobStore>,
}

impl CacheStore {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }

    pub fn backend_name(&self) -> &'static str {
        self.blobs.backend_name()
    }

    /// Look up an entry. Storage and decode failures count as a miss.
    pub async fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let value = match self.blobs.load(&key.blob_key()).await {
            Ok(Some(value)) => value,
            Ok(None) => {
                debug!(key = %key, "cache miss");
                return None;
            }
            Err(e) => {
                warn!(key = %key, error = %e, "cache read failed; treating as miss");
                return None;
            }
        };
        match serde_json::from_value::<CacheEntry>(value) {
            Ok(entry) => {
                debug!(key = %key, "cache hit");
                Some(entry)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "cache entry undecodable; treating as miss");
                None
            }
        }
    }

    /// Store an entry, overwriting any previous value. Returns whether it was persisted.
    pub async fn put(&self, key: &CacheKey, entry: &CacheEntry) -> bool {
        match self.try_put(key, entry).await {
            Ok(()) => true,
            Err(e) => {
                warn!(key = %key, error = %e, "cache write failed; continuing without it");
                false
            }
        }
    }

    async fn try_put(&self, key: &CacheKey, entry: &CacheEntry) -> Result<(), StorageError> {
        let value = serde_json::to_value(entry).map_err(|source| StorageError::Serde {
            key: key.blob_key(),
            source,
        })?;
        self.blobs.save(&key.blob_key(), &value).await
    }

    /// Pre-populate entries from known answers.
    ///
    /// Each triple's template is resolved against its question exactly as a
    /// run would, so a later run with the same model and template hits.
    pub async fn seed(&self, model: &str, triples: &[SeedTriple]) -> SeedReport {
        let mut report = SeedReport::default();
        for t in triples {
            let resolved = template::resolve(&t.prompt, &t.question);
            let key = compute_key(model, &resolved, &t.question);
            let entry = CacheEntry {
                original_prompt: t.question.clone(),
                response: t.answer.clone(),
                model: model.to_string(),
                resolved_system_prompt: resolved,
                created_at: Utc::now(),
                latency_ms: 0,
            };
            if self.put(&key, &entry).await {
                report.written += 1;
            } else {
                report.failed += 1;
            }
        }
        report
    }

    pub async fn keys(&self) -> Result<Vec<CacheKey>, StorageError> {
        Ok(self
            .blobs
            .list(CACHE_PREFIX)
            .await?
            .iter()
            .filter_map(|k| CacheKey::from_blob_key(k))
            .collect())
    }

    /// Remove every entry; returns how many were deleted.
    pub async fn clear(&self) -> Result<usize, StorageError> {
        let keys = self.keys().await?;
        for key in &keys {
            self.blobs.delete(&key.blob_key()).await?;
        }
        Ok(keys.len())
    }
}
