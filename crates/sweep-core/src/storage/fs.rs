//! Local filesystem backend.
//!
//! ```text
//! <root>/cache/<hex>.json
//! <root>/runs/<id>.json
//! <root>/ratings/<id>.json
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use super::{validate_key, validate_prefix, BlobStore};
use crate::errors::StorageError;

const TMP_MARKER: &str = ".tmp-";

#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        key.split('/').fold(self.root.clone(), |p, seg| p.join(seg))
    }
}

fn io_err(key: &str, source: std::io::Error) -> StorageError {
    StorageError::Io {
        key: key.to_string(),
        source,
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn save(&self, key: &str, value: &serde_json::Value) -> Result<(), StorageError> {
        validate_key(key)?;
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| io_err(key, e))?;
        }
        let body = serde_json::to_vec_pretty(value).map_err(|source| StorageError::Serde {
            key: key.to_string(),
            source,
        })?;

        // Write beside the target and rename so readers never observe a partial file.
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp = path.with_file_name(format!("{}{}{}", file_name, TMP_MARKER, uuid::Uuid::new_v4()));
        fs::write(&tmp, &body).await.map_err(|e| io_err(key, e))?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(io_err(key, e));
        }
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError> {
        validate_key(key)?;
        let raw = match fs::read(self.path_for(key)).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_err(key, e)),
        };
        let value = serde_json::from_slice(&raw).map_err(|source| StorageError::Serde {
            key: key.to_string(),
            source,
        })?;
        Ok(Some(value))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        validate_prefix(prefix)?;
        // Only walk the deepest directory the prefix pins down.
        let start_rel = match prefix.rfind('/') {
            Some(idx) => &prefix[..idx],
            None => "",
        };
        let start = if start_rel.is_empty() {
            self.root.clone()
        } else {
            self.path_for(start_rel)
        };

        let mut keys = Vec::new();
        let mut pending = vec![(start, start_rel.to_string())];
        while let Some((dir, rel)) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(io_err(&rel, e)),
            };
            while let Some(entry) = entries.next_entry().await.map_err(|e| io_err(&rel, e))? {
                let name = entry.file_name().to_string_lossy().into_owned();
                let key = if rel.is_empty() {
                    name.clone()
                } else {
                    format!("{}/{}", rel, name)
                };
                let file_type = entry.file_type().await.map_err(|e| io_err(&key, e))?;
                if file_type.is_dir() {
                    pending.push((entry.path(), key));
                } else if !name.contains(TMP_MARKER) && key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(key, e)),
        }
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}
