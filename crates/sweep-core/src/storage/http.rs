//! Object storage over plain HTTP.
//!
//! Protocol:
//! - `PUT {base}/{key}` with a JSON body stores a blob
//! - `GET {base}/{key}` returns it (404 means absent)
//! - `GET {base}?prefix=<p>` returns `{"keys": [...]}`
//! - `DELETE {base}/{key}` removes it (404 tolerated)

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use tracing::debug;

use super::{validate_key, validate_prefix, BlobStore};
use crate::errors::StorageError;

#[derive(Debug, Clone)]
pub struct HttpBlobStore {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListBody {
    #[serde(default)]
    keys: Vec<String>,
}

impl HttpBlobStore {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.header(AUTHORIZATION, format!("Bearer {}", token)),
            None => req,
        }
    }

    async fn error_for(resp: reqwest::Response) -> StorageError {
        let status = resp.status().as_u16();
        let message = resp.text().await.unwrap_or_default();
        StorageError::Http { status, message }
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn save(&self, key: &str, value: &serde_json::Value) -> Result<(), StorageError> {
        validate_key(key)?;
        let resp = self
            .authorize(self.client.put(self.url(key)))
            .json(value)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Self::error_for(resp).await);
        }
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError> {
        validate_key(key)?;
        let resp = self.authorize(self.client.get(self.url(key))).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            debug!(key, "blob not found");
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(Self::error_for(resp).await);
        }
        let bytes = resp.bytes().await?;
        let value = serde_json::from_slice(&bytes).map_err(|source| StorageError::Serde {
            key: key.to_string(),
            source,
        })?;
        Ok(Some(value))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        validate_prefix(prefix)?;
        let resp = self
            .authorize(self.client.get(&self.base_url))
            .query(&[("prefix", prefix)])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Self::error_for(resp).await);
        }
        let bytes = resp.bytes().await?;
        let body: ListBody = serde_json::from_slice(&bytes).map_err(|source| StorageError::Serde {
            key: prefix.to_string(),
            source,
        })?;
        let mut keys: Vec<String> = body
            .keys
            .into_iter()
            .filter(|k| k.starts_with(prefix))
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        let resp = self
            .authorize(self.client.delete(self.url(key)))
            .send()
            .await?;
        if resp.status().is_success() || resp.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Err(Self::error_for(resp).await)
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}
