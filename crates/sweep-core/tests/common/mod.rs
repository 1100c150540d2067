//! Test doubles shared by the integration suites.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sweep_core::errors::{ProviderError, StorageError};
use sweep_core::providers::llm::{GenerateRequest, LlmClient, LlmResponse, Usage};
use sweep_core::storage::BlobStore;

type Outcome = Box<dyn Fn(&GenerateRequest, usize) -> Result<String, ProviderError> + Send + Sync>;
type Delay = Box<dyn Fn(&GenerateRequest) -> Duration + Send + Sync>;

/// Provider double: counts calls, tracks peak concurrency, and answers via a
/// closure that also sees the 0-based call number.
pub struct ScriptedClient {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    outcome: Outcome,
    delay: Delay,
    pub requests: Mutex<Vec<GenerateRequest>>,
}

impl ScriptedClient {
    pub fn echo() -> Self {
        Self::with_outcome(|req, _| Ok(format!("answer to {}", req.user_message)))
    }

    pub fn with_outcome(
        f: impl Fn(&GenerateRequest, usize) -> Result<String, ProviderError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            outcome: Box::new(f),
            delay: Box::new(|_| Duration::ZERO),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn delayed(mut self, f: impl Fn(&GenerateRequest) -> Duration + Send + Sync + 'static) -> Self {
        self.delay = Box::new(f);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<LlmResponse, ProviderError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let delay = (self.delay)(request);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let text = (self.outcome)(request, n)?;
        Ok(LlmResponse {
            text,
            latency_ms: delay.as_millis() as u64,
            usage: Usage::default(),
            model: request.model.clone(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

/// Blob store whose every operation fails.
pub struct BrokenStore;

#[async_trait]
impl BlobStore for BrokenStore {
    async fn save(&self, key: &str, _value: &serde_json::Value) -> Result<(), StorageError> {
        Err(StorageError::Network {
            message: format!("cannot save {key}"),
        })
    }

    async fn load(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError> {
        Err(StorageError::Network {
            message: format!("cannot load {key}"),
        })
    }

    async fn list(&self, _prefix: &str) -> Result<Vec<String>, StorageError> {
        Err(StorageError::Network {
            message: "cannot list".into(),
        })
    }

    async fn delete(&self, _key: &str) -> Result<(), StorageError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "broken"
    }
}

pub fn messages(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn rate_limited() -> ProviderError {
    ProviderError::rate_limited(429, None, "rate_limit_error: slow down")
}

pub fn shared<T>(value: T) -> Arc<T> {
    Arc::new(value)
}
