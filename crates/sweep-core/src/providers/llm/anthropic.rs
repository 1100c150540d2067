use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use serde_json::json;
use tracing::debug;

use super::stream::StreamAccumulator;
use super::{GenerateRequest, LlmClient, LlmResponse};
use crate::errors::ProviderError;

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const API_VERSION: &str = "2023-06-01";

/// Streaming Messages API client.
pub struct AnthropicClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl AnthropicClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: &str) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Map a non-success status to a typed error. The only place status codes are interpreted.
    async fn status_error(resp: reqwest::Response) -> ProviderError {
        let status = resp.status().as_u16();
        let retry_after = resp
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let body = resp.text().await.unwrap_or_default();
        let message = error_message(&body).unwrap_or(body);

        match status {
            429 => ProviderError::rate_limited(status, retry_after, message),
            401 | 403 => ProviderError::Unauthorized { message },
            400 | 404 | 413 | 422 => ProviderError::InvalidRequest { status, message },
            _ => ProviderError::Server {
                status: Some(status),
                message,
            },
        }
    }
}

fn error_message(body: &str) -> Option<String> {
    let v: serde_json::Value = serde_json::from_str(body).ok()?;
    v.pointer("/error/message")
        .and_then(|m| m.as_str())
        .map(str::to_string)
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<LlmResponse, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = json!({
            "model": request.model,
            "max_tokens": request.max_tokens,
            "system": request.system,
            "messages": [
                { "role": "user", "content": request.user_message }
            ],
            "stream": true,
        });

        let started = Instant::now();
        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Self::status_error(resp).await);
        }

        let mut acc = StreamAccumulator::new();
        let mut chunks = resp.bytes_stream();
        while let Some(chunk) = chunks.next().await {
            acc.feed(&chunk?)?;
        }
        let out = acc.finish()?;
        let latency_ms = started.elapsed().as_millis() as u64;
        debug!(
            model = %request.model,
            latency_ms,
            input_tokens = out.usage.input_tokens,
            output_tokens = out.usage.output_tokens,
            stop_reason = out.stop_reason.as_deref().unwrap_or(""),
            "anthropic response complete"
        );

        Ok(LlmResponse {
            text: out.text,
            latency_ms,
            usage: out.usage,
            model: out.model.unwrap_or_else(|| request.model.clone()),
        })
    }

    fn provider_name(&self) -> &'static str {
        "anthropic"
    }
}
