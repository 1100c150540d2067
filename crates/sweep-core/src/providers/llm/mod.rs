use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;

pub mod anthropic;
pub mod fake;
pub mod retry;
pub mod stream;

pub use anthropic::AnthropicClient;
pub use fake::FakeClient;
pub use retry::{RetryPolicy, RetryingClient};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    pub model: String,
    /// Resolved system prompt.
    pub system: String,
    pub user_message: String,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmResponse {
    /// Full text with every streamed fragment joined.
    pub text: String,
    /// Dispatch to fully materialized response.
    pub latency_ms: u64,
    pub usage: Usage,
    pub model: String,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<LlmResponse, ProviderError>;

    fn provider_name(&self) -> &'static str;
}
