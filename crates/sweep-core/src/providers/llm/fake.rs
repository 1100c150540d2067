use super::{GenerateRequest, LlmClient, LlmResponse, Usage};
use crate::errors::ProviderError;
use async_trait::async_trait;

/// Offline client for dry runs and tests.
#[derive(Debug, Default)]
pub struct FakeClient {
    fixed_response: Option<String>,
}

impl FakeClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.fixed_response = Some(response.into());
        self
    }
}

#[async_trait]
impl LlmClient for FakeClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<LlmResponse, ProviderError> {
        // Without a fixed response, echo the message so each item stays distinguishable.
        let text = self
            .fixed_response
            .clone()
            .unwrap_or_else(|| format!("echo: {}", request.user_message));

        Ok(LlmResponse {
            usage: Usage {
                input_tokens: (request.system.len() + request.user_message.len()) as u64 / 4,
                output_tokens: text.len() as u64 / 4,
            },
            text,
            latency_ms: 0,
            model: request.model.clone(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}
