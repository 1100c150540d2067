//! Bounded exponential backoff around a provider.
//!
//! ```text
//! Calling -> Success
//!         -> RateLimited -> Backoff(base * 2^attempt) -> Calling   (while attempts remain)
//!         -> Terminal | last attempt failed -> Failure
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use super::{GenerateRequest, LlmClient, LlmResponse};
use crate::errors::ProviderError;

/// Upper bound on how long a server-sent `Retry-After` may stretch a backoff.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_millis(1000))
    }
}

impl RetryPolicy {
    /// `max_attempts` counts every call, the first one included (minimum 1).
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Sleep after failed attempt number `attempt` (0-based): `base * 2^attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.min(31)))
    }

    /// The scheduled delay, stretched to the server's `Retry-After` when that is longer.
    fn backoff(&self, attempt: u32, err: &ProviderError) -> Duration {
        let scheduled = self.delay_for(attempt);
        match err {
            ProviderError::RateLimited {
                retry_after: Some(ra),
                ..
            } => scheduled.max((*ra).min(MAX_RETRY_AFTER)),
            _ => scheduled,
        }
    }
}

/// Decorates any [`LlmClient`] with rate-limit retries.
pub struct RetryingClient {
    inner: Arc<dyn LlmClient>,
    policy: RetryPolicy,
}

impl RetryingClient {
    pub fn new(inner: Arc<dyn LlmClient>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }
}

#[async_trait]
impl LlmClient for RetryingClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<LlmResponse, ProviderError> {
        let mut attempt = 0;
        loop {
            match self.inner.generate(request).await {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_retryable() && attempt + 1 < self.policy.max_attempts => {
                    let backoff = self.policy.backoff(attempt, &e);
                    warn!(
                        error = %e,
                        provider = self.inner.provider_name(),
                        attempt = attempt + 1,
                        max_attempts = self.policy.max_attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        "rate limited; retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        self.inner.provider_name()
    }
}
