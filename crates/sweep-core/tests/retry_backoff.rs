//! Backoff behaviour of `RetryingClient` on a paused clock.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{rate_limited, ScriptedClient};
use sweep_core::errors::ProviderError;
use sweep_core::providers::llm::{GenerateRequest, LlmClient, RetryPolicy, RetryingClient};
use tokio::time::Instant;

fn request() -> GenerateRequest {
    GenerateRequest {
        model: "m".into(),
        system: "sys".into(),
        user_message: "hi".into(),
        max_tokens: 64,
    }
}

fn retrying(inner: Arc<ScriptedClient>) -> RetryingClient {
    let inner: Arc<dyn LlmClient> = inner;
    RetryingClient::new(inner, RetryPolicy::default())
}

#[tokio::test(start_paused = true)]
async fn test_succeeds_on_fifth_attempt_after_four_rate_limits() {
    let inner = Arc::new(ScriptedClient::with_outcome(|_, n| {
        if n < 4 {
            Err(rate_limited())
        } else {
            Ok("made it".into())
        }
    }));
    let client = retrying(inner.clone());

    let started = Instant::now();
    let resp = client.generate(&request()).await.unwrap();

    assert_eq!(resp.text, "made it");
    assert_eq!(inner.calls(), 5);
    // 1s + 2s + 4s + 8s of virtual backoff
    assert_eq!(started.elapsed(), Duration::from_secs(15));
}

#[tokio::test(start_paused = true)]
async fn test_persistent_rate_limit_gives_up_after_max_attempts() {
    let inner = Arc::new(ScriptedClient::with_outcome(|_, _| Err(rate_limited())));
    let client = retrying(inner.clone());

    let err = client.generate(&request()).await.unwrap_err();

    assert!(matches!(err, ProviderError::RateLimited { .. }));
    assert_eq!(inner.calls(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_terminal_errors_are_not_retried() {
    let inner = Arc::new(ScriptedClient::with_outcome(|_, _| {
        Err(ProviderError::InvalidRequest {
            status: 400,
            message: "max_tokens: must be positive".into(),
        })
    }));
    let client = retrying(inner.clone());

    let started = Instant::now();
    let err = client.generate(&request()).await.unwrap_err();

    assert!(matches!(err, ProviderError::InvalidRequest { status: 400, .. }));
    assert_eq!(inner.calls(), 1);
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_the_future_cancels_backoff() {
    let inner = Arc::new(ScriptedClient::with_outcome(|_, _| Err(rate_limited())));
    let client = retrying(inner.clone());

    let res = tokio::time::timeout(Duration::from_millis(3500), client.generate(&request())).await;

    assert!(res.is_err(), "timeout should fire during backoff");
    // calls at t=0, t=1s, t=3s; the 4s sleep is abandoned
    assert_eq!(inner.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_message_classified_rate_limit_is_retried() {
    let inner = Arc::new(ScriptedClient::with_outcome(|_, n| {
        if n == 0 {
            Err(ProviderError::classify_message("Error: Too Many Requests"))
        } else {
            Ok("ok".into())
        }
    }));
    let client = retrying(inner.clone());

    assert_eq!(client.generate(&request()).await.unwrap().text, "ok");
    assert_eq!(inner.calls(), 2);
}
