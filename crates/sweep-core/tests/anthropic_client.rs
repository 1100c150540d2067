//! `AnthropicClient` against a mocked Messages API.

use std::sync::Arc;
use std::time::Duration;

use sweep_core::errors::ProviderError;
use sweep_core::providers::llm::{
    AnthropicClient, GenerateRequest, LlmClient, RetryPolicy, RetryingClient,
};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request() -> GenerateRequest {
    GenerateRequest {
        model: "claude-sonnet-4-5".into(),
        system: "Be brief.".into(),
        user_message: "Say hi".into(),
        max_tokens: 1024,
    }
}

fn sse(events: &[&str]) -> String {
    events
        .iter()
        .map(|data| {
            let v: serde_json::Value = serde_json::from_str(data).unwrap();
            format!("event: {}\ndata: {}\n\n", v["type"].as_str().unwrap(), data)
        })
        .collect()
}

fn hello_stream() -> String {
    sse(&[
        r#"{"type":"message_start","message":{"model":"claude-sonnet-4-5","usage":{"input_tokens":12,"output_tokens":1}}}"#,
        r#"{"type":"content_block_start","index":0,"content_block":{"type":"text","text":""}}"#,
        r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hi"}}"#,
        r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":" there!"}}"#,
        r#"{"type":"content_block_stop","index":0}"#,
        r#"{"type":"message_delta","delta":{"stop_reason":"end_turn"},"usage":{"output_tokens":4}}"#,
        r#"{"type":"message_stop"}"#,
    ])
}

#[tokio::test]
async fn test_streamed_text_is_joined() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-test"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(serde_json::json!({
            "model": "claude-sonnet-4-5",
            "system": "Be brief.",
            "stream": true,
            "max_tokens": 1024,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(hello_stream(), "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let client = AnthropicClient::with_base_url("sk-test", &server.uri());
    let resp = client.generate(&request()).await.expect("generate failed");

    assert_eq!(resp.text, "Hi there!");
    assert_eq!(resp.usage.input_tokens, 12);
    assert_eq!(resp.usage.output_tokens, 4);
    assert_eq!(resp.model, "claude-sonnet-4-5");
}

#[tokio::test]
async fn test_429_maps_to_rate_limited_with_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "2")
                .set_body_string(
                    r#"{"type":"error","error":{"type":"rate_limit_error","message":"Number of request tokens has exceeded your per-minute rate limit"}}"#,
                ),
        )
        .mount(&server)
        .await;

    let client = AnthropicClient::with_base_url("sk-test", &server.uri());
    let err = client.generate(&request()).await.unwrap_err();

    assert!(err.is_retryable());
    assert!(!err.is_legacy_classified());
    match err {
        ProviderError::RateLimited {
            status,
            retry_after,
            message,
            ..
        } => {
            assert_eq!(status, Some(429));
            assert_eq!(retry_after, Some(Duration::from_secs(2)));
            assert!(message.contains("per-minute rate limit"));
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }
}

#[tokio::test]
async fn test_401_is_terminal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(401).set_body_string(
            r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let inner: Arc<dyn LlmClient> = Arc::new(AnthropicClient::with_base_url("bad", &server.uri()));
    let client = RetryingClient::new(inner, RetryPolicy::new(5, Duration::from_millis(1)));
    let err = client.generate(&request()).await.unwrap_err();

    assert!(matches!(err, ProviderError::Unauthorized { .. }));
    assert_eq!(err.kind_label(), "provider_auth");
}

#[tokio::test]
async fn test_5xx_maps_to_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(529).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let client = AnthropicClient::with_base_url("sk-test", &server.uri());
    let err = client.generate(&request()).await.unwrap_err();

    assert!(matches!(err, ProviderError::Server { status: Some(529), .. }));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_in_stream_rate_limit_is_retried_until_success() {
    let server = MockServer::start().await;
    let limited = sse(&[
        r#"{"type":"message_start","message":{"model":"claude-sonnet-4-5","usage":{"input_tokens":3,"output_tokens":0}}}"#,
        r#"{"type":"error","error":{"type":"rate_limit_error","message":"slow down"}}"#,
    ]);
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(limited, "text/event-stream"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(hello_stream(), "text/event-stream"))
        .mount(&server)
        .await;

    let inner: Arc<dyn LlmClient> = Arc::new(AnthropicClient::with_base_url("sk-test", &server.uri()));
    let client = RetryingClient::new(inner, RetryPolicy::new(3, Duration::from_millis(5)));
    let resp = client.generate(&request()).await.expect("retry should recover");

    assert_eq!(resp.text, "Hi there!");
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}
