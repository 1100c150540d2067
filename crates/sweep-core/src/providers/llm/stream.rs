//! Incremental decoding of a Messages API server-sent-event stream.
//!
//! Text deltas are concatenated into one string. Side-channel blocks become
//! inline markers so they stay visible without leaking raw JSON:
//!
//! - `tool_use` / `server_tool_use` -> `[tool_use: <name> <input>]`
//! - `*_tool_result` -> `[tool_result: <type>]`
//! - `thinking` / `redacted_thinking` are left out of the text

use std::collections::HashMap;

use serde_json::Value;

use super::Usage;
use crate::errors::ProviderError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOutput {
    pub text: String,
    pub usage: Usage,
    pub model: Option<String>,
    pub stop_reason: Option<String>,
}

#[derive(Debug)]
struct ToolBlock {
    name: String,
    input_json: String,
}

#[derive(Debug, Default)]
pub struct StreamAccumulator {
    buf: Vec<u8>,
    data_lines: Vec<String>,
    text: String,
    tools: HashMap<u64, ToolBlock>,
    usage: Usage,
    model: Option<String>,
    stop_reason: Option<String>,
    saw_stop: bool,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes as they arrive; chunk boundaries may fall anywhere,
    /// including inside a UTF-8 sequence.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<(), ProviderError> {
        self.buf.extend_from_slice(chunk);
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8(line).map_err(|e| ProviderError::Stream {
                message: format!("invalid utf-8 in event stream: {}", e),
            })?;
            self.handle_line(&line)?;
        }
        Ok(())
    }

    /// Flush any trailing event and return the assembled output.
    pub fn finish(mut self) -> Result<StreamOutput, ProviderError> {
        if !self.buf.is_empty() {
            let rest = std::mem::take(&mut self.buf);
            let line = String::from_utf8_lossy(&rest).into_owned();
            self.handle_line(line.trim_end_matches('\r'))?;
        }
        self.dispatch()?;
        if !self.saw_stop && self.text.is_empty() {
            return Err(ProviderError::Stream {
                message: "stream ended before any content was received".into(),
            });
        }
        Ok(StreamOutput {
            text: self.text,
            usage: self.usage,
            model: self.model,
            stop_reason: self.stop_reason,
        })
    }

    fn handle_line(&mut self, line: &str) -> Result<(), ProviderError> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return Ok(());
        }
        if let Some(data) = line.strip_prefix("data:") {
            self.data_lines
                .push(data.strip_prefix(' ').unwrap_or(data).to_string());
        }
        // `event:` names duplicate the payload's `type`; the payload is authoritative.
        Ok(())
    }

    fn dispatch(&mut self) -> Result<(), ProviderError> {
        if self.data_lines.is_empty() {
            return Ok(());
        }
        let data = self.data_lines.join("\n");
        self.data_lines.clear();
        let event: Value = serde_json::from_str(&data).map_err(|e| ProviderError::Stream {
            message: format!("malformed event payload: {}", e),
        })?;
        self.apply(&event)
    }

    fn apply(&mut self, event: &Value) -> Result<(), ProviderError> {
        let index = event.get("index").and_then(Value::as_u64).unwrap_or(0);
        match event.get("type").and_then(Value::as_str).unwrap_or("") {
            "message_start" => {
                let message = &event["message"];
                self.model = message
                    .get("model")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                self.merge_usage(&message["usage"]);
            }
            "content_block_start" => self.start_block(index, &event["content_block"]),
            "content_block_delta" => {
                let delta = &event["delta"];
                match delta.get("type").and_then(Value::as_str).unwrap_or("") {
                    "text_delta" => {
                        if let Some(t) = delta.get("text").and_then(Value::as_str) {
                            self.text.push_str(t);
                        }
                    }
                    "input_json_delta" => {
                        if let (Some(tool), Some(part)) = (
                            self.tools.get_mut(&index),
                            delta.get("partial_json").and_then(Value::as_str),
                        ) {
                            tool.input_json.push_str(part);
                        }
                    }
                    // thinking_delta, signature_delta, citations_delta
                    _ => {}
                }
            }
            "content_block_stop" => {
                if let Some(tool) = self.tools.remove(&index) {
                    let input = if tool.input_json.trim().is_empty() {
                        "{}".to_string()
                    } else {
                        tool.input_json
                    };
                    self.push_marker(&format!("[tool_use: {} {}]", tool.name, input));
                }
            }
            "message_delta" => {
                if let Some(reason) = event["delta"].get("stop_reason").and_then(Value::as_str) {
                    self.stop_reason = Some(reason.to_string());
                }
                self.merge_usage(&event["usage"]);
            }
            "message_stop" => self.saw_stop = true,
            "error" => return Err(stream_error(&event["error"])),
            // ping and future event types
            _ => {}
        }
        Ok(())
    }

    fn start_block(&mut self, index: u64, block: &Value) {
        let kind = block.get("type").and_then(Value::as_str).unwrap_or("");
        match kind {
            "text" => {
                if let Some(t) = block.get("text").and_then(Value::as_str) {
                    self.text.push_str(t);
                }
            }
            "tool_use" | "server_tool_use" | "mcp_tool_use" => {
                let name = block
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string();
                // Some providers send the full input up front instead of deltas.
                let input_json = match block.get("input") {
                    Some(v) if v.as_object().is_some_and(|o| !o.is_empty()) => v.to_string(),
                    _ => String::new(),
                };
                self.tools.insert(index, ToolBlock { name, input_json });
            }
            "thinking" | "redacted_thinking" => {}
            other if other.ends_with("_tool_result") => {
                self.push_marker(&format!("[tool_result: {}]", other));
            }
            _ => {}
        }
    }

    fn push_marker(&mut self, marker: &str) {
        if !self.text.is_empty() && !self.text.ends_with('\n') {
            self.text.push('\n');
        }
        self.text.push_str(marker);
        self.text.push('\n');
    }

    fn merge_usage(&mut self, usage: &Value) {
        if let Some(n) = usage.get("input_tokens").and_then(Value::as_u64) {
            self.usage.input_tokens = n;
        }
        if let Some(n) = usage.get("output_tokens").and_then(Value::as_u64) {
            self.usage.output_tokens = n;
        }
    }
}

/// Error types the Messages API documents for in-stream `error` events.
const TYPED_STREAM_ERRORS: &[&str] = &[
    "invalid_request_error",
    "authentication_error",
    "permission_error",
    "not_found_error",
    "request_too_large",
    "api_error",
    "overloaded_error",
];

fn stream_error(error: &Value) -> ProviderError {
    let kind = error.get("type").and_then(Value::as_str);
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown stream error")
        .to_string();
    match kind {
        Some("rate_limit_error") => ProviderError::RateLimited {
            status: None,
            retry_after: None,
            message,
            legacy_classified: false,
        },
        Some(kind) if TYPED_STREAM_ERRORS.contains(&kind) => ProviderError::Stream {
            message: format!("{}: {}", kind, message),
        },
        // Untyped or unknown payloads only carry text.
        _ => ProviderError::classify_message(message),
    }
}
