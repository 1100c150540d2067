use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named, reusable system prompt template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemPrompt {
    pub name: String,
    pub content: String,
}

impl SystemPrompt {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// A cached model response. Never mutated after it is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub original_prompt: String,
    pub response: String,
    pub model: String,
    pub resolved_system_prompt: String,
    pub created_at: DateTime<Utc>,
    pub latency_ms: u64,
}

/// Outcome of one (system prompt, message) item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub prompt: String,
    pub response: String,
    pub cached: bool,
    pub latency_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

impl EvaluationResult {
    pub fn from_cache(prompt: &str, entry: &CacheEntry) -> Self {
        Self {
            prompt: prompt.to_string(),
            response: entry.response.clone(),
            cached: true,
            latency_ms: entry.latency_ms,
            error: None,
            error_kind: None,
        }
    }

    pub fn computed(prompt: &str, response: String, latency_ms: u64) -> Self {
        Self {
            prompt: prompt.to_string(),
            response,
            cached: false,
            latency_ms,
            error: None,
            error_kind: None,
        }
    }

    pub fn failed(prompt: &str, kind: &str, error: impl Into<String>) -> Self {
        Self {
            prompt: prompt.to_string(),
            response: String::new(),
            cached: false,
            latency_ms: 0,
            error: Some(error.into()),
            error_kind: Some(kind.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// All results for one system prompt, in input message order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptResult {
    pub prompt_name: String,
    pub prompt_content: String,
    pub results: Vec<EvaluationResult>,
}

/// Aggregate counters over a run. Always derived from the results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_prompts: usize,
    pub total_tests: usize,
    /// Results with `cached: true`. Includes in-run duplicates that reused
    /// another item's answer, so a cold run can report a non-zero count.
    pub cached: usize,
    pub errors: usize,
}

impl RunSummary {
    pub fn from_results(results: &[PromptResult]) -> Self {
        let mut summary = Self {
            total_prompts: results.len(),
            ..Self::default()
        };
        for r in results.iter().flat_map(|p| p.results.iter()) {
            summary.total_tests += 1;
            if r.cached {
                summary.cached += 1;
            }
            if r.is_error() {
                summary.errors += 1;
            }
        }
        summary
    }
}

/// What [`crate::engine::Scheduler::run`] hands back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub results: Vec<PromptResult>,
    pub summary: RunSummary,
    /// Set when the run-level deadline cut the run short.
    #[serde(default)]
    pub timed_out: bool,
}

impl RunOutcome {
    pub fn new(results: Vec<PromptResult>, timed_out: bool) -> Self {
        let summary = RunSummary::from_results(&results);
        Self {
            results,
            summary,
            timed_out,
        }
    }
}
