use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::cache::{compute_key, CacheKey, CacheStore};
use crate::config::EngineConfig;
use crate::errors::RunError;
use crate::model::{CacheEntry, EvaluationResult, PromptResult, RunOutcome, SystemPrompt};
use crate::providers::llm::{GenerateRequest, LlmClient, RetryingClient};
use crate::report::progress::{ProgressEvent, ProgressSink};
use crate::template::TemplateEngine;

/// Stand-in deadline when the configured timeout overflows `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    /// Maximum items in flight at once (minimum 1).
    pub parallel: usize,
    pub max_tokens: u32,
    pub run_timeout: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for SchedulerSettings {
    fn from(cfg: &EngineConfig) -> Self {
        Self {
            parallel: cfg.parallel,
            max_tokens: cfg.max_tokens,
            run_timeout: cfg.run_timeout(),
        }
    }
}

/// One (system prompt, message) pair, resolved and keyed up front.
struct Item {
    slot: usize,
    message: String,
    resolved: String,
    key: CacheKey,
}

/// Runs every (system prompt x message) pair through the cache and provider.
#[derive(Clone)]
pub struct Scheduler {
    cache: CacheStore,
    client: Arc<dyn LlmClient>,
    templates: TemplateEngine,
    settings: SchedulerSettings,
}

impl Scheduler {
    /// `client` is used as given; wrap it in a [`RetryingClient`] for backoff.
    pub fn new(
        cache: CacheStore,
        client: Arc<dyn LlmClient>,
        templates: TemplateEngine,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            cache,
            client,
            templates,
            settings,
        }
    }

    /// Build from configuration, wrapping `provider` with the configured retry policy.
    pub fn from_config(cfg: &EngineConfig, cache: CacheStore, provider: Arc<dyn LlmClient>) -> Self {
        let client: Arc<dyn LlmClient> =
            Arc::new(RetryingClient::new(provider, cfg.retry_policy()));
        Self::new(
            cache,
            client,
            TemplateEngine::new(cfg.default_template.clone()),
            SchedulerSettings::from(cfg),
        )
    }

    pub fn settings(&self) -> SchedulerSettings {
        self.settings
    }

    /// Evaluate the full cross product.
    ///
    /// Returns `Err` only for invalid input, before any item runs. Item
    /// failures are recorded on their results; output order always matches
    /// input order.
    pub async fn run(
        &self,
        messages: &[String],
        prompts: &[SystemPrompt],
        model: &str,
        progress: Option<ProgressSink>,
    ) -> Result<RunOutcome, RunError> {
        if messages.is_empty() {
            return Err(RunError::NoMessages);
        }
        if prompts.is_empty() {
            return Err(RunError::NoSystemPrompts);
        }
        if model.trim().is_empty() {
            return Err(RunError::InvalidInput("model must not be empty".into()));
        }

        let total = prompts.len() * messages.len();
        let parallel = self.settings.parallel.max(1);
        info!(
            model,
            prompts = prompts.len(),
            messages = messages.len(),
            parallel,
            "starting evaluation run"
        );

        // Identical pairs in one run share a single evaluation.
        let mut leaders: Vec<Item> = Vec::new();
        let mut followers: HashMap<CacheKey, Vec<usize>> = HashMap::new();
        for (p, prompt) in prompts.iter().enumerate() {
            for (m, message) in messages.iter().enumerate() {
                let resolved = self.templates.resolve(Some(&prompt.content), message);
                let key = compute_key(model, &resolved, message);
                let slot = p * messages.len() + m;
                match followers.get_mut(&key) {
                    Some(dups) => dups.push(slot),
                    None => {
                        followers.insert(key.clone(), Vec::new());
                        leaders.push(Item {
                            slot,
                            message: message.clone(),
                            resolved,
                            key,
                        });
                    }
                }
            }
        }

        let sem = Arc::new(Semaphore::new(parallel));
        let mut join_set = JoinSet::new();
        for item in leaders {
            let this = self.clone();
            let sem = sem.clone();
            let model = model.to_string();
            join_set.spawn(async move {
                let result = match sem.acquire_owned().await {
                    Ok(_permit) => this.evaluate_item(&model, &item).await,
                    Err(_) => EvaluationResult::failed(&item.message, "other", "scheduler closed"),
                };
                (item.slot, item.key, result)
            });
        }

        let mut slots: Vec<Option<EvaluationResult>> = vec![None; total];
        let mut done = 0usize;
        let mut timed_out = false;
        let now = Instant::now();
        let deadline = now
            .checked_add(self.settings.run_timeout)
            .unwrap_or_else(|| now + FAR_FUTURE);
        loop {
            match timeout_at(deadline, join_set.join_next()).await {
                Ok(Some(Ok((slot, key, result)))) => {
                    let dups = followers.remove(&key).unwrap_or_default();
                    for dup in dups {
                        let mut copy = result.clone();
                        if !copy.is_error() {
                            copy.cached = true;
                        }
                        slots[dup] = Some(copy);
                        done += 1;
                    }
                    slots[slot] = Some(result);
                    done += 1;
                    if let Some(ref sink) = progress {
                        sink(ProgressEvent { done, total });
                    }
                }
                Ok(Some(Err(e))) => {
                    warn!(error = %e, "evaluation task failed");
                }
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        timeout_secs = self.settings.run_timeout.as_secs(),
                        completed = done,
                        total,
                        "run deadline exceeded; aborting outstanding items"
                    );
                    timed_out = true;
                    join_set.abort_all();
                    break;
                }
            }
        }

        let (kind, reason) = if timed_out {
            ("run_timeout", "run timed out before this item completed")
        } else {
            ("other", "evaluation task failed before producing a result")
        };
        let mut slots = slots.into_iter();
        let results: Vec<PromptResult> = prompts
            .iter()
            .map(|prompt| PromptResult {
                prompt_name: prompt.name.clone(),
                prompt_content: prompt.content.clone(),
                results: messages
                    .iter()
                    .map(|message| {
                        slots
                            .next()
                            .flatten()
                            .unwrap_or_else(|| EvaluationResult::failed(message, kind, reason))
                    })
                    .collect(),
            })
            .collect();

        let outcome = RunOutcome::new(results, timed_out);
        info!(
            total_tests = outcome.summary.total_tests,
            cached = outcome.summary.cached,
            errors = outcome.summary.errors,
            timed_out,
            "evaluation run finished"
        );
        Ok(outcome)
    }

    async fn evaluate_item(&self, model: &str, item: &Item) -> EvaluationResult {
        if let Some(entry) = self.cache.get(&item.key).await {
            return EvaluationResult::from_cache(&item.message, &entry);
        }

        let request = GenerateRequest {
            model: model.to_string(),
            system: item.resolved.clone(),
            user_message: item.message.clone(),
            max_tokens: self.settings.max_tokens,
        };
        match self.client.generate(&request).await {
            Ok(resp) => {
                let entry = CacheEntry {
                    original_prompt: item.message.clone(),
                    response: resp.text.clone(),
                    model: model.to_string(),
                    resolved_system_prompt: item.resolved.clone(),
                    created_at: Utc::now(),
                    latency_ms: resp.latency_ms,
                };
                self.cache.put(&item.key, &entry).await;
                debug!(key = %item.key, latency_ms = resp.latency_ms, "item evaluated");
                EvaluationResult::computed(&item.message, resp.text, resp.latency_ms)
            }
            Err(e) => {
                warn!(
                    key = %item.key,
                    provider = self.client.provider_name(),
                    error = %e,
                    "item failed"
                );
                EvaluationResult::failed(&item.message, e.kind_label(), e.to_string())
            }
        }
    }
}
