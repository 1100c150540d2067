//! Builds the engine pieces every command needs from config and flags.
//! The only place the process environment is read.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context as _};
use sweep_core::config::{load_config, EngineConfig, ProviderConfig, StorageConfig, DEFAULT_CONFIG_FILE};
use sweep_core::providers::llm::{AnthropicClient, FakeClient, LlmClient};
use sweep_core::storage::{open_blob_store, BlobStore};

use crate::cli::args::GlobalArgs;

pub(crate) struct Context {
    pub cfg: EngineConfig,
    pub blobs: Arc<dyn BlobStore>,
}

impl Context {
    pub fn open(global: &GlobalArgs) -> anyhow::Result<Self> {
        let mut cfg = load_engine_config(global)?;
        if let Some(root) = &global.store {
            cfg.storage = StorageConfig::Local { root: root.clone() };
        }
        let token = match &cfg.storage {
            StorageConfig::Http {
                token_env: Some(var),
                ..
            } => Some(secret(var)?),
            _ => None,
        };
        let blobs = open_blob_store(&cfg.storage, token);
        tracing::debug!(backend = blobs.backend_name(), "storage opened");
        Ok(Self { cfg, blobs })
    }

    pub fn provider(&self) -> anyhow::Result<Arc<dyn LlmClient>> {
        build_provider(&self.cfg.provider)
    }

    pub fn model(&self, flag: Option<&str>) -> String {
        flag.map(str::to_string)
            .unwrap_or_else(|| self.cfg.default_model.clone())
    }
}

/// An explicit `--config` must exist; the implicit `sweep.yaml` is optional.
pub(crate) fn load_engine_config(global: &GlobalArgs) -> anyhow::Result<EngineConfig> {
    match &global.config {
        Some(path) => Ok(load_config(path)?),
        None => {
            let implicit = Path::new(DEFAULT_CONFIG_FILE);
            if implicit.exists() {
                Ok(load_config(implicit)?)
            } else {
                Ok(EngineConfig::default())
            }
        }
    }
}

pub(crate) fn build_provider(cfg: &ProviderConfig) -> anyhow::Result<Arc<dyn LlmClient>> {
    match cfg {
        ProviderConfig::Anthropic {
            base_url,
            api_key_env,
        } => {
            let key = secret(api_key_env)?;
            Ok(match base_url {
                Some(url) => Arc::new(AnthropicClient::with_base_url(key, url)),
                None => Arc::new(AnthropicClient::new(key)),
            })
        }
        ProviderConfig::Fake { response } => {
            let client = match response {
                Some(text) => FakeClient::new().with_response(text.clone()),
                None => FakeClient::new(),
            };
            Ok(Arc::new(client))
        }
    }
}

fn secret(var: &str) -> anyhow::Result<String> {
    let value = std::env::var(var).with_context(|| format!("environment variable {var} is not set"))?;
    if value.trim().is_empty() {
        bail!("environment variable {var} is empty");
    }
    Ok(value)
}
