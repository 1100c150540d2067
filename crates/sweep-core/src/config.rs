use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::providers::llm::retry::RetryPolicy;
use crate::template::DEFAULT_TEMPLATE;

pub const SUPPORTED_CONFIG_VERSION: u32 = 1;

pub const DEFAULT_CONFIG_FILE: &str = "sweep.yaml";

/// Engine configuration, usually read from `sweep.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct EngineConfig {
    pub version: u32,
    pub default_model: String,
    /// Total provider attempts per item, first call included.
    pub max_retries: u32,
    pub base_backoff_ms: u64,
    pub max_tokens: u32,
    /// Maximum in-flight items.
    pub parallel: usize,
    pub run_timeout_secs: u64,
    pub default_template: String,
    pub storage: StorageConfig,
    pub provider: ProviderConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: SUPPORTED_CONFIG_VERSION,
            default_model: "claude-sonnet-4-5".to_string(),
            max_retries: 5,
            base_backoff_ms: 1000,
            max_tokens: 16000,
            parallel: 4,
            run_timeout_secs: 30 * 60,
            default_template: DEFAULT_TEMPLATE.to_string(),
            storage: StorageConfig::default(),
            provider: ProviderConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.base_backoff_ms))
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != SUPPORTED_CONFIG_VERSION {
            return Err(ConfigError(format!(
                "unsupported config version {} (supported: {})",
                self.version, SUPPORTED_CONFIG_VERSION
            )));
        }
        if self.max_retries == 0 {
            return Err(ConfigError("max_retries must be at least 1".into()));
        }
        if self.parallel == 0 {
            return Err(ConfigError("parallel must be at least 1".into()));
        }
        if self.max_tokens == 0 {
            return Err(ConfigError("max_tokens must be at least 1".into()));
        }
        if self.run_timeout_secs == 0 {
            return Err(ConfigError("run_timeout_secs must be at least 1".into()));
        }
        Ok(())
    }
}

/// Where cache entries and run artifacts live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    Local {
        root: PathBuf,
    },
    Http {
        base_url: String,
        /// Environment variable holding the bearer token (read by the CLI).
        #[serde(default)]
        token_env: Option<String>,
    },
    Memory,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Local {
            root: PathBuf::from(".sweep"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProviderConfig {
    Anthropic {
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default = "default_api_key_env")]
        api_key_env: String,
    },
    Fake {
        /// Fixed response; when absent the fake echoes the user message.
        #[serde(default)]
        response: Option<String>,
    },
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::Anthropic {
            base_url: None,
            api_key_env: default_api_key_env(),
        }
    }
}

pub fn parse_config(raw: &str) -> Result<EngineConfig, ConfigError> {
    let cfg: EngineConfig = serde_yaml::from_str(raw)
        .map_err(|e| ConfigError(format!("failed to parse YAML: {}", e)))?;
    cfg.validate()?;
    Ok(cfg)
}

pub fn load_config(path: &Path) -> Result<EngineConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError(format!("failed to read config {}: {}", path.display(), e)))?;
    parse_config(&raw).map_err(|e| ConfigError(format!("{}: {}", path.display(), e.0)))
}
