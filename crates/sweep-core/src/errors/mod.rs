use std::time::Duration;

/// Errors raised by a model provider call.
///
/// Only [`ProviderError::RateLimited`] is retryable; everything else is
/// terminal for the item that triggered it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("rate limited (status {status:?}): {message}")]
    RateLimited {
        status: Option<u16>,
        retry_after: Option<Duration>,
        message: String,
        /// True when the kind was inferred from free-form message parsing.
        legacy_classified: bool,
    },

    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("invalid request (status {status}): {message}")]
    InvalidRequest { status: u16, message: String },

    #[error("provider error (status {status:?}): {message}")]
    Server {
        status: Option<u16>,
        message: String,
    },

    #[error("network error: {message}")]
    Network { message: String },

    #[error("timeout: {message}")]
    Timeout { message: String },

    #[error("stream error: {message}")]
    Stream { message: String },

    #[error("{message}")]
    Other { message: String },
}

impl ProviderError {
    pub fn rate_limited(status: u16, retry_after: Option<Duration>, message: impl Into<String>) -> Self {
        Self::RateLimited {
            status: Some(status),
            retry_after,
            message: message.into(),
            legacy_classified: false,
        }
    }

    /// Whether the error should be retried with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Stable label recorded on failed evaluation results.
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => "provider_rate_limit",
            Self::Unauthorized { .. } => "provider_auth",
            Self::InvalidRequest { .. } => "provider_invalid_request",
            Self::Server { .. } => "provider_server",
            Self::Network { .. } => "network",
            Self::Timeout { .. } => "timeout",
            Self::Stream { .. } => "stream",
            Self::Other { .. } => "other",
        }
    }

    /// Classify an error that only carries a human-readable message.
    ///
    /// Providers should map status codes and typed error payloads directly;
    /// this is the fallback for SDK errors that surface nothing but text.
    pub fn classify_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let msg = message.to_lowercase();
        if msg.contains("rate limit")
            || msg.contains("rate_limit")
            || msg.contains("too many requests")
            || msg.contains("429")
        {
            Self::RateLimited {
                status: None,
                retry_after: None,
                message,
                legacy_classified: true,
            }
        } else if msg.contains("timeout") || msg.contains("timed out") {
            Self::Timeout { message }
        } else if msg.contains("unauthorized") || msg.contains("invalid api key") {
            Self::Unauthorized { message }
        } else if msg.contains("connection") || msg.contains("dns") || msg.contains("network") {
            Self::Network { message }
        } else {
            Self::Other { message }
        }
    }

    pub fn is_legacy_classified(&self) -> bool {
        matches!(
            self,
            Self::RateLimited {
                legacy_classified: true,
                ..
            }
        )
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                message: err.to_string(),
            }
        } else if let Some(status) = err.status() {
            if status.as_u16() == 429 {
                Self::rate_limited(429, None, err.to_string())
            } else {
                Self::Server {
                    status: Some(status.as_u16()),
                    message: err.to_string(),
                }
            }
        } else {
            Self::Network {
                message: err.to_string(),
            }
        }
    }
}

/// Errors from a blob store backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid storage key '{key}': {reason}")]
    InvalidKey { key: String, reason: &'static str },

    #[error("io error on '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode '{key}': {source}")]
    Serde {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("storage backend returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("storage network error: {message}")]
    Network { message: String },
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network {
            message: err.to_string(),
        }
    }
}

/// Fatal errors that stop a run before any item is evaluated.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("no messages supplied")]
    NoMessages,

    #[error("no system prompts supplied")]
    NoSystemPrompts,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("dataset not found: {path}")]
    DatasetNotFound { path: String },

    #[error("invalid dataset {path}: {reason}")]
    InvalidDataset { path: String, reason: String },
}

#[derive(Debug, thiserror::Error)]
#[error("ConfigError: {0}")]
pub struct ConfigError(pub String);
