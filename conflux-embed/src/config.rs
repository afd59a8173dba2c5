//! Configuration for embedding providers.
//!
//! A single [`EmbedConfig`] selects which provider backend to use and carries
//! the credentials and endpoint settings that provider needs. The retrieval
//! core never branches on provider identity: it holds a
//! [`EmbeddingProvider`](crate::EmbeddingProvider) trait object built once at
//! startup from this configuration.

use crate::error::{EmbedError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of retries for transient provider failures.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Which embedding backend to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderKind {
    /// Google Generative Language API (`embedContent`).
    GoogleAi,
    /// Any service exposing the OpenAI `/embeddings` wire format.
    OpenAiCompat,
}

/// Configuration for an embedding provider.
///
/// Credentials are opaque to the retrieval core; they are passed through to
/// the provider unchanged. Missing credentials are reported by
/// [`validate`](Self::validate) for callers that want to fail fast at
/// startup, and otherwise surface as [`EmbedError::Unavailable`] at request
/// time so the retrieval layer can degrade to keyword search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedConfig {
    /// Provider backend to use.
    pub provider: ProviderKind,
    /// Model identifier, e.g. `text-embedding-004`.
    pub model: String,
    /// API key, if the provider requires one.
    pub api_key: Option<String>,
    /// Endpoint root override. Defaults to the provider's public endpoint.
    pub base_url: Option<String>,
    /// Retries for transient failures before giving up.
    pub max_retries: u32,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl EmbedConfig {
    /// Configuration for the Google Generative Language embedding API.
    pub fn google_ai<S: Into<String>>(model: S, api_key: Option<String>) -> Self {
        Self {
            provider: ProviderKind::GoogleAi,
            model: model.into(),
            api_key,
            base_url: None,
            max_retries: DEFAULT_MAX_RETRIES,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Configuration for an OpenAI-compatible embeddings endpoint.
    pub fn openai_compat<S: Into<String>, U: Into<String>>(model: S, base_url: U) -> Self {
        Self {
            provider: ProviderKind::OpenAiCompat,
            model: model.into(),
            api_key: None,
            base_url: Some(base_url.into()),
            max_retries: DEFAULT_MAX_RETRIES,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Set the API key.
    pub fn with_api_key<S: Into<String>>(mut self, api_key: S) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Override the endpoint root.
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the retry budget for transient failures.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs();
        self
    }

    /// Per-request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check that the configuration carries everything its provider needs.
    ///
    /// # Errors
    ///
    /// Returns [`EmbedError::Unavailable`] when credentials or endpoint
    /// settings are missing: the provider would be unreachable with this
    /// configuration.
    pub fn validate(&self) -> Result<()> {
        if self.model.is_empty() {
            return Err(EmbedError::invalid_input("model name must not be empty"));
        }
        match self.provider {
            ProviderKind::GoogleAi => {
                if self.api_key.as_deref().unwrap_or("").is_empty() {
                    return Err(EmbedError::unavailable(
                        "Google AI provider requires an API key",
                    ));
                }
            }
            ProviderKind::OpenAiCompat => {
                if self.base_url.as_deref().unwrap_or("").is_empty() {
                    return Err(EmbedError::unavailable(
                        "OpenAI-compatible provider requires a base URL",
                    ));
                }
            }
        }
        Ok(())
    }
}
