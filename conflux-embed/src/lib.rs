//! # conflux-embed
//!
//! Embedding client for the conflux retrieval engine. Converts text (queries
//! or document chunks) into fixed-dimension vectors by calling an external
//! embedding provider over HTTP, with bounded retry for transient failures.
//!
//! ## Features
//!
//! - **Provider dispatch by configuration**: Google Generative Language API
//!   or any OpenAI-compatible `/embeddings` endpoint, chosen once at startup
//! - **One vector space**: document and query embeddings are requested
//!   against the same model so distances stay comparable
//! - **Bounded retry**: transient failures (timeouts, 429, 5xx) are retried
//!   with exponential backoff before surfacing as unavailable
//! - **Recoverable error taxonomy**: callers can tell "provider is down"
//!   apart from "the request was bad" and fall back accordingly
//! - **Stateless**: no local state beyond the HTTP client; the same input
//!   always issues the same request
//!
//! ## Quick Start
//!
//! ```no_run
//! use conflux_embed::{EmbedConfig, EmbeddingTask, provider_from_config};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = EmbedConfig::google_ai("text-embedding-004", std::env::var("GOOGLE_API_KEY").ok());
//! let provider = provider_from_config(&config)?;
//!
//! let vector = provider.embed("How do I deploy with containers?", EmbeddingTask::Query).await?;
//! println!("query embedded into {} dimensions", vector.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T>`] using the crate's [`EmbedError`] type.
//! [`EmbedError::Unavailable`] marks failures the retrieval layer recovers
//! from by falling back to keyword search; the other variants indicate a bad
//! request or a malformed response and are not masked by fallback.

pub mod config;
pub mod error;
pub mod provider;
mod retry;

// Re-export main types for easy access
pub use config::{EmbedConfig, ProviderKind};
pub use error::{EmbedError, Result};
pub use provider::{
    EmbeddingProvider, EmbeddingTask, GoogleAiProvider, OpenAiCompatProvider, provider_from_config,
};
