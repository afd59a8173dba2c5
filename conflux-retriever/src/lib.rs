//! Semantic retrieval over scraped Confluence pages.
//!
//! This crate is the retrieval half of a document Q&A system: it turns a
//! directory of scraped pages into a persistent vector index and answers
//! free-text queries against it with ranked, cited documents.
//!
//! ## Architecture
//!
//! ```text
//! load_documents -> DocumentIndexer -> VectorIndex   (offline)
//!                                          |
//!            query -> RetrievalEngine -----+-> QueryResult
//!                          |  (fallback)
//!                          +-> keyword_search
//! ```
//!
//! - [`load_documents`] reads scraper output from disk
//! - [`DocumentIndexer`] chunks pages, embeds the chunks through a
//!   [`conflux_embed::EmbeddingProvider`], and writes them to the index
//! - [`VectorIndex`] persists embeddings in SQLite and answers
//!   nearest-neighbor queries
//! - [`RetrievalEngine`] is the query-time entry point: semantic search
//!   with relevance gating, degrading to [`keyword_search`] when the
//!   embedding provider or the index is unavailable
//!
//! ## Example
//!
//! ```rust,no_run
//! use conflux_retriever::{
//!     DocumentIndexer, RetrievalConfig, RetrievalEngine, load_documents,
//!     storage::VectorIndex,
//! };
//! use conflux_embed::{EmbedConfig, provider_from_config};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = provider_from_config(
//!     &EmbedConfig::google_ai("text-embedding-004", std::env::var("GOOGLE_API_KEY").ok()),
//! )?;
//! let index = VectorIndex::open(Path::new("./index")).await?;
//! let config = RetrievalConfig::default();
//!
//! let documents = load_documents(Path::new("./confluence_data")).await;
//! let indexer = DocumentIndexer::new(index.clone(), provider.clone(), config.clone())?;
//! let report = indexer.index(&documents).await?;
//! println!("indexed {} documents", report.documents_indexed);
//!
//! let engine = RetrievalEngine::new(index, provider, config)?;
//! let result = engine.search("How do I deploy with containers?").await;
//! for hit in result.hits {
//!     println!("{} ({:.2}) {}", hit.title, hit.score, hit.url);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod retrieval;
pub mod storage;

pub use config::RetrievalConfig;
pub use document::Document;
pub use error::{Result, RetrievalError};
pub use retrieval::{
    DocumentHit, DocumentIndexer, IndexFailure, IndexReport, QueryResult, RetrievalEngine,
    SearchMode, keyword_search, load_documents,
};
