//! Query-time search and offline indexing.
//!
//! ## Key Components
//!
//! - **RetrievalEngine**: the sole query-time entry point; semantic search
//!   with keyword fallback and relevance gating
//! - **DocumentIndexer**: offline pipeline that chunks, embeds, and stores
//!   documents
//! - **keyword_search**: literal term-overlap scoring used when embeddings
//!   are unavailable
//! - **load_documents**: reads scraped page records from a data directory

mod engine;
mod indexer;
mod keyword;
mod loader;

pub use engine::{DocumentHit, QueryResult, RetrievalEngine, SearchMode};
pub use indexer::{DocumentIndexer, IndexFailure, IndexReport};
pub use keyword::keyword_search;
pub use loader::load_documents;
