//! Persistent vector index for document chunks.
//!
//! This module is the storage layer of the retrieval engine. It keeps two
//! kinds of rows in one SQLite database:
//!
//! - **Documents**: the full page records, used by the keyword fallback and
//!   for citation metadata
//! - **Chunks**: embedded text segments, the unit of similarity search
//!
//! ## Key Components
//!
//! - **VectorIndex**: SQLite-backed store with nearest-neighbor queries
//! - **IndexEntry**: one (chunk text, embedding, citation metadata) tuple
//! - **IndexStats**: corpus counts for diagnostics

mod vector_index;

pub use vector_index::{IndexEntry, IndexStats, VectorIndex};
