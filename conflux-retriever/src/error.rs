//! Error types for the retrieval engine

use conflux_embed::EmbedError;

/// Result type for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Error type for indexing and retrieval operations.
///
/// Only [`RetrievalError::Configuration`] is fatal: it is raised when the
/// engine or indexer is constructed, before any document is touched. The
/// embedding and index variants are recovered at query time by falling back
/// to keyword search; during indexing, embedding failures are recorded
/// per document while index failures abort the run.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    /// Invalid chunking or search parameters; raised at startup.
    #[error("invalid configuration: {message}")]
    Configuration { message: String },

    /// The embedding provider failed.
    #[error("embedding failed: {source}")]
    Embedding {
        #[from]
        source: EmbedError,
    },

    /// The vector index is unreachable or corrupt.
    #[error("vector index error: {source}")]
    Index {
        #[from]
        source: sqlx::Error,
    },

    /// An embedding's dimensionality does not match what the index holds.
    ///
    /// Embeddings of different dimensionality must never coexist in one
    /// index; distances between them would be meaningless.
    #[error("embedding dimension mismatch: index holds {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl RetrievalError {
    /// Create a configuration error with a custom message.
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Whether a query-time search should recover from this error by
    /// falling back to keyword search.
    ///
    /// Provider outages and index failures qualify; a rejected request
    /// payload does not, since falling back would only mask the bug.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Configuration { .. } => false,
            Self::Embedding { source } => source.is_unavailable(),
            Self::Index { .. } => true,
            Self::DimensionMismatch { .. } => true,
        }
    }
}

impl From<conflux_chunk::ChunkError> for RetrievalError {
    fn from(source: conflux_chunk::ChunkError) -> Self {
        Self::Configuration {
            message: source.to_string(),
        }
    }
}
